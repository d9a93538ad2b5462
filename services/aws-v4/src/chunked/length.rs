//! Encoded length of standard `aws-chunked` framing.

/// Number of hex digits needed for `n`, `0` included.
fn hex_len(n: u64) -> u64 {
    if n == 0 {
        1
    } else {
        u64::from(64 - n.leading_zeros()).div_ceil(4)
    }
}

/// Length of one framed chunk carrying `data_len` bytes.
///
/// `x<extensions>\r\n<data>\r\n`, or `0<extensions>\r\n` when empty.
pub fn chunk_len(data_len: u64, extensions_len: u64) -> u64 {
    if data_len == 0 {
        return 1 + extensions_len + 2;
    }
    hex_len(data_len) + extensions_len + 2 + data_len + 2
}

/// Length of every chunk of a `content_len` payload, the terminating one included.
pub fn chunks_len(content_len: u64, chunk_size: u64, extensions_len: u64) -> u64 {
    let full = content_len / chunk_size;
    let remaining = content_len % chunk_size;

    let mut len = full * chunk_len(chunk_size, extensions_len);
    if remaining > 0 {
        len += chunk_len(remaining, extensions_len);
    }
    len + chunk_len(0, extensions_len)
}

/// Length of a `name:v1,v2\r\n` trailer line.
pub fn trailer_len(name: &str, values: &[&str]) -> u64 {
    let values_len: usize = values.iter().map(|v| v.len()).sum();
    let commas = values.len().saturating_sub(1);
    (name.len() + 1 + values_len + commas + 2) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 1)]
    #[test_case(1, 1)]
    #[test_case(15, 1)]
    #[test_case(16, 2)]
    #[test_case(255, 2)]
    #[test_case(256, 3)]
    #[test_case(128 * 1024, 5)]
    fn test_hex_len(n: u64, expected: u64) {
        assert_eq!(hex_len(n), expected);
        assert_eq!(hex_len(n), format!("{n:x}").len() as u64);
    }

    #[test]
    fn test_chunks_len() {
        // "3\r\nabc\r\n3\r\ndef\r\n3\r\nghi\r\n1\r\nj\r\n0\r\n" plus the closing CRLF
        assert_eq!(chunks_len(10, 3, 0) + 2, 35);
        assert_eq!(chunks_len(10, 3, ";hello=world!".len() as u64) + 2, 100);
        assert_eq!(chunks_len(0, 3, 0), 3);
    }

    #[test]
    fn test_trailer_len() {
        assert_eq!(trailer_len("hello", &["world!"]), "hello:world!\r\n".len() as u64);
        assert_eq!(
            trailer_len("PreExistingHeader1", &["someValue1", "someValue2"]),
            "PreExistingHeader1:someValue1,someValue2\r\n".len() as u64
        );
    }
}
