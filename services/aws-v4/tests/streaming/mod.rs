mod s3_example;
mod v4a;

/// One chunk of a decoded `aws-chunked` body.
#[derive(Debug)]
pub struct DecodedChunk {
    pub data: Vec<u8>,
    pub signature: Option<String>,
}

/// Decoded `aws-chunked` body: every chunk, the terminating one included, and the trailers.
#[derive(Debug)]
pub struct DecodedBody {
    pub chunks: Vec<DecodedChunk>,
    pub trailers: Vec<(String, String)>,
}

fn split_line(input: &[u8]) -> (&[u8], &[u8]) {
    let end = input
        .windows(2)
        .position(|w| w == b"\r\n")
        .expect("line must end with CRLF");
    (&input[..end], &input[end + 2..])
}

/// Parse an encoded body, checking the framing along the way.
pub fn decode(encoded: &[u8]) -> DecodedBody {
    let mut chunks = Vec::new();
    let mut rest = encoded;

    loop {
        let (header, tail) = split_line(rest);
        let header = std::str::from_utf8(header).expect("chunk header must be utf-8");
        let mut parts = header.split(';');
        let size = usize::from_str_radix(parts.next().unwrap_or_default(), 16)
            .expect("chunk size must be hex");
        let signature = parts.find_map(|ext| {
            ext.strip_prefix("chunk-signature=")
                .map(|v| v.trim_end_matches('*').to_string())
        });

        let data = tail[..size].to_vec();
        rest = if size == 0 {
            tail
        } else {
            assert_eq!(&tail[size..size + 2], b"\r\n", "chunk data must end with CRLF");
            &tail[size + 2..]
        };
        chunks.push(DecodedChunk { data, signature });
        if size == 0 {
            break;
        }
    }

    let mut trailers = Vec::new();
    loop {
        let (line, tail) = split_line(rest);
        rest = tail;
        if line.is_empty() {
            break;
        }
        let line = std::str::from_utf8(line).expect("trailer must be utf-8");
        let (name, value) = line.split_once(':').expect("trailer must be name:value");
        trailers.push((name.to_string(), value.to_string()));
    }
    assert!(rest.is_empty(), "nothing may follow the closing CRLF");

    DecodedBody { chunks, trailers }
}
