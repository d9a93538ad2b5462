//! `aws-chunked` content encoding.
//!
//! A body is framed as a sequence of length prefixed chunks:
//!
//! ```text
//! <hex length>[;name=value]*\r\n<chunk bytes>\r\n
//! ...
//! 0[;name=value]*\r\n
//! [<trailer name>:<trailer value>\r\n]*
//! \r\n
//! ```
//!
//! [`ChunkedEncoder`] produces this framing lazily from any [`std::io::Read`],
//! holding at most one chunk in memory.

mod encoder;
pub use encoder::{ChunkedEncoder, ChunkedEncoderBuilder, HeaderFn};

mod extension;
pub use extension::{ChunkExtension, ExtensionFn, Trailer, TrailerFn};

mod length;
pub use length::{chunk_len, chunks_len, trailer_len};

/// Chunk size used when none is configured: 128 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 128 * 1024;
