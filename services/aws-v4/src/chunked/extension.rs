use std::fmt::{Debug, Formatter};

use streamsign_core::Result;

use crate::Checksum;

/// Computes a chunk extension from the chunk bytes.
pub type ExtensionFn = Box<dyn FnMut(&[u8]) -> Result<(String, String)> + Send>;

/// Computes a trailer once the body is exhausted.
pub type TrailerFn = Box<dyn FnMut() -> Result<(String, String)> + Send>;

/// Extension appended to every chunk header as `;name=value`.
///
/// Extensions are rendered in registration order, the terminating chunk
/// included (it is computed over empty bytes).
pub enum ChunkExtension {
    /// `chunk-signature=<signature>` chained through the encoder's rolling signer.
    Signature,
    /// The same `name=value` on every chunk.
    Static(String, String),
    /// Computed from the chunk bytes.
    Custom(ExtensionFn),
}

impl ChunkExtension {
    /// Build a custom extension.
    pub fn custom(f: impl FnMut(&[u8]) -> Result<(String, String)> + Send + 'static) -> Self {
        ChunkExtension::Custom(Box::new(f))
    }
}

impl Debug for ChunkExtension {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkExtension::Signature => f.write_str("Signature"),
            ChunkExtension::Static(name, value) => {
                f.debug_tuple("Static").field(name).field(value).finish()
            }
            ChunkExtension::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Trailer emitted as a `name:value` line after the terminating chunk.
///
/// Each trailer is computed exactly once, in registration order.
pub enum Trailer {
    /// Checksum of the whole payload, updated with every chunk.
    Checksum(Checksum),
    /// A value known up front, e.g. a trailer declared in `x-amz-trailer`.
    Static(String, String),
    /// `x-amz-trailer-signature` over every trailer rendered before it.
    Signature,
    /// Computed when the body is exhausted.
    Custom(TrailerFn),
}

impl Trailer {
    /// Build a custom trailer.
    pub fn custom(f: impl FnMut() -> Result<(String, String)> + Send + 'static) -> Self {
        Trailer::Custom(Box::new(f))
    }
}

impl Debug for Trailer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Trailer::Checksum(checksum) => f.debug_tuple("Checksum").field(checksum).finish(),
            Trailer::Static(name, value) => {
                f.debug_tuple("Static").field(name).field(value).finish()
            }
            Trailer::Signature => f.write_str("Signature"),
            Trailer::Custom(_) => f.write_str("Custom"),
        }
    }
}
