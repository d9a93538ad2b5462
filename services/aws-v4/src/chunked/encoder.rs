use std::fmt::{Debug, Formatter};
use std::io::{self, Read};

use log::{debug, trace};
use streamsign_core::{Error, Result};

use super::{ChunkExtension, Trailer, DEFAULT_CHUNK_SIZE};
use crate::constants::{CHUNK_SIGNATURE, CRLF, X_AMZ_TRAILER_SIGNATURE};
use crate::v4a::pad_signature;
use crate::{CredentialScope, RollingSigner, SigningAlgorithm};

/// Renders the chunk-size part of a chunk header from the chunk bytes.
pub type HeaderFn = Box<dyn Fn(&[u8]) -> Vec<u8> + Send>;

fn hex_header(chunk: &[u8]) -> Vec<u8> {
    format!("{:x}", chunk.len()).into_bytes()
}

/// Rolling signer bound to the scope of the request it continues.
#[derive(Debug)]
struct StreamSigner {
    signer: RollingSigner,
    scope: CredentialScope,
}

impl StreamSigner {
    /// Signature as written on the wire; SigV4a signatures have a fixed width.
    fn wire(&self, signature: String) -> String {
        match self.signer.algorithm() {
            SigningAlgorithm::HmacSha256 => signature,
            SigningAlgorithm::EcdsaP256Sha256 => pad_signature(&signature),
        }
    }
}

/// Builder for [`ChunkedEncoder`].
pub struct ChunkedEncoderBuilder<R> {
    source: R,
    chunk_size: usize,
    header: HeaderFn,
    extensions: Vec<ChunkExtension>,
    trailers: Vec<Trailer>,
    signer: Option<StreamSigner>,
}

impl<R: Read> ChunkedEncoderBuilder<R> {
    /// Set the number of payload bytes per chunk.
    ///
    /// Every chunk but the last non-empty one carries exactly this many bytes.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Replace the lowercase hex length rendered at the start of every chunk header.
    pub fn header(mut self, header: impl Fn(&[u8]) -> Vec<u8> + Send + 'static) -> Self {
        self.header = Box::new(header);
        self
    }

    /// Append an extension to every chunk header.
    pub fn extension(mut self, extension: ChunkExtension) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Append a trailer emitted after the terminating chunk.
    pub fn trailer(mut self, trailer: Trailer) -> Self {
        self.trailers.push(trailer);
        self
    }

    /// Sign chunks and trailers with `signer`, continuing the chain of `scope`.
    pub fn signer(mut self, signer: RollingSigner, scope: CredentialScope) -> Self {
        self.signer = Some(StreamSigner { signer, scope });
        self
    }

    /// Build the encoder.
    pub fn build(self) -> Result<ChunkedEncoder<R>> {
        if self.chunk_size == 0 {
            return Err(Error::config_invalid("chunk size must be at least 1"));
        }

        let signed = self
            .extensions
            .iter()
            .any(|v| matches!(v, ChunkExtension::Signature))
            || self.trailers.iter().any(|v| matches!(v, Trailer::Signature));
        if signed && self.signer.is_none() {
            return Err(Error::config_invalid(
                "signature extension or trailer requires a rolling signer",
            ));
        }

        Ok(ChunkedEncoder {
            source: self.source,
            chunk: vec![0; self.chunk_size],
            chunk_len: 0,
            header: self.header,
            extensions: self.extensions,
            trailers: self.trailers,
            signer: self.signer,
            frame: Vec::new(),
            pos: 0,
            state: State::Fill,
        })
    }
}

impl<R> Debug for ChunkedEncoderBuilder<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedEncoderBuilder")
            .field("chunk_size", &self.chunk_size)
            .field("extensions", &self.extensions)
            .field("trailers", &self.trailers)
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Fill the chunk buffer from the source.
    Fill,
    /// Emit the header of a data chunk.
    Header,
    /// Emit the chunk bytes.
    Data,
    /// Emit the CRLF closing a data chunk.
    Crlf,
    /// Emit the terminating chunk header.
    FinalHeader,
    /// Emit the trailer lines.
    Trailers,
    /// Emit the CRLF ending the body.
    FinalCrlf,
    Done,
    Failed,
}

/// ChunkedEncoder wraps a source and yields its `aws-chunked` encoding.
///
/// The source is read in `chunk_size` pieces. Extensions and signatures are
/// computed lazily as each chunk is emitted, so the underlying source is
/// consumed exactly once. Once an error is returned every later read fails.
pub struct ChunkedEncoder<R> {
    source: R,
    chunk: Vec<u8>,
    chunk_len: usize,
    header: HeaderFn,
    extensions: Vec<ChunkExtension>,
    trailers: Vec<Trailer>,
    signer: Option<StreamSigner>,

    /// Framing bytes pending for the current state.
    frame: Vec<u8>,
    /// Bytes of `frame` (or of the chunk in `State::Data`) already emitted.
    pos: usize,
    state: State,
}

impl<R: Read> ChunkedEncoder<R> {
    /// Start building an encoder over `source`.
    pub fn builder(source: R) -> ChunkedEncoderBuilder<R> {
        ChunkedEncoderBuilder {
            source,
            chunk_size: DEFAULT_CHUNK_SIZE,
            header: Box::new(hex_header),
            extensions: Vec::new(),
            trailers: Vec::new(),
            signer: None,
        }
    }

    /// Signature chain state, if this encoder signs.
    pub fn current_signature(&self) -> Option<&str> {
        self.signer.as_ref().map(|v| v.signer.current_signature())
    }

    /// Fill the chunk buffer until it's full or the source is exhausted.
    fn fill(&mut self) -> io::Result<()> {
        self.chunk_len = 0;
        while self.chunk_len < self.chunk.len() {
            match self.source.read(&mut self.chunk[self.chunk_len..]) {
                Ok(0) => break,
                Ok(n) => self.chunk_len += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Render `<size>[;name=value]*\r\n` for the buffered chunk.
    fn render_header(&mut self, is_final: bool) -> Result<()> {
        let chunk: &[u8] = if is_final {
            &[]
        } else {
            &self.chunk[..self.chunk_len]
        };

        for trailer in self.trailers.iter_mut() {
            if let Trailer::Checksum(checksum) = trailer {
                checksum.update(chunk);
            }
        }

        self.frame.clear();
        if is_final {
            self.frame.push(b'0');
        } else {
            self.frame.extend_from_slice(&(self.header)(chunk));
        }

        for extension in self.extensions.iter_mut() {
            let (name, value) = match extension {
                ChunkExtension::Signature => {
                    let signer = self
                        .signer
                        .as_mut()
                        .ok_or_else(|| Error::unexpected("chunk signature without signer"))?;
                    let signature = signer.signer.sign_chunk(&signer.scope, chunk)?;
                    (CHUNK_SIGNATURE.to_string(), signer.wire(signature))
                }
                ChunkExtension::Static(name, value) => (name.clone(), value.clone()),
                ChunkExtension::Custom(f) => f(chunk)?,
            };
            self.frame.push(b';');
            self.frame.extend_from_slice(name.as_bytes());
            self.frame.push(b'=');
            self.frame.extend_from_slice(value.as_bytes());
        }
        trace!(
            "aws-chunked chunk header: {}",
            String::from_utf8_lossy(&self.frame)
        );
        self.frame.extend_from_slice(CRLF);
        Ok(())
    }

    /// Render every trailer line.
    fn render_trailers(&mut self) -> Result<()> {
        self.frame.clear();

        let mut rendered: Vec<(String, String)> = Vec::with_capacity(self.trailers.len());
        for trailer in self.trailers.iter_mut() {
            let (name, value) = match trailer {
                Trailer::Checksum(checksum) => (
                    checksum.algorithm().header_name().to_string(),
                    checksum.value(),
                ),
                Trailer::Static(name, value) => (name.clone(), value.clone()),
                Trailer::Signature => {
                    let signer = self
                        .signer
                        .as_mut()
                        .ok_or_else(|| Error::unexpected("trailer signature without signer"))?;
                    let signature = signer.signer.sign_trailer(&signer.scope, &rendered)?;
                    (X_AMZ_TRAILER_SIGNATURE.to_string(), signer.wire(signature))
                }
                Trailer::Custom(f) => f()?,
            };
            self.frame.extend_from_slice(name.as_bytes());
            self.frame.push(b':');
            self.frame.extend_from_slice(value.as_bytes());
            self.frame.extend_from_slice(CRLF);
            rendered.push((name, value));
        }
        Ok(())
    }

    /// Read the next chunk and render its header.
    fn next_chunk(&mut self) -> io::Result<State> {
        self.fill()?;
        if self.chunk_len == 0 {
            self.render_header(true)?;
            Ok(State::FinalHeader)
        } else {
            self.render_header(false)?;
            Ok(State::Header)
        }
    }

    /// Move to the next state, preparing whatever it emits.
    fn advance(&mut self) -> io::Result<()> {
        self.pos = 0;
        self.state = match self.state {
            State::Fill => self.next_chunk()?,
            State::Header => State::Data,
            State::Data => {
                self.frame.clear();
                self.frame.extend_from_slice(CRLF);
                State::Crlf
            }
            // A short chunk means the source is exhausted.
            State::Crlf if self.chunk_len < self.chunk.len() => {
                self.render_header(true)?;
                State::FinalHeader
            }
            State::Crlf => self.next_chunk()?,
            State::FinalHeader => {
                self.render_trailers()?;
                State::Trailers
            }
            State::Trailers => {
                self.frame.clear();
                self.frame.extend_from_slice(CRLF);
                State::FinalCrlf
            }
            State::FinalCrlf | State::Done => State::Done,
            State::Failed => State::Failed,
        };
        Ok(())
    }

    /// Bytes still pending in the current state.
    fn pending(&self) -> &[u8] {
        match self.state {
            State::Data => &self.chunk[self.pos..self.chunk_len],
            State::Fill | State::Done | State::Failed => &[],
            _ => &self.frame[self.pos..],
        }
    }
}

impl<R: Read> Read for ChunkedEncoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.state == State::Failed {
            return Err(io::Error::other("chunked encoder failed earlier"));
        }

        loop {
            let pending = self.pending();
            if !pending.is_empty() {
                let n = pending.len().min(buf.len());
                buf[..n].copy_from_slice(&pending[..n]);
                self.pos += n;
                return Ok(n);
            }
            if self.state == State::Done {
                return Ok(0);
            }

            if let Err(err) = self.advance() {
                debug!("aws-chunked encoding failed: {err}");
                self.state = State::Failed;
                return Err(err);
            }
        }
    }
}

impl<R> Debug for ChunkedEncoder<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedEncoder")
            .field("chunk_size", &self.chunk.len())
            .field("extensions", &self.extensions)
            .field("trailers", &self.trailers)
            .field("signer", &self.signer)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
