//! Streaming payload signing: request preparation and body encoding.

use std::fmt::Debug;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;

use http::header::{CONTENT_ENCODING, CONTENT_LENGTH};
use http::request::Parts;
use http::{HeaderName, HeaderValue};
use log::debug;
use streamsign_core::{Error, Result};

use crate::chunked::{chunks_len, trailer_len, DEFAULT_CHUNK_SIZE};
use crate::constants::{
    AWS_CHUNKED, CHUNK_SIGNATURE, ECDSA_SIGNATURE_LENGTH, SIGNATURE_LENGTH,
    STREAMING_ECDSA_SIGNED_PAYLOAD, STREAMING_ECDSA_SIGNED_PAYLOAD_TRAILER,
    STREAMING_SIGNED_PAYLOAD, STREAMING_SIGNED_PAYLOAD_TRAILER,
    STREAMING_UNSIGNED_PAYLOAD_TRAILER, X_AMZ_CONTENT_SHA_256, X_AMZ_DECODED_CONTENT_LENGTH,
    X_AMZ_TRAILER, X_AMZ_TRAILER_SIGNATURE,
};
use crate::{
    Checksum, ChecksumAlgorithm, ChunkExtension, ChunkedEncoder, SigningAlgorithm,
    SigningOutput, Trailer,
};

/// ContentStreamProvider yields a fresh stream over the same content on every call.
///
/// A signed body is only valid for the stream it was computed over, so
/// retrying a request re-encodes a new stream from the start.
pub trait ContentStreamProvider: Debug + Send + Sync {
    /// Open a new stream positioned at the start of the content.
    fn new_stream(&self) -> io::Result<Box<dyn Read + Send>>;
}

impl ContentStreamProvider for Vec<u8> {
    fn new_stream(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.clone())))
    }
}

impl ContentStreamProvider for String {
    fn new_stream(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.clone().into_bytes())))
    }
}

impl ContentStreamProvider for &'static [u8] {
    fn new_stream(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(*self))
    }
}

impl ContentStreamProvider for &'static str {
    fn new_stream(&self) -> io::Result<Box<dyn Read + Send>> {
        let content: &'static str = self;
        Ok(Box::new(content.as_bytes()))
    }
}

/// Files are reopened for every stream.
impl ContentStreamProvider for PathBuf {
    fn new_stream(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(self)?))
    }
}

/// Value of `x-amz-content-sha256` for a streaming body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMode {
    /// `STREAMING-AWS4-HMAC-SHA256-PAYLOAD`
    SignedPayload,
    /// `STREAMING-AWS4-HMAC-SHA256-PAYLOAD-TRAILER`
    SignedPayloadTrailer,
    /// `STREAMING-AWS4-ECDSA-P256-SHA256-PAYLOAD`
    EcdsaSignedPayload,
    /// `STREAMING-AWS4-ECDSA-P256-SHA256-PAYLOAD-TRAILER`
    EcdsaSignedPayloadTrailer,
    /// `STREAMING-UNSIGNED-PAYLOAD-TRAILER`
    UnsignedPayloadTrailer,
}

impl PayloadMode {
    /// Header value announcing this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadMode::SignedPayload => STREAMING_SIGNED_PAYLOAD,
            PayloadMode::SignedPayloadTrailer => STREAMING_SIGNED_PAYLOAD_TRAILER,
            PayloadMode::EcdsaSignedPayload => STREAMING_ECDSA_SIGNED_PAYLOAD,
            PayloadMode::EcdsaSignedPayloadTrailer => STREAMING_ECDSA_SIGNED_PAYLOAD_TRAILER,
            PayloadMode::UnsignedPayloadTrailer => STREAMING_UNSIGNED_PAYLOAD_TRAILER,
        }
    }

    /// Algorithm the chunks are signed with, `None` for unsigned chunks.
    pub fn algorithm(&self) -> Option<SigningAlgorithm> {
        match self {
            PayloadMode::SignedPayload | PayloadMode::SignedPayloadTrailer => {
                Some(SigningAlgorithm::HmacSha256)
            }
            PayloadMode::EcdsaSignedPayload | PayloadMode::EcdsaSignedPayloadTrailer => {
                Some(SigningAlgorithm::EcdsaP256Sha256)
            }
            PayloadMode::UnsignedPayloadTrailer => None,
        }
    }

    /// Whether trailers follow the terminating chunk.
    pub fn has_trailer(&self) -> bool {
        !matches!(
            self,
            PayloadMode::SignedPayload | PayloadMode::EcdsaSignedPayload
        )
    }

    /// Whether the trailers are concluded by `x-amz-trailer-signature`.
    fn has_trailer_signature(&self) -> bool {
        matches!(
            self,
            PayloadMode::SignedPayloadTrailer | PayloadMode::EcdsaSignedPayloadTrailer
        )
    }

    /// Length of the `;chunk-signature=<signature>` extension.
    fn extension_len(&self) -> u64 {
        match self.algorithm() {
            Some(algorithm) => (1 + CHUNK_SIGNATURE.len() + 1 + signature_len(algorithm)) as u64,
            None => 0,
        }
    }
}

/// Width of a signature on the wire.
fn signature_len(algorithm: SigningAlgorithm) -> usize {
    match algorithm {
        SigningAlgorithm::HmacSha256 => SIGNATURE_LENGTH,
        SigningAlgorithm::EcdsaP256Sha256 => ECDSA_SIGNATURE_LENGTH,
    }
}

/// ChunkedPayloadSigner turns a request and its body into an `aws-chunked` upload.
///
/// [`ChunkedPayloadSigner::before_signing`] prepares the request headers and
/// must run before the request is signed; [`ChunkedPayloadSigner::sign`] then
/// encodes the body, seeded with the request signature.
#[derive(Debug, Clone)]
pub struct ChunkedPayloadSigner {
    algorithm: Option<SigningAlgorithm>,
    chunk_size: usize,
    checksum_algorithm: Option<ChecksumAlgorithm>,
    /// Trailers declared in `x-amz-trailer`, lifted out of the request headers.
    pre_existing_trailers: Vec<(String, Vec<String>)>,
}

impl ChunkedPayloadSigner {
    /// Sign every chunk with `algorithm`.
    pub fn signed(algorithm: SigningAlgorithm) -> Self {
        Self {
            algorithm: Some(algorithm),
            chunk_size: DEFAULT_CHUNK_SIZE,
            checksum_algorithm: None,
            pre_existing_trailers: Vec::new(),
        }
    }

    /// Send chunks unsigned with the trailers after them.
    pub fn unsigned() -> Self {
        Self {
            algorithm: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            checksum_algorithm: None,
            pre_existing_trailers: Vec::new(),
        }
    }

    /// Set the number of payload bytes per chunk.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Send a checksum of the payload as a trailer.
    pub fn with_checksum(mut self, algorithm: ChecksumAlgorithm) -> Self {
        self.checksum_algorithm = Some(algorithm);
        self
    }

    /// Payload mode implied by the configuration and the lifted trailers.
    pub fn payload_mode(&self) -> PayloadMode {
        let trailing = self.checksum_algorithm.is_some() || !self.pre_existing_trailers.is_empty();
        match (self.algorithm, trailing) {
            (None, _) => PayloadMode::UnsignedPayloadTrailer,
            (Some(SigningAlgorithm::HmacSha256), false) => PayloadMode::SignedPayload,
            (Some(SigningAlgorithm::HmacSha256), true) => PayloadMode::SignedPayloadTrailer,
            (Some(SigningAlgorithm::EcdsaP256Sha256), false) => PayloadMode::EcdsaSignedPayload,
            (Some(SigningAlgorithm::EcdsaP256Sha256), true) => {
                PayloadMode::EcdsaSignedPayloadTrailer
            }
        }
    }

    /// Trailers lifted out of the request by [`ChunkedPayloadSigner::before_signing`].
    pub fn pre_existing_trailers(&self) -> &[(String, Vec<String>)] {
        &self.pre_existing_trailers
    }

    fn check_chunk_size(&self) -> Result<u64> {
        if self.chunk_size == 0 {
            return Err(Error::config_invalid("chunk size must be at least 1"));
        }
        Ok(self.chunk_size as u64)
    }

    /// Prepare the request headers for an `aws-chunked` body.
    ///
    /// The decoded length comes from `Content-Length`, or is counted from
    /// `payload` when that header is absent.
    pub fn before_signing(
        &mut self,
        req: &mut Parts,
        payload: Option<&dyn ContentStreamProvider>,
    ) -> Result<()> {
        self.check_chunk_size()?;

        let decoded_length = move_content_length(req, payload)?;
        self.lift_pre_existing_trailers(req)?;

        if let Some(algorithm) = self.checksum_algorithm {
            if !declared_trailers(req)?
                .iter()
                .any(|name| name.eq_ignore_ascii_case(algorithm.header_name()))
            {
                req.headers
                    .append(X_AMZ_TRAILER, HeaderValue::from_static(algorithm.header_name()));
            }
        }

        let encoding = match req.headers.get(CONTENT_ENCODING) {
            Some(v) if v.is_empty() => HeaderValue::from_static(AWS_CHUNKED),
            Some(v) => {
                let v = v.to_str()?;
                if v.split(',').any(|e| e.trim() == AWS_CHUNKED) {
                    HeaderValue::from_str(v)?
                } else {
                    HeaderValue::from_str(&format!("{AWS_CHUNKED},{v}"))?
                }
            }
            None => HeaderValue::from_static(AWS_CHUNKED),
        };
        req.headers.insert(CONTENT_ENCODING, encoding);

        let mode = self.payload_mode();
        req.headers
            .insert(X_AMZ_CONTENT_SHA_256, HeaderValue::from_static(mode.as_str()));

        let encoded_length = self.encoded_length(decoded_length)?;
        debug!(
            "aws-chunked payload in {} mode: decoded length {decoded_length}, encoded length {encoded_length}",
            mode.as_str()
        );
        req.headers
            .insert(CONTENT_LENGTH, HeaderValue::from(encoded_length));
        Ok(())
    }

    /// Move the trailers named in `x-amz-trailer` out of the request headers.
    ///
    /// Names keep the case they are declared with. Trailers lifted by an
    /// earlier call are kept, so preparing the same request again is a no-op.
    fn lift_pre_existing_trailers(&mut self, req: &mut Parts) -> Result<()> {
        let checksum_name = self.checksum_algorithm.map(|v| v.header_name());
        let previous = std::mem::take(&mut self.pre_existing_trailers);

        for name in declared_trailers(req)? {
            if checksum_name.is_some_and(|v| name.eq_ignore_ascii_case(v)) {
                continue;
            }

            let header = HeaderName::from_bytes(name.as_bytes())?;
            let mut values = req
                .headers
                .get_all(&header)
                .iter()
                .map(|v| v.to_str().map(|v| v.to_string()))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            if values.is_empty() {
                match previous
                    .iter()
                    .find(|(lifted, _)| lifted.eq_ignore_ascii_case(&name))
                {
                    Some((_, lifted)) => values.clone_from(lifted),
                    None => {
                        return Err(Error::request_invalid(format!(
                            "{name} must be present in the request headers to be a valid trailer"
                        )))
                    }
                }
            }

            req.headers.remove(&header);
            self.pre_existing_trailers.push((name, values));
        }
        Ok(())
    }

    /// Length of the encoded body for a payload of `decoded_length` bytes.
    pub fn encoded_length(&self, decoded_length: u64) -> Result<u64> {
        let chunk_size = self.check_chunk_size()?;
        let mode = self.payload_mode();

        let mut length = chunks_len(decoded_length, chunk_size, mode.extension_len());

        for (name, values) in &self.pre_existing_trailers {
            let values = values.iter().map(|v| v.as_str()).collect::<Vec<_>>();
            length += trailer_len(name, &values);
        }
        if let Some(algorithm) = self.checksum_algorithm {
            length += (algorithm.header_name().len() + 1 + algorithm.encoded_len() + 2) as u64;
        }
        if let (true, Some(algorithm)) = (mode.has_trailer_signature(), mode.algorithm()) {
            length += (X_AMZ_TRAILER_SIGNATURE.len() + 1 + signature_len(algorithm) + 2) as u64;
        }

        // terminating \r\n
        Ok(length + 2)
    }

    /// Encode `source`, continuing the signature chain of `seed`.
    pub fn sign<R: Read>(&self, source: R, seed: &SigningOutput) -> Result<ChunkedEncoder<R>> {
        let mode = self.payload_mode();

        let mut builder = ChunkedEncoder::builder(source).chunk_size(self.chunk_size);
        if let Some(algorithm) = mode.algorithm() {
            if seed.signing_key().algorithm() != algorithm {
                return Err(Error::config_invalid(format!(
                    "payload signed with {algorithm} but request signed with {}",
                    seed.signing_key().algorithm()
                )));
            }
            builder = builder
                .extension(ChunkExtension::Signature)
                .signer(seed.rolling_signer(), seed.scope().clone());
        }

        for (name, values) in &self.pre_existing_trailers {
            builder = builder.trailer(Trailer::Static(name.clone(), values.join(",")));
        }
        if let Some(algorithm) = self.checksum_algorithm {
            builder = builder.trailer(Trailer::Checksum(Checksum::new(algorithm)));
        }
        if mode.has_trailer_signature() {
            builder = builder.trailer(Trailer::Signature);
        }

        builder.build()
    }

    /// Encode a fresh stream opened from `payload`.
    pub fn sign_stream(
        &self,
        payload: &dyn ContentStreamProvider,
        seed: &SigningOutput,
    ) -> Result<ChunkedEncoder<Box<dyn Read + Send>>> {
        let source = payload.new_stream()?;
        self.sign(source, seed)
    }
}

/// Names listed in `x-amz-trailer`, in declaration order.
fn declared_trailers(req: &Parts) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for value in req.headers.get_all(X_AMZ_TRAILER) {
        for name in value.to_str()?.split(',') {
            let name = name.trim();
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}

fn parse_length(value: &HeaderValue, name: &str) -> Result<u64> {
    value
        .to_str()?
        .trim()
        .parse::<u64>()
        .map_err(|e| {
            Error::request_invalid(format!("{name} is not a valid length")).with_source(e)
        })
}

/// Move `Content-Length` to `x-amz-decoded-content-length`, returning it.
///
/// A request prepared before already carries the decoded length.
fn move_content_length(
    req: &mut Parts,
    payload: Option<&dyn ContentStreamProvider>,
) -> Result<u64> {
    let content_length = req.headers.remove(CONTENT_LENGTH);
    let length = match (req.headers.get(X_AMZ_DECODED_CONTENT_LENGTH), content_length) {
        (Some(v), _) => parse_length(v, X_AMZ_DECODED_CONTENT_LENGTH)?,
        (None, Some(v)) => parse_length(&v, "Content-Length")?,
        (None, None) => match payload {
            Some(payload) => {
                let mut stream = payload.new_stream()?;
                io::copy(&mut stream, &mut io::sink())?
            }
            None => 0,
        },
    };

    req.headers
        .insert(X_AMZ_DECODED_CONTENT_LENGTH, HeaderValue::from(length));
    Ok(length)
}
