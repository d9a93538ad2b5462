//! AWS SigV4 and SigV4a signing for streaming payloads.
//!
//! A streaming upload is signed in three steps:
//!
//! 1. [`ChunkedPayloadSigner::before_signing`] rewrites the request headers for
//!    an `aws-chunked` body and computes the encoded `Content-Length`.
//! 2. [`RequestSigner`] signs the request headers, producing the seed signature.
//! 3. [`ChunkedPayloadSigner::sign`] wraps the body in a [`ChunkedEncoder`]
//!    whose chunk signatures continue the chain started by the seed.
//!
//! ## Example
//!
//! ```no_run
//! use std::io::Read;
//! use streamsign_aws_v4::{ChunkedPayloadSigner, Credential, RequestSigner, SigningAlgorithm};
//! use streamsign_core::{Context, SignRequest};
//!
//! # fn main() -> anyhow::Result<()> {
//! let body = b"Hello, World!".to_vec();
//! let (mut parts, _) = http::Request::builder()
//!     .method("PUT")
//!     .uri("https://examplebucket.s3.amazonaws.com/hello.txt")
//!     .header("content-length", body.len())
//!     .body(())?
//!     .into_parts();
//!
//! let mut payload = ChunkedPayloadSigner::signed(SigningAlgorithm::HmacSha256);
//! payload.before_signing(&mut parts, Some(&body))?;
//!
//! let credential = Credential::new("access_key_id", "secret_access_key");
//! let seed = RequestSigner::new("s3", "us-east-1").sign_request(
//!     &Context::new(),
//!     &mut parts,
//!     &credential,
//! )?;
//!
//! let mut encoded = Vec::new();
//! payload.sign(body.as_slice(), &seed)?.read_to_end(&mut encoded)?;
//! # Ok(())
//! # }
//! ```

mod algorithm;
pub use algorithm::SigningAlgorithm;

mod checksum;
pub use checksum::compute_checksum;
pub use checksum::Checksum;
pub use checksum::ChecksumAlgorithm;

mod chunked;
pub use chunked::*;

mod config;
pub use config::Config;

mod constants;

mod credential;
pub use credential::Credential;

mod key_cache;
pub use key_cache::generate_signing_key;
pub use key_cache::SigningKey;
pub use key_cache::SigningKeyCache;
pub use key_cache::SigningKeyEntry;
pub use key_cache::DEFAULT_KEY_CACHE_CAPACITY;

mod payload;
pub use payload::ChunkedPayloadSigner;
pub use payload::ContentStreamProvider;
pub use payload::PayloadMode;

mod provide_credential;
pub use provide_credential::*;

mod rolling;
pub use rolling::ChunkSigningKey;
pub use rolling::RollingSigner;

mod scope;
pub use scope::compute_signature;
pub use scope::hash_canonical_request;
pub use scope::CredentialScope;
pub use scope::AWS4_REQUEST;

mod sign_request;
pub use sign_request::RequestSigner;
pub use sign_request::SigningOutput;

mod v4a;
pub use v4a::EcdsaSigningKey;
