use std::sync::Arc;

use streamsign_core::{Context, Error, Result};

use crate::chunked::DEFAULT_CHUNK_SIZE;
use crate::constants::*;
use crate::key_cache::DEFAULT_KEY_CACHE_CAPACITY;
use crate::{
    ChecksumAlgorithm, ChunkedPayloadSigner, RequestSigner, SigningAlgorithm, SigningKeyCache,
};

/// Config for streaming AWS signing.
#[derive(Clone, Debug)]
pub struct Config {
    /// `region` is the region of the service, loaded from `AWS_REGION`
    /// or `AWS_DEFAULT_REGION`.
    pub region: Option<String>,
    /// `service` is the signing name of the service, `s3` by default.
    pub service: String,
    /// `chunk_size` is the number of payload bytes per `aws-chunked` chunk,
    /// loaded from `AWS_STREAMSIGN_CHUNK_SIZE`.
    pub chunk_size: usize,
    /// `checksum_algorithm` adds a checksum trailer to every payload, loaded
    /// from `AWS_STREAMSIGN_CHECKSUM_ALGORITHM`.
    pub checksum_algorithm: Option<ChecksumAlgorithm>,
    /// `key_cache_capacity` bounds the number of cached signing keys.
    pub key_cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: None,
            service: "s3".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            checksum_algorithm: None,
            key_cache_capacity: DEFAULT_KEY_CACHE_CAPACITY,
        }
    }
}

impl Config {
    /// Load config from env, values already set are kept.
    pub fn from_env(mut self, ctx: &Context) -> Result<Self> {
        let envs = ctx.env_vars();

        if self.region.is_none() {
            self.region = envs
                .get(AWS_REGION)
                .or_else(|| envs.get(AWS_DEFAULT_REGION))
                .cloned();
        }

        if let Some(v) = envs.get(AWS_STREAMSIGN_CHUNK_SIZE) {
            self.chunk_size = v.trim().parse().map_err(|e| {
                Error::config_invalid(format!("{AWS_STREAMSIGN_CHUNK_SIZE} is not a size: {v}"))
                    .with_source(e)
            })?;
        }

        if let Some(v) = envs.get(AWS_STREAMSIGN_CHECKSUM_ALGORITHM) {
            self.checksum_algorithm = Some(v.trim().parse()?);
        }

        self.validate()?;
        Ok(self)
    }

    /// Check the config for values no signer can work with.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::config_invalid("chunk size must be at least 1"));
        }
        if self.key_cache_capacity == 0 {
            return Err(Error::config_invalid("key cache capacity must be at least 1"));
        }
        Ok(())
    }

    /// Build a request signer for `algorithm`.
    pub fn request_signer(&self, algorithm: SigningAlgorithm) -> Result<RequestSigner> {
        self.validate()?;
        let region = self
            .region
            .as_deref()
            .ok_or_else(|| Error::config_invalid("region is not configured"))?;
        let cache = SigningKeyCache::new(self.key_cache_capacity)?;

        Ok(RequestSigner::new(&self.service, region)
            .with_algorithm(algorithm)
            .with_cache(Arc::new(cache)))
    }

    /// Build a payload signer, signing chunks with `algorithm` if set.
    pub fn payload_signer(
        &self,
        algorithm: Option<SigningAlgorithm>,
    ) -> Result<ChunkedPayloadSigner> {
        self.validate()?;
        let signer = match algorithm {
            Some(algorithm) => ChunkedPayloadSigner::signed(algorithm),
            None => ChunkedPayloadSigner::unsigned(),
        };
        let signer = signer.with_chunk_size(self.chunk_size);

        Ok(match self.checksum_algorithm {
            Some(checksum) => signer.with_checksum(checksum),
            None => signer,
        })
    }
}
