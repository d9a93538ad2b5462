//! Credential scope and the canonical strings derived from it.

use std::fmt;

use streamsign_core::hash::{hex_sha256, hmac_sha256};
use streamsign_core::time::{format_date, format_iso8601, DateTime};
use streamsign_core::{Error, Result};

use crate::SigningAlgorithm;

/// Terminator of every credential scope.
pub const AWS4_REQUEST: &str = "aws4_request";

/// CredentialScope bounds the validity of a derived signing key.
///
/// It is immutable and created once per signing operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialScope {
    region: String,
    service: String,
    instant: DateTime,
}

impl CredentialScope {
    /// Create a new credential scope.
    ///
    /// Blank region or service is rejected before any cryptographic work.
    pub fn new(
        region: impl Into<String>,
        service: impl Into<String>,
        instant: DateTime,
    ) -> Result<Self> {
        let region = region.into();
        let service = service.into();
        if region.trim().is_empty() {
            return Err(Error::scope_invalid(
                "region of the credential scope must not be blank",
            ));
        }
        if service.trim().is_empty() {
            return Err(Error::scope_invalid(
                "service of the credential scope must not be blank",
            ));
        }

        Ok(Self {
            region,
            service,
            instant,
        })
    }

    /// Region, or for SigV4a the region set.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Signing name of the service.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Signing instant.
    pub fn instant(&self) -> DateTime {
        self.instant
    }

    /// `yyyyMMdd` in UTC.
    pub fn date(&self) -> String {
        format_date(self.instant)
    }

    /// `yyyyMMdd'T'HHmmss'Z'` in UTC.
    pub fn datetime(&self) -> String {
        format_iso8601(self.instant)
    }

    /// `{date}/{region}/{service}/aws4_request`
    pub fn scope(&self) -> String {
        format!(
            "{}/{}/{}/{AWS4_REQUEST}",
            self.date(),
            self.region,
            self.service
        )
    }

    /// SigV4a scopes carry no region: `{date}/{service}/aws4_request`
    pub fn scope_v4a(&self) -> String {
        format!("{}/{}/{AWS4_REQUEST}", self.date(), self.service)
    }

    /// Scope string used by the given algorithm.
    pub fn scope_for(&self, algorithm: SigningAlgorithm) -> String {
        match algorithm {
            SigningAlgorithm::HmacSha256 => self.scope(),
            SigningAlgorithm::EcdsaP256Sha256 => self.scope_v4a(),
        }
    }
}

impl fmt::Display for CredentialScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.scope())
    }
}

/// Hex encoded SHA256 of a canonical request.
pub fn hash_canonical_request(canonical_request: &str) -> String {
    hex_sha256(canonical_request.as_bytes())
}

/// HMAC-SHA256 of the string to sign under the signing key.
pub fn compute_signature(string_to_sign: &str, signing_key: &[u8]) -> Vec<u8> {
    hmac_sha256(signing_key, string_to_sign.as_bytes())
}
