use std::fmt;

/// Signing algorithm a request and its payload chunks are signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SigningAlgorithm {
    /// SigV4: symmetric HMAC-SHA256 keys scoped to a single region.
    #[default]
    HmacSha256,
    /// SigV4a: ECDSA P-256 keys valid for a region set.
    EcdsaP256Sha256,
}

impl SigningAlgorithm {
    /// Identifier used in `Authorization` and the request string to sign.
    pub fn as_str(&self) -> &'static str {
        match self {
            SigningAlgorithm::HmacSha256 => "AWS4-HMAC-SHA256",
            SigningAlgorithm::EcdsaP256Sha256 => "AWS4-ECDSA-P256-SHA256",
        }
    }

    /// Identifier heading every chunk string to sign.
    pub fn payload_algorithm(&self) -> &'static str {
        match self {
            SigningAlgorithm::HmacSha256 => "AWS4-HMAC-SHA256-PAYLOAD",
            SigningAlgorithm::EcdsaP256Sha256 => "AWS4-ECDSA-P256-SHA256-PAYLOAD",
        }
    }

    /// Identifier heading the trailer string to sign.
    pub fn trailer_algorithm(&self) -> &'static str {
        match self {
            SigningAlgorithm::HmacSha256 => "AWS4-HMAC-SHA256-TRAILER",
            SigningAlgorithm::EcdsaP256Sha256 => "AWS4-ECDSA-P256-SHA256-TRAILER",
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
