//! Chained signatures for streaming payloads.
//!
//! Every string to sign embeds the signature produced before it, so a
//! dropped, reordered or altered chunk breaks the rest of the chain.

use std::collections::BTreeMap;

use log::trace;
use streamsign_core::hash::{hex_sha256, EMPTY_STRING_SHA256};
use streamsign_core::Result;

use crate::v4a::EcdsaSigningKey;
use crate::{CredentialScope, SigningAlgorithm, SigningKey};

/// Key a rolling signer signs with.
#[derive(Clone, Debug)]
pub enum ChunkSigningKey {
    /// SigV4 HMAC key.
    Hmac(SigningKey),
    /// SigV4a ECDSA key.
    Ecdsa(EcdsaSigningKey),
}

impl ChunkSigningKey {
    /// Algorithm this key signs with.
    pub fn algorithm(&self) -> SigningAlgorithm {
        match self {
            ChunkSigningKey::Hmac(_) => SigningAlgorithm::HmacSha256,
            ChunkSigningKey::Ecdsa(_) => SigningAlgorithm::EcdsaP256Sha256,
        }
    }

    /// Hex encoded signature of `string_to_sign`.
    pub fn sign(&self, string_to_sign: &str) -> Result<String> {
        match self {
            ChunkSigningKey::Hmac(key) => Ok(key.sign(string_to_sign)),
            ChunkSigningKey::Ecdsa(key) => key.sign(string_to_sign),
        }
    }
}

impl From<SigningKey> for ChunkSigningKey {
    fn from(key: SigningKey) -> Self {
        ChunkSigningKey::Hmac(key)
    }
}

impl From<EcdsaSigningKey> for ChunkSigningKey {
    fn from(key: EcdsaSigningKey) -> Self {
        ChunkSigningKey::Ecdsa(key)
    }
}

/// RollingSigner produces the signature chain of one request body.
///
/// It must be driven strictly in chunk emission order by a single owner.
#[derive(Debug)]
pub struct RollingSigner {
    key: ChunkSigningKey,
    signature: String,
}

impl RollingSigner {
    /// Create a rolling signer seeded with the request signature.
    pub fn new(key: impl Into<ChunkSigningKey>, seed_signature: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            signature: seed_signature.into(),
        }
    }

    /// Algorithm of the underlying key.
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.key.algorithm()
    }

    /// The most recent signature of the chain.
    pub fn current_signature(&self) -> &str {
        &self.signature
    }

    /// Sign the string `build` returns for the current signature.
    ///
    /// The result replaces the current signature.
    pub fn sign(&mut self, build: impl FnOnce(&str) -> String) -> Result<String> {
        let string_to_sign = build(&self.signature);
        trace!("rolling string to sign: {string_to_sign}");

        let signature = self.key.sign(&string_to_sign)?;
        self.signature.clone_from(&signature);
        Ok(signature)
    }

    /// Sign one chunk of payload, the final empty chunk included.
    pub fn sign_chunk(&mut self, scope: &CredentialScope, chunk: &[u8]) -> Result<String> {
        let algorithm = self.algorithm();
        let datetime = scope.datetime();
        let scope = scope.scope_for(algorithm);
        let chunk_hash = hex_sha256(chunk);

        self.sign(|previous| {
            format!(
                "{}\n{datetime}\n{scope}\n{previous}\n{EMPTY_STRING_SHA256}\n{chunk_hash}",
                algorithm.payload_algorithm()
            )
        })
    }

    /// Sign the trailers emitted after the final chunk.
    ///
    /// Trailers are canonicalized like headers: lowercase names sorted by
    /// name, repeated names joined with `,`, hashed as `name:value\n` lines.
    pub fn sign_trailer(
        &mut self,
        scope: &CredentialScope,
        trailers: &[(String, String)],
    ) -> Result<String> {
        let algorithm = self.algorithm();
        let datetime = scope.datetime();
        let scope = scope.scope_for(algorithm);
        let trailer_hash = hex_sha256(canonical_trailers(trailers).as_bytes());

        self.sign(|previous| {
            format!(
                "{}\n{datetime}\n{scope}\n{previous}\n{trailer_hash}",
                algorithm.trailer_algorithm()
            )
        })
    }
}

fn canonical_trailers(trailers: &[(String, String)]) -> String {
    let mut grouped: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for (name, value) in trailers {
        grouped
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.as_str());
    }

    let mut canonical = String::new();
    for (name, values) in grouped {
        canonical.push_str(&name);
        canonical.push(':');
        canonical.push_str(&values.join(","));
        canonical.push('\n');
    }
    canonical
}
