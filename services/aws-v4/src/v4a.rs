//! SigV4a: ECDSA P-256 keys derived from the secret access key.

use std::fmt::{Debug, Formatter};

use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use streamsign_core::hash::hmac_sha256;
use streamsign_core::{Error, Result};

use crate::constants::{ECDSA_SIGNATURE_LENGTH, ECDSA_SIGNATURE_PADDING};
use crate::Credential;

const ALGORITHM: &[u8] = b"AWS4-ECDSA-P256-SHA256";

/// Order of the P-256 group minus two, big endian.
const N_MINUS_2: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xBC, 0xE6, 0xFA, 0xAD, 0xA7, 0x17, 0x9E, 0x84, 0xF3, 0xB9, 0xCA, 0xC2, 0xFC, 0x63, 0x25, 0x4F,
];

/// ECDSA P-256 signing key for SigV4a.
///
/// Unlike SigV4 keys it is independent of date, region and service.
#[derive(Clone)]
pub struct EcdsaSigningKey(SigningKey);

impl Debug for EcdsaSigningKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("EcdsaSigningKey(<redacted>)")
    }
}

impl EcdsaSigningKey {
    /// Derive the key pair for `credential` with the counter based HMAC KDF.
    pub fn derive(credential: &Credential) -> Result<Self> {
        let credential = credential.sanitize();
        credential.validate()?;

        let input_key = format!("AWS4A{}", credential.secret_access_key);
        for counter in 1..=u8::MAX {
            // 1i32 || "AWS4-ECDSA-P256-SHA256" || 0x00 || access_key || counter || 256i32
            let mut fis = Vec::with_capacity(ALGORITHM.len() + credential.access_key_id.len() + 10);
            fis.extend_from_slice(&1i32.to_be_bytes());
            fis.extend_from_slice(ALGORITHM);
            fis.push(0);
            fis.extend_from_slice(credential.access_key_id.as_bytes());
            fis.push(counter);
            fis.extend_from_slice(&256i32.to_be_bytes());

            let tag = hmac_sha256(input_key.as_bytes(), &fis);
            let mut candidate = [0u8; 32];
            candidate.copy_from_slice(&tag[..32]);

            if candidate <= N_MINUS_2 {
                increment(&mut candidate);
                let key = SigningKey::from_slice(&candidate).map_err(|e| {
                    Error::unexpected("derived sigv4a scalar is not a valid p256 key").with_source(e)
                })?;
                return Ok(Self(key));
            }
        }

        Err(Error::unexpected("sigv4a key derivation did not converge"))
    }

    /// Public half of the key pair.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey::from(&self.0)
    }

    /// Big endian secret scalar.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes().into()
    }

    /// Hex encoded DER ECDSA-SHA256 signature of `string_to_sign`.
    pub fn sign(&self, string_to_sign: &str) -> Result<String> {
        let signature: Signature = self
            .0
            .try_sign(string_to_sign.as_bytes())
            .map_err(|e| Error::unexpected("failed to sign with sigv4a key").with_source(e))?;
        Ok(hex::encode(signature.to_der().as_bytes()))
    }
}

/// Big endian increment, the caller guarantees no overflow.
fn increment(bytes: &mut [u8; 32]) {
    for b in bytes.iter_mut().rev() {
        let (v, overflow) = b.overflowing_add(1);
        *b = v;
        if !overflow {
            break;
        }
    }
}

/// Pad a SigV4a signature with `*` to its fixed wire length.
pub fn pad_signature(signature: &str) -> String {
    let mut padded = String::with_capacity(ECDSA_SIGNATURE_LENGTH);
    padded.push_str(signature);
    while padded.len() < ECDSA_SIGNATURE_LENGTH {
        padded.push(ECDSA_SIGNATURE_PADDING);
    }
    padded
}
