use std::io::Read;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use http::header::CONTENT_LENGTH;
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::Signature;
use pretty_assertions::assert_eq;
use sha2::{Digest, Sha256};
use streamsign_aws_v4::{
    ChecksumAlgorithm, ChunkSigningKey, ChunkedPayloadSigner, Credential, PayloadMode,
    RequestSigner, SigningAlgorithm,
};
use streamsign_core::hash::EMPTY_STRING_SHA256;
use streamsign_core::{Context, SignRequest};

use super::decode;

fn verify(key: &ChunkSigningKey, string_to_sign: &str, signature: &str) -> Result<()> {
    let ChunkSigningKey::Ecdsa(key) = key else {
        panic!("v4a must sign with an ecdsa key");
    };
    let signature = Signature::from_der(&hex::decode(signature)?)?;
    key.verifying_key()
        .verify(string_to_sign.as_bytes(), &signature)?;
    Ok(())
}

#[test]
fn test_v4a_streaming_with_checksum() -> Result<()> {
    crate::init_logger();

    let body = b"The quick brown fox jumps over the lazy dog".repeat(10);
    let (mut parts, _) = http::Request::builder()
        .method("PUT")
        .uri("https://examplebucket.s3.amazonaws.com/fox.txt")
        .header(CONTENT_LENGTH, body.len())
        .body(())?
        .into_parts();

    let mut payload = ChunkedPayloadSigner::signed(SigningAlgorithm::EcdsaP256Sha256)
        .with_chunk_size(100)
        .with_checksum(ChecksumAlgorithm::Crc32);
    payload.before_signing(&mut parts, None)?;
    assert_eq!(payload.payload_mode(), PayloadMode::EcdsaSignedPayloadTrailer);

    let time = Utc
        .with_ymd_and_hms(2015, 8, 30, 12, 36, 0)
        .single()
        .expect("valid time");
    let seed = RequestSigner::new("s3", "us-east-1")
        .with_algorithm(SigningAlgorithm::EcdsaP256Sha256)
        .with_time(time)
        .sign_request(
            &Context::new(),
            &mut parts,
            &Credential::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"),
        )?;

    let mut encoded = Vec::new();
    payload.sign(body.as_slice(), &seed)?.read_to_end(&mut encoded)?;
    assert_eq!(
        parts.headers[CONTENT_LENGTH],
        encoded.len().to_string().as_str()
    );

    let decoded = decode(&encoded);
    // 430 bytes in chunks of 100, plus the terminating chunk.
    assert_eq!(decoded.chunks.len(), 6);
    let data = decoded
        .chunks
        .iter()
        .flat_map(|c| c.data.clone())
        .collect::<Vec<_>>();
    assert_eq!(data, body);

    let mut previous = seed.signature().to_string();
    for chunk in &decoded.chunks {
        let signature = chunk.signature.as_deref().expect("chunk must be signed");
        let string_to_sign = format!(
            "AWS4-ECDSA-P256-SHA256-PAYLOAD\n20150830T123600Z\n20150830/s3/aws4_request\n{previous}\n{EMPTY_STRING_SHA256}\n{}",
            hex::encode(Sha256::digest(&chunk.data))
        );
        verify(seed.signing_key(), &string_to_sign, signature)?;
        previous = signature.to_string();
    }

    assert_eq!(decoded.trailers.len(), 2);
    let (name, value) = &decoded.trailers[0];
    assert_eq!(name, "x-amz-checksum-crc32");
    assert_eq!(
        value,
        &streamsign_aws_v4::compute_checksum(ChecksumAlgorithm::Crc32, &body)
    );

    let (name, signature) = &decoded.trailers[1];
    assert_eq!(name, "x-amz-trailer-signature");
    let signature = signature.trim_end_matches('*');
    let string_to_sign = format!(
        "AWS4-ECDSA-P256-SHA256-TRAILER\n20150830T123600Z\n20150830/s3/aws4_request\n{previous}\n{}",
        hex::encode(Sha256::digest(format!("x-amz-checksum-crc32:{value}\n")))
    );
    verify(seed.signing_key(), &string_to_sign, signature)?;
    Ok(())
}
