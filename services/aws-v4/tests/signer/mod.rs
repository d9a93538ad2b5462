use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use http::header::AUTHORIZATION;
use streamsign_aws_v4::{
    Config, EnvCredentialProvider, RequestSigner, SigningAlgorithm, SigningKeyCache,
    StaticCredentialProvider,
};
use streamsign_core::{Context, ErrorKind, Signer, StaticEnv};

fn request() -> Result<http::request::Parts> {
    let (parts, _) = http::Request::builder()
        .method("GET")
        .uri("https://examplebucket.s3.amazonaws.com/hello.txt")
        .body(())?
        .into_parts();
    Ok(parts)
}

fn context(envs: &[(&str, &str)]) -> Context {
    let envs = envs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<HashMap<_, _>>();
    Context::new().with_env(StaticEnv { envs })
}

#[tokio::test]
async fn test_anonymous_request_is_not_signed() -> Result<()> {
    crate::init_logger();

    let signer = Signer::new(
        Context::new(),
        StaticCredentialProvider::anonymous(),
        RequestSigner::new("s3", "us-east-1"),
    );

    let mut parts = request()?;
    let output = signer.sign(&mut parts).await?;

    assert!(output.is_none());
    assert!(parts.headers.get(AUTHORIZATION).is_none());
    assert!(parts.headers.get("x-amz-date").is_none());
    Ok(())
}

#[tokio::test]
async fn test_env_credential_request_is_signed() -> Result<()> {
    crate::init_logger();

    let ctx = context(&[
        ("AWS_ACCESS_KEY_ID", "access_key_id"),
        ("AWS_SECRET_ACCESS_KEY", "secret_access_key"),
        ("AWS_SESSION_TOKEN", "session_token"),
        ("AWS_REGION", "eu-west-1"),
    ]);
    let config = Config::default().from_env(&ctx)?;
    let signer = Signer::new(
        ctx,
        EnvCredentialProvider::new(),
        config.request_signer(SigningAlgorithm::HmacSha256)?,
    );

    let mut parts = request()?;
    let output = signer.sign(&mut parts).await?.expect("request must be signed");

    let authorization = parts.headers[AUTHORIZATION].to_str()?;
    assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=access_key_id/"));
    assert!(authorization.contains("/eu-west-1/s3/aws4_request"));
    assert!(authorization.ends_with(output.signature()));
    assert_eq!(parts.headers["x-amz-security-token"], "session_token");
    Ok(())
}

#[tokio::test]
async fn test_missing_credential_is_an_error() -> Result<()> {
    crate::init_logger();

    let signer = Signer::new(
        context(&[]),
        EnvCredentialProvider::new(),
        RequestSigner::new("s3", "us-east-1"),
    );

    let mut parts = request()?;
    let err = signer
        .sign(&mut parts)
        .await
        .expect_err("missing credential must fail");
    assert_eq!(err.kind(), ErrorKind::CredentialInvalid);
    assert!(!err.is_retryable());
    Ok(())
}

#[tokio::test]
async fn test_signers_share_key_cache() -> Result<()> {
    crate::init_logger();

    let cache = Arc::new(SigningKeyCache::default());
    let provider = StaticCredentialProvider::new("access_key_id", "secret_access_key");

    for region in ["us-east-1", "us-west-2", "us-east-1"] {
        let signer = Signer::new(
            Context::new(),
            provider.clone(),
            RequestSigner::new("s3", region).with_cache(cache.clone()),
        );
        let mut parts = request()?;
        signer.sign(&mut parts).await?;
    }

    assert_eq!(cache.len(), 2);
    Ok(())
}
