use std::fmt::Write;
use std::sync::Arc;

use http::request::Parts;
use http::{header, HeaderValue};
use log::debug;
use percent_encoding::{percent_decode_str, utf8_percent_encode};
use streamsign_core::time::{format_iso8601, now, DateTime};
use streamsign_core::{Context, Error, Result, SignRequest, SigningRequest};

use crate::constants::{
    AWS_QUERY_ENCODE_SET, AWS_URI_ENCODE_SET, UNSIGNED_HEADERS, UNSIGNED_PAYLOAD,
    X_AMZ_CONTENT_SHA_256, X_AMZ_DATE, X_AMZ_REGION_SET, X_AMZ_SECURITY_TOKEN,
};
use crate::scope::hash_canonical_request;
use crate::{
    ChunkSigningKey, Credential, CredentialScope, EcdsaSigningKey, RollingSigner,
    SigningAlgorithm, SigningKeyCache,
};

/// Result of signing a request, used to seed the payload signature chain.
#[derive(Clone, Debug)]
pub struct SigningOutput {
    signature: String,
    signing_key: ChunkSigningKey,
    scope: CredentialScope,
}

impl SigningOutput {
    /// Signature written into the `Authorization` header.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Key the request was signed with.
    pub fn signing_key(&self) -> &ChunkSigningKey {
        &self.signing_key
    }

    /// Scope the request was signed for.
    pub fn scope(&self) -> &CredentialScope {
        &self.scope
    }

    /// Rolling signer continuing from this request signature.
    pub fn rolling_signer(&self) -> RollingSigner {
        RollingSigner::new(self.signing_key.clone(), self.signature.clone())
    }
}

/// RequestSigner that implement AWS SigV4 and SigV4a with header based signatures.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
/// - [Signing with SigV4a](https://docs.aws.amazon.com/IAM/latest/UserGuide/reference_sigv-create-signed-request.html)
#[derive(Debug)]
pub struct RequestSigner {
    service: String,
    region: String,
    algorithm: SigningAlgorithm,
    cache: Arc<SigningKeyCache>,

    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new SigV4 signer with its own signing key cache.
    pub fn new(service: &str, region: &str) -> Self {
        Self {
            service: service.into(),
            region: region.into(),
            algorithm: SigningAlgorithm::default(),
            cache: Arc::new(SigningKeyCache::default()),

            time: None,
        }
    }

    /// Sign with `algorithm` instead of SigV4.
    pub fn with_algorithm(mut self, algorithm: SigningAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Share a signing key cache with other signers.
    pub fn with_cache(mut self, cache: Arc<SigningKeyCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Signing algorithm in use.
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    fn signing_key(&self, cred: &Credential, scope: &CredentialScope) -> Result<ChunkSigningKey> {
        match self.algorithm {
            SigningAlgorithm::HmacSha256 => {
                Ok(self.cache.derive_signing_key(cred, scope)?.into())
            }
            SigningAlgorithm::EcdsaP256Sha256 => Ok(EcdsaSigningKey::derive(cred)?.into()),
        }
    }
}

impl SignRequest for RequestSigner {
    type Credential = Credential;
    type Output = SigningOutput;

    fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        credential: &Self::Credential,
    ) -> Result<Self::Output> {
        let now = self.time.unwrap_or_else(now);
        let cred = credential.sanitize();
        cred.validate()?;

        let scope = CredentialScope::new(&self.region, &self.service, now)?;
        let signing_key = self.signing_key(&cred, &scope)?;

        let mut signed_req = SigningRequest::build(req)?;

        // canonicalize context
        canonicalize_header(&mut signed_req, &cred, self.algorithm, &scope)?;
        canonicalize_query(&mut signed_req);

        // build canonical request and string to sign.
        let creq = canonical_request_string(&signed_req)?;
        debug!("calculated canonical request: {creq}");
        let encoded_req = hash_canonical_request(&creq);

        // Scope: "20220313/<region>/<service>/aws4_request", V4a drops the region.
        let credential_scope = scope.scope_for(self.algorithm);
        debug!("calculated scope: {credential_scope}");

        // StringToSign:
        //
        // AWS4-HMAC-SHA256
        // 20220313T072004Z
        // 20220313/<region>/<service>/aws4_request
        // <hashed_canonical_request>
        let string_to_sign = {
            let mut f = String::new();
            writeln!(f, "{}", self.algorithm)?;
            writeln!(f, "{}", scope.datetime())?;
            writeln!(f, "{credential_scope}")?;
            write!(f, "{encoded_req}")?;
            f
        };
        debug!("calculated string to sign: {string_to_sign}");

        let signature = signing_key.sign(&string_to_sign)?;

        let mut authorization = HeaderValue::from_str(&format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            self.algorithm,
            cred.access_key_id,
            credential_scope,
            signed_header_names(&signed_req).join(";"),
            signature
        ))?;
        authorization.set_sensitive(true);
        signed_req
            .headers
            .insert(header::AUTHORIZATION, authorization);

        // Apply to the request.
        signed_req.apply(req)?;

        Ok(SigningOutput {
            signature,
            signing_key,
            scope,
        })
    }
}

fn signed_header_names(ctx: &SigningRequest) -> Vec<&str> {
    ctx.header_name_to_vec_sorted(|name| {
        name == header::AUTHORIZATION.as_str() || UNSIGNED_HEADERS.contains(&name)
    })
}

fn canonical_request_string(ctx: &SigningRequest) -> Result<String> {
    // 256 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(256);

    // Insert method
    writeln!(f, "{}", ctx.method)?;
    // Insert encoded path
    let path = percent_decode_str(&ctx.path)
        .decode_utf8()
        .map_err(|e| Error::request_invalid("failed to decode path").with_source(e))?;
    writeln!(f, "{}", utf8_percent_encode(&path, &AWS_URI_ENCODE_SET))?;
    // Insert query
    writeln!(
        f,
        "{}",
        ctx.query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    )?;
    // Insert signed headers
    let signed_headers = signed_header_names(ctx);
    for name in signed_headers.iter() {
        let values = ctx
            .headers
            .get_all(*name)
            .iter()
            .map(|v| v.to_str())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        writeln!(f, "{}:{}", name, values.join(","))?;
    }
    writeln!(f)?;
    writeln!(f, "{}", signed_headers.join(";"))?;

    match ctx.headers.get(X_AMZ_CONTENT_SHA_256) {
        Some(v) => write!(f, "{}", v.to_str()?)?,
        None => write!(f, "{UNSIGNED_PAYLOAD}")?,
    }

    Ok(f)
}

fn canonicalize_header(
    ctx: &mut SigningRequest,
    cred: &Credential,
    algorithm: SigningAlgorithm,
    scope: &CredentialScope,
) -> Result<()> {
    // Header names and values need to be normalized according to Step 4 of https://docs.aws.amazon.com/general/latest/gr/sigv4-create-canonical-request.html
    for (_, value) in ctx.headers.iter_mut() {
        SigningRequest::header_value_normalize(value)
    }

    // Insert HOST header if not present.
    if ctx.headers.get(header::HOST).is_none() {
        ctx.headers
            .insert(header::HOST, ctx.authority.as_str().parse()?);
    }

    // Insert DATE header if not present.
    if ctx.headers.get(X_AMZ_DATE).is_none() {
        let date_header = HeaderValue::try_from(format_iso8601(scope.instant()))?;
        ctx.headers.insert(X_AMZ_DATE, date_header);
    }

    // Insert X_AMZ_CONTENT_SHA_256 header if not present.
    if ctx.headers.get(X_AMZ_CONTENT_SHA_256).is_none() {
        ctx.headers.insert(
            X_AMZ_CONTENT_SHA_256,
            HeaderValue::from_static(UNSIGNED_PAYLOAD),
        );
    }

    // Insert X_AMZ_SECURITY_TOKEN header if security token exists.
    if let Some(token) = &cred.session_token {
        let mut value = HeaderValue::from_str(token)?;
        // Set token value sensitive to valid leaking.
        value.set_sensitive(true);

        ctx.headers.insert(X_AMZ_SECURITY_TOKEN, value);
    }

    if algorithm == SigningAlgorithm::EcdsaP256Sha256 {
        ctx.headers
            .insert(X_AMZ_REGION_SET, HeaderValue::from_str(scope.region())?);
    }

    Ok(())
}

fn canonicalize_query(ctx: &mut SigningRequest) {
    // Return if query is empty.
    if ctx.query.is_empty() {
        return;
    }

    // Sort by param name
    ctx.query.sort();

    ctx.query = ctx
        .query
        .iter()
        .map(|(k, v)| {
            (
                utf8_percent_encode(k, &AWS_QUERY_ENCODE_SET).to_string(),
                utf8_percent_encode(v, &AWS_QUERY_ENCODE_SET).to_string(),
            )
        })
        .collect();
}
