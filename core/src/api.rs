use crate::{Context, Result};
use http::request::Parts;
use std::fmt::Debug;

/// SigningCredential is the trait used by signer as the signing credential.
pub trait SigningCredential: Clone + Debug + Send + Sync + Unpin + 'static {
    /// Check if the credential is valid.
    fn is_valid(&self) -> bool;

    /// Check if the credential is anonymous.
    ///
    /// Requests signed with an anonymous credential are sent unsigned.
    fn is_anonymous(&self) -> bool {
        false
    }
}

impl<T: SigningCredential> SigningCredential for Option<T> {
    fn is_valid(&self) -> bool {
        let Some(ctx) = self else {
            return false;
        };

        ctx.is_valid()
    }

    fn is_anonymous(&self) -> bool {
        self.as_ref().is_some_and(|v| v.is_anonymous())
    }
}

/// ProvideCredential is the trait used by signer to load the credential from the environment.
///
/// Credential provider chains (profiles, STS, IMDS) live outside this crate,
/// they only need to implement this trait.
#[async_trait::async_trait]
pub trait ProvideCredential: Debug + Send + Sync + Unpin + 'static {
    /// Credential returned by this loader.
    type Credential: Send + Sync + Unpin + 'static;

    /// Load signing credential from current env.
    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>>;
}

/// SignRequest is the trait used by signer to sign the request.
///
/// Signing is pure computation, so unlike credential loading it is synchronous.
pub trait SignRequest: Debug + Send + Sync + Unpin + 'static {
    /// Credential used by this builder.
    type Credential: Send + Sync + Unpin + 'static;

    /// Output produced by signing, e.g. the seed signature of a streaming payload.
    type Output;

    /// Sign the request in place.
    fn sign_request(
        &self,
        ctx: &Context,
        req: &mut Parts,
        credential: &Self::Credential,
    ) -> Result<Self::Output>;
}
