use crate::{Context, Error, ProvideCredential, Result, SignRequest, SigningCredential};
use log::debug;
use std::sync::{Arc, Mutex};

/// Signer is the main struct used to sign the request.
///
/// It loads a credential through the provider, keeps it while it stays
/// valid, and hands it to the request signer. Anonymous credentials leave
/// the request untouched.
#[derive(Clone, Debug)]
pub struct Signer<K: SigningCredential, O: 'static> {
    ctx: Context,
    loader: Arc<dyn ProvideCredential<Credential = K>>,
    builder: Arc<dyn SignRequest<Credential = K, Output = O>>,
    credential: Arc<Mutex<Option<K>>>,
}

impl<K: SigningCredential, O: 'static> Signer<K, O> {
    /// Create a new signer.
    pub fn new(
        ctx: Context,
        loader: impl ProvideCredential<Credential = K>,
        builder: impl SignRequest<Credential = K, Output = O>,
    ) -> Self {
        Self {
            ctx,

            loader: Arc::new(loader),
            builder: Arc::new(builder),
            credential: Arc::new(Mutex::new(None)),
        }
    }

    /// Sign the request.
    ///
    /// Returns `Ok(None)` when the credential is anonymous, in that case the
    /// request is not modified at all.
    pub async fn sign(&self, req: &mut http::request::Parts) -> Result<Option<O>> {
        let credential = self.cached_credential()?;
        let credential = if credential.is_valid() {
            credential
        } else {
            let loaded = self.loader.provide_credential(&self.ctx).await?;
            *self
                .credential
                .lock()
                .map_err(|_| Error::unexpected("credential lock poisoned"))? = loaded.clone();
            loaded
        };

        let Some(credential) = credential else {
            return Err(Error::credential_invalid(
                "no valid credential found by the credential provider",
            ));
        };

        if credential.is_anonymous() {
            debug!("credential is anonymous, request will be sent unsigned");
            return Ok(None);
        }

        self.builder
            .sign_request(&self.ctx, req, &credential)
            .map(Some)
    }

    fn cached_credential(&self) -> Result<Option<K>> {
        Ok(self
            .credential
            .lock()
            .map_err(|_| Error::unexpected("credential lock poisoned"))?
            .clone())
    }
}
