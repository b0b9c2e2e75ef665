use super::endpoints::{AccessToken, GoogleOauthEndpoints, ServiceAccountSigner};
use crate::error::{GatewayError, IsRetryable};
use crate::google_oauth::credentials::{AuthorizedUser, CredentialBundle, GoogleCredential};
use crate::service::credential_loader;

use backon::{ExponentialBuilder, Retryable};
use chrono::{Duration as ChronoDuration, Utc};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Tokens closer than this to expiry are replaced.
const REFRESH_MARGIN_MINUTES: i64 = 5;

fn default_retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(200))
        .with_max_delay(Duration::from_secs(2))
        .with_max_times(3)
        .with_jitter()
}

/// Where access tokens come from.
#[derive(Clone)]
pub enum CredentialSource {
    ServiceAccount(ServiceAccountSigner),
    AuthorizedUser(AuthorizedUser),
    /// Default service account of the GCE/Cloud Run instance.
    MetadataServer,
}

impl CredentialSource {
    /// Validate a credential taken from a bundle. Fails on unusable key material.
    pub fn from_credential(cred: GoogleCredential) -> Result<Self, GatewayError> {
        match cred {
            GoogleCredential::ServiceAccount(key) => {
                Ok(Self::ServiceAccount(ServiceAccountSigner::new(key)?))
            }
            GoogleCredential::AuthorizedUser(user) => Ok(Self::AuthorizedUser(user)),
        }
    }

    pub fn from_bundle(bundle: &CredentialBundle) -> Result<Self, GatewayError> {
        Self::from_credential(GoogleCredential::from_bundle(bundle)?)
    }

    /// Application default credentials: gcloud's well-known file, else the metadata server.
    pub fn application_default() -> Result<Self, GatewayError> {
        if let Some(path) = well_known_adc_path()
            && let Some(bundle) = credential_loader::load_bundle(&path)
        {
            info!(path = %path.display(), "using gcloud application default credentials");
            return Self::from_bundle(&bundle);
        }
        info!("using metadata server application default credentials");
        Ok(Self::MetadataServer)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ServiceAccount(_) => "service_account",
            Self::AuthorizedUser(_) => "authorized_user",
            Self::MetadataServer => "metadata_server",
        }
    }

    async fn mint(&self, http_client: reqwest::Client) -> Result<AccessToken, GatewayError> {
        match self {
            Self::ServiceAccount(signer) => {
                GoogleOauthEndpoints::exchange_jwt_assertion(signer, http_client).await
            }
            Self::AuthorizedUser(user) => {
                GoogleOauthEndpoints::refresh_access_token(user, http_client).await
            }
            Self::MetadataServer => GoogleOauthEndpoints::fetch_metadata_token(http_client).await,
        }
    }
}

fn well_known_adc_path() -> Option<PathBuf> {
    let config_dir = if cfg!(windows) {
        std::env::var_os("APPDATA").map(PathBuf::from)
    } else {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    }?;
    Some(
        config_dir
            .join("gcloud")
            .join("application_default_credentials.json"),
    )
}

/// Hands out cached access tokens, minting a new one when the cached token is stale.
pub struct AccessTokenProvider {
    source: CredentialSource,
    http_client: reqwest::Client,
    cached: Mutex<Option<AccessToken>>,
}

impl AccessTokenProvider {
    pub fn new(source: CredentialSource, http_client: reqwest::Client) -> Self {
        Self {
            source,
            http_client,
            cached: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &CredentialSource {
        &self.source
    }

    /// Current bearer token. Concurrent callers wait on one refresh.
    pub async fn access_token(&self) -> Result<String, GatewayError> {
        let mut cached = self.cached.lock().await;
        let margin = ChronoDuration::minutes(REFRESH_MARGIN_MINUTES);
        if let Some(token) = cached.as_ref()
            && token.is_fresh(Utc::now(), margin)
        {
            return Ok(token.secret.clone());
        }

        debug!(source = self.source.kind(), "access token missing or stale");
        let token = self.mint_with_retry().await?;
        let secret = token.secret.clone();
        *cached = Some(token);
        Ok(secret)
    }

    async fn mint_with_retry(&self) -> Result<AccessToken, GatewayError> {
        (|| async { self.source.mint(self.http_client.clone()).await })
            .retry(default_retry_policy())
            .when(|e: &GatewayError| e.is_retryable())
            .notify(|err, dur: Duration| {
                warn!(
                    "access token request retrying after error {}, sleeping {:?}",
                    err, dur
                );
            })
            .await
    }
}
