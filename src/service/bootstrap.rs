use crate::config::Config;
use crate::db::{DatabaseAuth, RealtimeDatabase, RealtimeStore};
use crate::error::GatewayError;
use crate::google_oauth::credentials::CredentialBundle;
use crate::google_oauth::service::{AccessTokenProvider, CredentialSource};
use crate::service::{credential_loader, resolver};

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Shared outbound client. Only connection setup is bounded; calls themselves are not.
pub fn build_http_client() -> Result<reqwest::Client, GatewayError> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("device-gateway/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .build()?)
}

/// Pick the credential the app runs with.
///
/// A loaded bundle must yield a usable credential; otherwise application
/// default credentials are used when explicitly requested, else none.
pub fn initialize_auth(
    cfg: &Config,
    bundle: Option<&CredentialBundle>,
    http_client: &reqwest::Client,
) -> Result<DatabaseAuth, GatewayError> {
    let source = match bundle {
        Some(bundle) => Some(CredentialSource::from_bundle(bundle)?),
        None if cfg.wants_application_default() => Some(CredentialSource::application_default()?),
        None => None,
    };

    if cfg.emulator_host().is_some() {
        return Ok(DatabaseAuth::Emulator);
    }
    Ok(match source {
        Some(source) => DatabaseAuth::Token(Arc::new(AccessTokenProvider::new(
            source,
            http_client.clone(),
        ))),
        None => DatabaseAuth::Anonymous,
    })
}

/// Resolve credentials and location once and build the database handle.
///
/// Every failure here is logged and yields `None`; the gateway then answers
/// database routes with 503 for the rest of its life.
pub fn build_store(
    cfg: &Config,
    http_client: &reqwest::Client,
) -> Option<Arc<dyn RealtimeStore>> {
    let credential_path = cfg.credential_path();
    let bundle = credential_loader::load_bundle(&credential_path);
    let database_url =
        resolver::resolve_database_location(cfg.database_url.as_deref(), bundle.as_ref());

    let auth = match initialize_auth(cfg, bundle.as_ref(), http_client) {
        Ok(auth) => {
            info!(
                auth = auth.describe(),
                database_url = database_url.as_deref().unwrap_or("(no databaseURL)"),
                "realtime database credentials initialized"
            );
            auth
        }
        Err(e) => {
            error!(error = %e, "error initializing realtime database credentials");
            return None;
        }
    };

    let Some(database_url) = database_url else {
        warn!(
            "Realtime Database not configured (no DATABASE_URL). API endpoints that use the DB will return 503."
        );
        return None;
    };

    match RealtimeDatabase::connect(
        &database_url,
        cfg.emulator_host(),
        auth,
        http_client.clone(),
    ) {
        Ok(db) => {
            info!(base = %db.base_url(), "realtime database client ready");
            Some(Arc::new(db))
        }
        Err(e) => {
            warn!(error = %e, "failed to initialize realtime database client");
            None
        }
    }
}
