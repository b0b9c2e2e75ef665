use crate::error::GatewayError;
use crate::google_oauth::credentials::CredentialBundle;
use serde_json::Value;
use std::{fs, path::Path};
use tracing::{debug, info, warn};

/// Load the credential bundle at `path`, if there is a readable one.
///
/// A missing file is plain absence. A file that cannot be read or parsed is
/// logged and also treated as absent.
pub fn load_bundle(path: &Path) -> Option<CredentialBundle> {
    if !path.exists() {
        debug!(path = %path.display(), "credential file not found; skipping load");
        return None;
    }

    load_credential(path)
        .inspect(|_| info!(path = %path.display(), "credential bundle loaded"))
        .inspect_err(|e| {
            warn!(path = %path.display(), error = %e, "failed to load service account");
        })
        .ok()
}

fn load_credential(path: &Path) -> Result<CredentialBundle, GatewayError> {
    let contents = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    Ok(CredentialBundle::from_payload(value))
}
