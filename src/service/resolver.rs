use crate::config::PLACEHOLDER_MARKER;
use crate::google_oauth::credentials::CredentialBundle;
use tracing::warn;

/// Pick the database location: explicit override, then the bundle's `databaseURL`.
///
/// Empty strings count as unset. A location that still contains a template
/// placeholder is dropped with a warning.
pub fn resolve_database_location(
    env_override: Option<&str>,
    bundle: Option<&CredentialBundle>,
) -> Option<String> {
    let location = env_override
        .filter(|s| !s.is_empty())
        .or_else(|| bundle.and_then(|b| b.database_url.as_deref()))
        .filter(|s| !s.is_empty())?;

    if is_placeholder(location) {
        warn!(
            "DATABASE_URL contains a placeholder value; ignoring. Set DATABASE_URL env var to your database URL."
        );
        return None;
    }
    Some(location.to_string())
}

pub fn is_placeholder(location: &str) -> bool {
    location.contains(PLACEHOLDER_MARKER)
}
