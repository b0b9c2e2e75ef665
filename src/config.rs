use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;
use url::Url;

/// Credential file looked up in the base directory when no override is set.
pub const DEFAULT_CREDENTIAL_FILE: &str = "serviceAccountKey.json";

/// Any database location containing this marker is an unfilled template.
pub const PLACEHOLDER_MARKER: char = '<';

pub const NOT_CONFIGURED_MESSAGE: &str =
    "Realtime Database not configured. Set DATABASE_URL and service account.";

/// Limit applied to JSON request bodies (same as the usual 100kb body parser default).
pub const JSON_BODY_LIMIT: usize = 100 * 1024;

pub const FIREBASE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/firebase.database",
    "https://www.googleapis.com/auth/userinfo.email",
];

pub static GOOGLE_TOKEN_URI: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://oauth2.googleapis.com/token").expect("invalid google token url")
});

pub static METADATA_TOKEN_URI: LazyLock<Url> = LazyLock::new(|| {
    Url::parse(
        "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token",
    )
    .expect("invalid metadata token url")
});

/// Environment variables understood by the gateway.
const ENV_KEYS: &[&str] = &[
    "PORT",
    "DATABASE_URL",
    "GOOGLE_APPLICATION_CREDENTIALS",
    "FIREBASE_DATABASE_EMULATOR_HOST",
    "BASE_DIR",
    "LOGLEVEL",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub google_application_credentials: Option<PathBuf>,
    pub firebase_database_emulator_host: Option<String>,
    /// Static root, also where the default credential file is looked up.
    pub base_dir: PathBuf,
    pub loglevel: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: None,
            google_application_credentials: None,
            firebase_database_emulator_host: None,
            base_dir: PathBuf::from("."),
            loglevel: "info".to_string(),
        }
    }
}

impl Config {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default())).merge(Env::raw().only(ENV_KEYS))
    }

    /// Where to look for the credential bundle: explicit override first.
    pub fn credential_path(&self) -> PathBuf {
        self.google_application_credentials
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| self.base_dir.join(DEFAULT_CREDENTIAL_FILE))
    }

    /// `true` when the caller asked for application-default credentials.
    pub fn wants_application_default(&self) -> bool {
        self.google_application_credentials
            .as_ref()
            .is_some_and(|p| !p.as_os_str().is_empty())
    }

    pub fn emulator_host(&self) -> Option<&str> {
        self.firebase_database_emulator_host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_path_defaults_to_base_dir() {
        let cfg = Config {
            base_dir: PathBuf::from("/srv/app"),
            ..Config::default()
        };
        assert_eq!(
            cfg.credential_path(),
            PathBuf::from("/srv/app/serviceAccountKey.json")
        );
        assert!(!cfg.wants_application_default());
    }

    #[test]
    fn credential_path_prefers_override() {
        let cfg = Config {
            google_application_credentials: Some(PathBuf::from("/etc/keys/sa.json")),
            ..Config::default()
        };
        assert_eq!(cfg.credential_path(), PathBuf::from("/etc/keys/sa.json"));
        assert!(cfg.wants_application_default());
    }

    #[test]
    fn figment_reads_raw_env_keys() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("PORT", "9191");
            jail.set_env("DATABASE_URL", "https://lamp-demo.firebaseio.com");
            let cfg: Config = Config::figment().extract()?;
            assert_eq!(cfg.port, 9191);
            assert_eq!(
                cfg.database_url.as_deref(),
                Some("https://lamp-demo.firebaseio.com")
            );
            assert_eq!(cfg.loglevel, "info");
            Ok(())
        });
    }
}
