use crate::config::GOOGLE_TOKEN_URI;
use crate::error::GatewayError;
use serde::Deserialize;
use serde_json::Value;

/// JSON credential file as found on disk, kept raw until the app is initialized.
#[derive(Debug, Clone)]
pub struct CredentialBundle {
    pub payload: Value,
    /// Non-standard `databaseURL` field some key files carry.
    pub database_url: Option<String>,
}

impl CredentialBundle {
    pub fn from_payload(payload: Value) -> Self {
        let database_url = payload
            .get("databaseURL")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            payload,
            database_url,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// Output of `gcloud auth application-default login`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default)]
    pub quota_project_id: Option<String>,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.as_str().to_string()
}

#[derive(Debug, Clone)]
pub enum GoogleCredential {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
}

impl GoogleCredential {
    /// Interpret a credential payload by its `type` field.
    pub fn from_payload(payload: &Value) -> Result<Self, GatewayError> {
        let kind = payload.get("type").and_then(Value::as_str);
        match kind {
            Some("service_account") => Ok(Self::ServiceAccount(
                ServiceAccountKey::deserialize(payload).map_err(invalid)?,
            )),
            Some("authorized_user") => Ok(Self::AuthorizedUser(
                AuthorizedUser::deserialize(payload).map_err(invalid)?,
            )),
            Some(other) => Err(GatewayError::InvalidCredential(format!(
                "unsupported credential type `{other}`"
            ))),
            None if payload.get("private_key").is_some() => Ok(Self::ServiceAccount(
                ServiceAccountKey::deserialize(payload).map_err(invalid)?,
            )),
            None => Err(GatewayError::InvalidCredential(
                "credential has no `type` and no `private_key`".to_string(),
            )),
        }
    }

    pub fn from_bundle(bundle: &CredentialBundle) -> Result<Self, GatewayError> {
        Self::from_payload(&bundle.payload)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ServiceAccount(_) => "service_account",
            Self::AuthorizedUser(_) => "authorized_user",
        }
    }
}

fn invalid(e: serde_json::Error) -> GatewayError {
    GatewayError::InvalidCredential(e.to_string())
}
