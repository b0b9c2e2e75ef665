use axum::{Json, http::StatusCode, response::IntoResponse};
use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use thiserror::Error as ThisError;

use crate::config::NOT_CONFIGURED_MESSAGE;
use crate::types::envelope::ApiFailure;

#[derive(Debug, ThisError)]
pub enum GatewayError {
    #[error("{}", NOT_CONFIGURED_MESSAGE)]
    NotConfigured,

    #[error("Missing \"value\" in body")]
    MissingValue,

    #[error("{message}")]
    InvalidBody { status: StatusCode, message: String },

    /// Failure reported by the realtime database, surfaced as-is.
    #[error("{0}")]
    Backend(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JWT signing error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("OAuth2 token request error: {0}")]
    Oauth2Token(String),

    #[error("OAuth2 server error: {error}")]
    Oauth2Server { error: String },

    #[error("Token endpoint returned {status}: {body}")]
    TokenEndpoint { status: StatusCode, body: String },

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),
}

/// Whether an error is worth another attempt (network blips and 5xx only).
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for GatewayError {
    fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Reqwest(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            GatewayError::Oauth2Token(_) => true,
            GatewayError::TokenEndpoint { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::MissingValue => StatusCode::BAD_REQUEST,
            GatewayError::InvalidBody { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl
    From<
        RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    > for GatewayError
{
    fn from(
        e: RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    ) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => GatewayError::Oauth2Server {
                error: err.error().to_string(),
            },
            RequestTokenError::Request(req_e) => {
                GatewayError::Oauth2Token(format!("request failed: {}", req_e))
            }
            RequestTokenError::Parse(parse_err, _body) => {
                GatewayError::Json(parse_err.into_inner())
            }
            RequestTokenError::Other(s) => GatewayError::Oauth2Token(s),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        (status, Json(ApiFailure::new(self.to_string()))).into_response()
    }
}
