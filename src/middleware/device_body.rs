use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{StatusCode, header::CONTENT_TYPE},
};
use serde_json::Value;

use crate::error::GatewayError;
use crate::types::DeviceValue;

/// The `value` field of a device write body.
///
/// Only JSON bodies are read; anything else counts as an empty object without
/// being buffered. A
/// `null` value counts as present.
#[derive(Debug)]
pub struct DeviceWrite(pub DeviceValue);

impl<S> FromRequest<S> for DeviceWrite
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));

        if !is_json {
            return Err(GatewayError::MissingValue);
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| GatewayError::InvalidBody {
                status: rejection.status(),
                message: rejection.body_text(),
            })?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(GatewayError::MissingValue);
        }

        let body: Value =
            serde_json::from_slice(&bytes).map_err(|e| GatewayError::InvalidBody {
                status: StatusCode::BAD_REQUEST,
                message: e.to_string(),
            })?;

        body.get("value")
            .cloned()
            .map(DeviceWrite)
            .ok_or(GatewayError::MissingValue)
    }
}
