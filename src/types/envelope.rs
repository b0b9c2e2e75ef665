use serde::Serialize;

use super::DeviceValue;

/// `{ "ok": true, "data": ... }`
#[derive(Debug, Serialize)]
pub struct ApiSuccess {
    pub ok: bool,
    pub data: DeviceValue,
}

impl ApiSuccess {
    pub fn new(data: DeviceValue) -> Self {
        Self { ok: true, data }
    }
}

/// `{ "ok": false, "error": "..." }`
#[derive(Debug, Serialize)]
pub struct ApiFailure {
    pub ok: bool,
    pub error: String,
}

impl ApiFailure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub ok: bool,
    /// Milliseconds since the unix epoch.
    pub timestamp: i64,
}
