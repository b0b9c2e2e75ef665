use axum::Json;
use chrono::Utc;

use crate::types::envelope::HealthStatus;

/// GET /health
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        ok: true,
        timestamp: Utc::now().timestamp_millis(),
    })
}
