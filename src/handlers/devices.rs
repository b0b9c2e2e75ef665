use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;
use tracing::debug;

use crate::db::RealtimeStore;
use crate::middleware::DeviceWrite;
use crate::router::GatewayState;
use crate::types::envelope::ApiSuccess;
use crate::{GatewayError, types::DeviceValue};

fn require_store(state: &GatewayState) -> Result<&Arc<dyn RealtimeStore>, GatewayError> {
    state.store.as_ref().ok_or(GatewayError::NotConfigured)
}

/// GET /api/devices -> everything under the database root.
pub async fn list_devices(
    State(state): State<GatewayState>,
) -> Result<Json<ApiSuccess>, GatewayError> {
    let store = require_store(&state)?;
    let data = store.get("/").await?;
    Ok(Json(ApiSuccess::new(data)))
}

/// GET /api/device/{id} -> value at `id`, `null` when unset.
pub async fn get_device(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<ApiSuccess>, GatewayError> {
    let store = require_store(&state)?;
    let data = store.get(&id).await?;
    Ok(Json(ApiSuccess::new(data)))
}

/// POST /api/device/{id} -> write `value`, then answer with what the database reads back.
///
/// The read-back is a separate request; a concurrent writer may land in between.
pub async fn set_device(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    DeviceWrite(value): DeviceWrite,
) -> Result<Json<ApiSuccess>, GatewayError> {
    let store = require_store(&state)?;
    store.set(&id, &value).await?;
    debug!(device = %id, "device value written");
    let data: DeviceValue = store.get(&id).await?;
    Ok(Json(ApiSuccess::new(data)))
}
