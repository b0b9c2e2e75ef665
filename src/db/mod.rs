//! Database module: the realtime key-value store the gateway fronts.
//!
//! Layout:
//! - `firebase.rs`: REST client for a Firebase Realtime Database instance

pub mod firebase;

pub use firebase::{DatabaseAuth, RealtimeDatabase};

use crate::error::GatewayError;
use crate::types::DeviceValue;
use async_trait::async_trait;

/// Hierarchical key-value store addressed by `/`-separated paths.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Value stored at `path`; `null` when nothing is there. `""` or `/` is the root.
    async fn get(&self, path: &str) -> Result<DeviceValue, GatewayError>;

    /// Replace whatever is stored at `path` with `value`.
    async fn set(&self, path: &str, value: &DeviceValue) -> Result<(), GatewayError>;
}
