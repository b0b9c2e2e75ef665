pub mod envelope;

/// Payload stored at a path in the realtime database. Opaque to the gateway.
pub type DeviceValue = serde_json::Value;
