pub mod config;
pub mod db;
pub mod error;
pub mod google_oauth;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;
pub mod types;

pub use error::GatewayError;
pub use db::RealtimeStore;
pub use router::{GatewayState, gateway_router};
