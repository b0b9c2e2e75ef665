//! Google credentials and the access tokens they mint for the realtime database.

pub mod credentials;
mod endpoints;
pub mod service;

pub use endpoints::{AccessToken, ServiceAccountSigner};
