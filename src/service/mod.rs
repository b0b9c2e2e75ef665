//! Start-up wiring: find credentials, resolve the database location, build the handle.

pub mod bootstrap;
pub mod credential_loader;
pub mod resolver;
