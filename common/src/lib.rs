//! Shared models for fleetrun: run configuration, credentials, host lists
//! and the session error taxonomy.

pub mod config;
pub mod credentials;
pub mod error;
pub mod hosts;
