//! Compose service model
//!
//! A version 3 compose loader: raw document types, variable
//! interpolation, and normalization into [`ServiceDefinition`]s.

pub mod config;
pub mod interpolate;
pub mod loader;
pub mod service;

pub use config::{ComposeFile, ServiceConfig};
pub use loader::{load, parse_yaml, Config, ConfigDetails, ConfigFile};
pub use service::{HealthCheck, ServiceDefinition, ServicePort};
