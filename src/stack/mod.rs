//! Stack orchestration
//!
//! Deploy, remove and list a namespaced stack of services against a
//! [`ContainerEngine`](crate::engine::ContainerEngine).

pub mod deploy;
pub mod options;
pub mod ps;
pub mod remove;

pub use deploy::run_deploy;
pub use options::{DeployOptions, PsOptions, RemoveOptions};
pub use ps::run_ps;
pub use remove::run_remove;
