//! Stack orchestration options

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Options for deploying a stack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeployOptions {
    /// Bundle file to deploy (mutually exclusive with `composefile`)
    pub bundlefile: Option<PathBuf>,
    /// Compose file to deploy
    pub composefile: Option<PathBuf>,
    pub namespace: String,
    /// Forward registry credentials to the engine
    pub send_registry_auth: bool,
}

/// Options for removing a stack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoveOptions {
    pub namespace: String,
}

/// Options for listing the tasks of a stack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PsOptions {
    pub namespace: String,
    /// `key=value` filters, keys `name` and `service`
    pub filter: Vec<String>,
    /// Print full task ids
    pub no_trunc: bool,
    /// Print task ids only
    pub quiet: bool,
}

impl PsOptions {
    /// Unfiltered listing of one stack
    pub fn for_namespace(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            ..Default::default()
        }
    }
}
