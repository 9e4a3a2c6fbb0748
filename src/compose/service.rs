//! Normalized service definitions
//!
//! A [`ServiceDefinition`] is what the loader hands back after
//! interpolation, defaulting and type normalization: every list/mapping
//! union has been collapsed to one shape and durations are parsed.

use super::config::{DeployConfig, LoggingConfig, ServiceNetworkConfig, UlimitConfig};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fully resolved service definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    /// Service name (the command id for synthesized services)
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub entrypoint: Vec<String>,
    pub container_name: Option<String>,
    pub cap_add: Vec<String>,
    pub cap_drop: Vec<String>,
    pub cgroup_parent: Option<String>,
    pub depends_on: Vec<String>,
    pub deploy: Option<DeployConfig>,
    pub devices: Vec<String>,
    pub dns: Vec<String>,
    pub dns_search: Vec<String>,
    pub domainname: Option<String>,
    /// Environment, env files first then explicit entries
    pub environment: IndexMap<String, String>,
    pub expose: Vec<String>,
    pub external_links: Vec<String>,
    /// Host name to address
    pub extra_hosts: IndexMap<String, String>,
    pub hostname: Option<String>,
    pub healthcheck: Option<HealthCheck>,
    pub init: Option<bool>,
    pub ipc: Option<String>,
    pub labels: IndexMap<String, String>,
    pub links: Vec<String>,
    pub logging: Option<LoggingConfig>,
    pub mac_address: Option<String>,
    pub network_mode: Option<String>,
    pub networks: IndexMap<String, Option<ServiceNetworkConfig>>,
    pub pid: Option<String>,
    pub ports: Vec<ServicePort>,
    pub privileged: bool,
    pub read_only: bool,
    pub restart: Option<String>,
    pub security_opt: Vec<String>,
    pub stdin_open: bool,
    pub stop_grace_period: Option<Duration>,
    pub stop_signal: Option<String>,
    pub sysctls: IndexMap<String, String>,
    pub tmpfs: Vec<String>,
    pub tty: bool,
    pub ulimits: IndexMap<String, UlimitConfig>,
    pub user: Option<String>,
    /// Volume specifiers, `source:destination[:mode]` or `destination`
    pub volumes: Vec<String>,
    pub working_dir: Option<String>,
}

/// Normalized healthcheck
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Test, e.g. `["CMD-SHELL", "curl -f localhost"]`
    pub test: Vec<String>,
    pub interval: Option<Duration>,
    pub timeout: Option<Duration>,
    pub retries: Option<u32>,
    pub disable: bool,
}

/// A single published or exposed port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePort {
    pub target: u16,
    pub published: Option<u16>,
    pub protocol: String,
    pub mode: String,
    pub host_ip: Option<String>,
}

impl ServiceDefinition {
    /// Minimal definition for an image
    pub fn new(name: &str, image: &str) -> Self {
        Self {
            name: name.to_string(),
            image: image.to_string(),
            ..Default::default()
        }
    }
}
