//! Container engine creation types
//!
//! Field names serialize the way the engine API spells them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Everything needed to create one container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerRunSpec {
    pub config: ContainerConfig,
    pub host_config: HostConfig,
    pub networking_config: NetworkingConfig,
}

/// Portable container configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerConfig {
    pub hostname: String,
    pub domainname: String,
    pub user: String,
    pub attach_stdin: bool,
    pub attach_stdout: bool,
    pub attach_stderr: bool,
    /// Exposed ports, `port/proto`
    pub exposed_ports: Vec<String>,
    pub tty: bool,
    pub open_stdin: bool,
    pub stdin_once: bool,
    /// `KEY=VALUE` entries
    pub env: Vec<String>,
    pub cmd: Vec<String>,
    pub healthcheck: Option<HealthConfig>,
    pub image: String,
    pub working_dir: String,
    pub entrypoint: Vec<String>,
    pub mac_address: String,
    pub labels: IndexMap<String, String>,
    pub stop_signal: String,
    /// Seconds to wait after the stop signal
    pub stop_timeout: Option<u64>,
}

/// Healthcheck as the engine understands it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthConfig {
    /// `["NONE"]` disables any image healthcheck
    pub test: Vec<String>,
    pub interval: Option<u64>,
    pub timeout: Option<u64>,
    pub retries: Option<u32>,
}

impl HealthConfig {
    /// Explicit "no healthcheck"
    pub fn none() -> Self {
        Self {
            test: vec!["NONE".to_string()],
            ..Default::default()
        }
    }
}

/// Host dependent configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostConfig {
    /// Legacy `source:target[:mode]` bind strings
    pub binds: Vec<String>,
    pub network_mode: String,
    pub port_bindings: IndexMap<String, Vec<PortBinding>>,
    pub auto_remove: bool,
    pub cap_add: Vec<String>,
    pub cap_drop: Vec<String>,
    pub dns: Vec<String>,
    pub dns_search: Vec<String>,
    /// `host:ip` entries
    pub extra_hosts: Vec<String>,
    pub ipc_mode: String,
    pub cgroup_parent: String,
    pub links: Vec<String>,
    pub pid_mode: String,
    pub privileged: bool,
    pub readonly_rootfs: bool,
    pub security_opt: Vec<String>,
    pub tmpfs: IndexMap<String, String>,
    pub sysctls: IndexMap<String, String>,
    pub init: Option<bool>,
    pub resources: Resources,
    pub mounts: Vec<Mount>,
}

/// Published port binding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortBinding {
    pub host_ip: String,
    pub host_port: String,
}

/// Resource limits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resources {
    pub memory: i64,
    pub nano_cpus: i64,
    pub ulimits: Vec<Ulimit>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ulimit {
    pub name: String,
    pub soft: i64,
    pub hard: i64,
}

/// Structured mount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Mount {
    #[serde(rename = "Type")]
    pub kind: MountType,
    /// Host path or volume name, empty for anonymous volumes
    pub source: String,
    pub target: String,
    pub read_only: bool,
    pub bind_options: Option<BindOptions>,
    pub volume_options: Option<VolumeOptions>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountType {
    Bind,
    Volume,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BindOptions {
    /// One of `private`, `rprivate`, `shared`, `rshared`, `slave`, `rslave`
    pub propagation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeOptions {
    pub no_copy: bool,
}

/// Networks to attach at creation time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkingConfig {
    pub endpoints_config: IndexMap<String, EndpointSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointSettings {
    pub aliases: Vec<String>,
}
