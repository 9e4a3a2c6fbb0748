//! Raw compose document types
//!
//! These mirror the compose service schema as written by users, before
//! interpolation and normalization. Unknown service keys are rejected so
//! that the loader behaves like a schema-validating compose loader.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compose file (a single version tag plus the services section)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComposeFile {
    /// Compose file version
    #[serde(default)]
    pub version: Option<Scalar>,
    /// Services
    #[serde(default)]
    pub services: IndexMap<String, ServiceConfig>,
}

/// A YAML scalar as it appears in mappings that compose stringifies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::String(s) => write!(f, "{}", s),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Image name
    #[serde(default)]
    pub image: Option<String>,
    /// Build context (recognized, not used for single-shot commands)
    #[serde(default)]
    pub build: Option<BuildConfig>,
    /// Command to run
    #[serde(default)]
    pub command: Option<CommandConfig>,
    /// Entrypoint
    #[serde(default)]
    pub entrypoint: Option<CommandConfig>,
    /// Container name
    #[serde(default)]
    pub container_name: Option<String>,
    #[serde(default)]
    pub cap_add: Option<Vec<String>>,
    #[serde(default)]
    pub cap_drop: Option<Vec<String>>,
    #[serde(default)]
    pub cgroup_parent: Option<String>,
    /// Service dependencies
    #[serde(default)]
    pub depends_on: Option<Vec<String>>,
    /// Deploy configuration
    #[serde(default)]
    pub deploy: Option<DeployConfig>,
    #[serde(default)]
    pub devices: Option<Vec<String>>,
    /// DNS servers
    #[serde(default)]
    pub dns: Option<StringOrList>,
    /// DNS search domains
    #[serde(default)]
    pub dns_search: Option<StringOrList>,
    /// Domain name
    #[serde(default)]
    pub domainname: Option<String>,
    /// Environment variables
    #[serde(default)]
    pub environment: Option<MappingOrList>,
    /// Environment files
    #[serde(default)]
    pub env_file: Option<StringOrList>,
    /// Exposed ports
    #[serde(default)]
    pub expose: Option<Vec<Scalar>>,
    #[serde(default)]
    pub external_links: Option<Vec<String>>,
    /// Extra hosts
    #[serde(default)]
    pub extra_hosts: Option<MappingOrList>,
    /// Hostname
    #[serde(default)]
    pub hostname: Option<String>,
    /// Healthcheck configuration
    #[serde(default)]
    pub healthcheck: Option<HealthcheckConfig>,
    #[serde(default)]
    pub init: Option<bool>,
    /// IPC mode
    #[serde(default)]
    pub ipc: Option<String>,
    /// Labels
    #[serde(default)]
    pub labels: Option<MappingOrList>,
    #[serde(default)]
    pub links: Option<Vec<String>>,
    /// Logging configuration
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub mac_address: Option<String>,
    /// Network mode
    #[serde(default)]
    pub network_mode: Option<String>,
    /// Networks to connect to
    #[serde(default)]
    pub networks: Option<NetworksConfig>,
    /// PID mode
    #[serde(default)]
    pub pid: Option<String>,
    /// Port mappings
    #[serde(default)]
    pub ports: Option<Vec<PortConfig>>,
    /// Privileged mode
    #[serde(default)]
    pub privileged: Option<bool>,
    /// Read only root filesystem
    #[serde(default)]
    pub read_only: Option<bool>,
    /// Restart policy
    #[serde(default)]
    pub restart: Option<String>,
    #[serde(default)]
    pub security_opt: Option<Vec<String>>,
    /// Stdin open
    #[serde(default)]
    pub stdin_open: Option<bool>,
    /// Stop grace period (Go duration syntax)
    #[serde(default)]
    pub stop_grace_period: Option<String>,
    /// Stop signal
    #[serde(default)]
    pub stop_signal: Option<String>,
    #[serde(default)]
    pub sysctls: Option<MappingOrList>,
    #[serde(default)]
    pub tmpfs: Option<StringOrList>,
    /// TTY
    #[serde(default)]
    pub tty: Option<bool>,
    /// Ulimits
    #[serde(default)]
    pub ulimits: Option<IndexMap<String, UlimitConfig>>,
    /// User
    #[serde(default)]
    pub user: Option<String>,
    /// Volume mounts, short syntax only
    #[serde(default)]
    pub volumes: Option<Vec<String>>,
    /// Working directory
    #[serde(default)]
    pub working_dir: Option<String>,
}

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildConfig {
    /// Simple context path
    Simple(String),
    /// Context plus optional Dockerfile and arguments
    Full {
        context: Option<String>,
        dockerfile: Option<String>,
        #[serde(default)]
        args: Option<MappingOrList>,
    },
}

/// Command configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandConfig {
    /// Shell command string
    Shell(String),
    /// Exec form array
    Exec(Vec<String>),
}

/// A single string or a list of strings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    Single(String),
    List(Vec<String>),
}

impl StringOrList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            StringOrList::Single(s) => vec![s],
            StringOrList::List(list) => list,
        }
    }
}

/// A mapping, or a list of `key=value` / `key:value` strings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingOrList {
    /// Array of separator-joined strings
    List(Vec<String>),
    /// Map of key to an optional scalar value
    Map(IndexMap<String, Option<Scalar>>),
}

/// Port configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortConfig {
    /// Short syntax: "8080:80"
    Short(Scalar),
    /// Long syntax
    Long(PortConfigLong),
}

/// Long port configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortConfigLong {
    /// Target port in container
    pub target: u16,
    /// Published port on host
    pub published: Option<u16>,
    /// Protocol (tcp/udp)
    pub protocol: Option<String>,
    /// Mode (host/ingress)
    pub mode: Option<String>,
}

/// Networks configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NetworksConfig {
    /// Array of network names
    Array(Vec<String>),
    /// Map of network name to config
    Map(IndexMap<String, Option<ServiceNetworkConfig>>),
}

/// Service network configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceNetworkConfig {
    /// Aliases
    #[serde(default)]
    pub aliases: Option<Vec<String>>,
    /// IPv4 address
    pub ipv4_address: Option<String>,
    /// IPv6 address
    pub ipv6_address: Option<String>,
}

/// Deploy configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Deployment mode (replicated, global)
    pub mode: Option<String>,
    /// Number of replicas
    pub replicas: Option<u32>,
    /// Resource limits and reservations
    pub resources: Option<ResourcesConfig>,
    /// Restart policy
    pub restart_policy: Option<RestartPolicyConfig>,
    /// Labels
    #[serde(default)]
    pub labels: Option<IndexMap<String, String>>,
}

/// Resources configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcesConfig {
    /// Resource limits
    pub limits: Option<ResourceSpec>,
    /// Resource reservations
    pub reservations: Option<ResourceSpec>,
}

/// Resource specification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// CPU limit/reservation
    pub cpus: Option<String>,
    /// Memory limit/reservation
    pub memory: Option<String>,
}

/// Restart policy configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestartPolicyConfig {
    /// Condition (none, on-failure, any)
    pub condition: Option<String>,
    /// Delay between retries
    pub delay: Option<String>,
    /// Maximum attempts
    pub max_attempts: Option<u32>,
    /// Window for counting retries
    pub window: Option<String>,
}

/// Healthcheck configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthcheckConfig {
    /// Test command
    pub test: Option<CommandConfig>,
    /// Interval
    pub interval: Option<String>,
    /// Timeout
    pub timeout: Option<String>,
    /// Retries
    pub retries: Option<u32>,
    /// Disable healthcheck
    pub disable: Option<bool>,
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Driver
    pub driver: Option<String>,
    /// Options
    #[serde(default)]
    pub options: Option<IndexMap<String, String>>,
}

/// Ulimit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UlimitConfig {
    /// Single value (same for soft and hard)
    Single(i64),
    /// Separate soft and hard limits
    SoftHard { soft: i64, hard: i64 },
}
