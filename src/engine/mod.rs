//! Container engine boundary
//!
//! The [`ContainerEngine`] trait is everything the rest of the crate needs
//! from a container engine client. [`LocalEngine`] is an in-process
//! implementation; [`convert`] turns compose services into run specs.

pub mod convert;
pub mod local;
pub mod types;

pub use convert::service_to_container;
pub use local::LocalEngine;
pub use types::{ContainerConfig, ContainerRunSpec, HealthConfig, HostConfig, Mount, MountType, NetworkingConfig};

use crate::compose::ServiceDefinition;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Options for a single container run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    /// Container name
    pub name: String,
}

/// Options for removing a container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    pub remove_volumes: bool,
    pub remove_links: bool,
    pub force: bool,
}

/// Task state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Running,
    Complete,
    Failed,
    Shutdown,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Pending => write!(f, "pending"),
            TaskState::Running => write!(f, "running"),
            TaskState::Complete => write!(f, "complete"),
            TaskState::Failed => write!(f, "failed"),
            TaskState::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// A scheduled unit of a stack service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    /// `<service>.<slot>`
    pub name: String,
    pub service: String,
    pub namespace: String,
    pub image: String,
    pub state: TaskState,
}

/// Task list filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    /// Only tasks of this stack
    pub namespace: Option<String>,
    /// Only tasks of this service
    pub service: Option<String>,
    /// Only tasks whose name contains this
    pub name: Option<String>,
}

impl TaskFilter {
    /// Does a task pass this filter
    pub fn matches(&self, task: &Task) -> bool {
        self.namespace.as_ref().map_or(true, |ns| &task.namespace == ns)
            && self.service.as_ref().map_or(true, |s| &task.service == s)
            && self.name.as_ref().map_or(true, |n| task.name.contains(n.as_str()))
    }
}

/// A named resource belonging to a stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackResource {
    pub id: String,
    pub name: String,
}

/// Services, networks and secrets labelled with one stack namespace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackResources {
    pub services: Vec<StackResource>,
    pub networks: Vec<StackResource>,
    pub secrets: Vec<StackResource>,
}

impl StackResources {
    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.networks.is_empty() && self.secrets.is_empty()
    }
}

/// Container engine client
pub trait ContainerEngine: Send + Sync {
    /// Create and start a container, returning its id
    fn run(&self, opts: &RunOptions, spec: &ContainerRunSpec) -> Result<String>;

    /// Remove a container by id or name
    fn remove(&self, container: &str, opts: RemoveOptions) -> Result<()>;

    fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>>;

    fn stack_resources(&self, namespace: &str) -> Result<StackResources>;

    /// Create a network in a stack, returning its id
    fn create_network(&self, namespace: &str, name: &str) -> Result<String>;

    /// Create or update a stack service, returning its id
    fn deploy_service(&self, namespace: &str, service: &ServiceDefinition) -> Result<String>;

    fn remove_service(&self, id: &str) -> Result<()>;

    fn remove_network(&self, id: &str) -> Result<()>;

    fn remove_secret(&self, id: &str) -> Result<()>;

    /// True when containers are only simulated and nothing really runs
    fn is_simulated(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(namespace: &str, service: &str, name: &str) -> Task {
        Task {
            id: "t1".to_string(),
            name: name.to_string(),
            service: service.to_string(),
            namespace: namespace.to_string(),
            image: "alpine".to_string(),
            state: TaskState::Running,
        }
    }

    #[test]
    fn test_task_filter() {
        let t = task("shop", "shop_web", "shop_web.1");
        assert!(TaskFilter::default().matches(&t));

        let filter = TaskFilter {
            namespace: Some("shop".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&t));
        assert!(!filter.matches(&task("other", "other_web", "other_web.1")));

        let filter = TaskFilter {
            name: Some("web".to_string()),
            service: Some("shop_db".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&t));
    }
}
