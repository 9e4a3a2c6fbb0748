//! In-process container engine
//!
//! Keeps containers and stack resources in memory. Containers run to
//! completion as soon as they are started and exit with status 0.

use super::types::ContainerRunSpec;
use super::{
    ContainerEngine, RemoveOptions, RunOptions, StackResource, StackResources, Task, TaskFilter,
    TaskState,
};
use crate::compose::ServiceDefinition;
use crate::error::{Result, RunebookError};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Container status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Created,
    Running,
    Exited,
}

impl std::fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerStatus::Created => write!(f, "created"),
            ContainerStatus::Running => write!(f, "running"),
            ContainerStatus::Exited => write!(f, "exited"),
        }
    }
}

/// A container known to the local engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalContainer {
    pub id: String,
    pub name: String,
    pub spec: ContainerRunSpec,
    pub status: ContainerStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i32>,
}

impl LocalContainer {
    fn new(name: &str, spec: ContainerRunSpec) -> Self {
        Self {
            id: short_id(),
            name: name.to_string(),
            spec,
            status: ContainerStatus::Created,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            exit_code: None,
        }
    }

    fn run_to_completion(&mut self) {
        self.status = ContainerStatus::Running;
        self.started_at = Some(Utc::now());

        self.status = ContainerStatus::Exited;
        self.finished_at = Some(Utc::now());
        self.exit_code = Some(0);
    }
}

#[derive(Debug, Clone)]
struct LocalService {
    namespace: String,
    name: String,
    image: String,
    replicas: u32,
}

#[derive(Debug, Clone)]
struct NamespacedResource {
    namespace: String,
    name: String,
}

/// In-memory engine
#[derive(Debug, Default, Clone)]
pub struct LocalEngine {
    containers: Arc<RwLock<IndexMap<String, LocalContainer>>>,
    services: Arc<RwLock<IndexMap<String, LocalService>>>,
    networks: Arc<RwLock<IndexMap<String, NamespacedResource>>>,
    secrets: Arc<RwLock<IndexMap<String, NamespacedResource>>>,
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

fn read_lock() -> RunebookError {
    RunebookError::Lock("Failed to acquire read lock".to_string())
}

fn write_lock() -> RunebookError {
    RunebookError::Lock("Failed to acquire write lock".to_string())
}

impl LocalEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all containers
    pub fn containers(&self) -> Result<Vec<LocalContainer>> {
        let containers = self.containers.read().map_err(|_| read_lock())?;
        Ok(containers.values().cloned().collect())
    }

    /// Create a secret in a stack, returning its id
    pub fn create_secret(&self, namespace: &str, name: &str) -> Result<String> {
        let mut secrets = self.secrets.write().map_err(|_| write_lock())?;
        let id = short_id();
        secrets.insert(
            id.clone(),
            NamespacedResource {
                namespace: namespace.to_string(),
                name: format!("{}_{}", namespace, name),
            },
        );
        Ok(id)
    }

    fn stack_entries(map: &IndexMap<String, NamespacedResource>, namespace: &str) -> Vec<StackResource> {
        map.iter()
            .filter(|(_, r)| r.namespace == namespace)
            .map(|(id, r)| StackResource {
                id: id.clone(),
                name: r.name.clone(),
            })
            .collect()
    }
}

impl ContainerEngine for LocalEngine {
    fn run(&self, opts: &RunOptions, spec: &ContainerRunSpec) -> Result<String> {
        let mut containers = self.containers.write().map_err(|_| write_lock())?;

        if !opts.name.is_empty() && containers.values().any(|c| c.name == opts.name) {
            return Err(RunebookError::Engine(format!(
                "container name \"{}\" is already in use",
                opts.name
            )));
        }

        let mut container = LocalContainer::new(&opts.name, spec.clone());
        let id = container.id.clone();
        tracing::info!(
            "Simulating container {} ({}) from image {}, nothing is executed",
            opts.name,
            id,
            spec.config.image
        );

        container.run_to_completion();
        containers.insert(id.clone(), container);
        Ok(id)
    }

    fn remove(&self, container: &str, opts: RemoveOptions) -> Result<()> {
        let mut containers = self.containers.write().map_err(|_| write_lock())?;

        let id = containers
            .iter()
            .find(|(id, c)| id.as_str() == container || c.name == container)
            .map(|(id, _)| id.clone())
            .ok_or_else(|| RunebookError::Engine(format!("no such container: {}", container)))?;

        if let Some(c) = containers.get(&id) {
            if c.status == ContainerStatus::Running && !opts.force {
                return Err(RunebookError::Engine(format!(
                    "container {} is running, stop it first or force removal",
                    container
                )));
            }
        }

        containers.shift_remove(&id);
        tracing::debug!(
            "Removed container {} (volumes: {}, links: {})",
            id,
            opts.remove_volumes,
            opts.remove_links
        );
        Ok(())
    }

    fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let services = self.services.read().map_err(|_| read_lock())?;

        let tasks = services
            .iter()
            .flat_map(|(id, service)| {
                (1..=service.replicas).map(move |slot| Task {
                    id: format!("{}.{}", id, slot),
                    name: format!("{}.{}", service.name, slot),
                    service: service.name.clone(),
                    namespace: service.namespace.clone(),
                    image: service.image.clone(),
                    state: TaskState::Running,
                })
            })
            .filter(|task| filter.matches(task))
            .collect();

        Ok(tasks)
    }

    fn stack_resources(&self, namespace: &str) -> Result<StackResources> {
        let services = self.services.read().map_err(|_| read_lock())?;
        let networks = self.networks.read().map_err(|_| read_lock())?;
        let secrets = self.secrets.read().map_err(|_| read_lock())?;

        Ok(StackResources {
            services: services
                .iter()
                .filter(|(_, s)| s.namespace == namespace)
                .map(|(id, s)| StackResource {
                    id: id.clone(),
                    name: s.name.clone(),
                })
                .collect(),
            networks: Self::stack_entries(&networks, namespace),
            secrets: Self::stack_entries(&secrets, namespace),
        })
    }

    fn create_network(&self, namespace: &str, name: &str) -> Result<String> {
        let mut networks = self.networks.write().map_err(|_| write_lock())?;

        if let Some((id, _)) = networks.iter().find(|(_, n)| n.name == name) {
            return Ok(id.clone());
        }

        let id = short_id();
        networks.insert(
            id.clone(),
            NamespacedResource {
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
        );
        Ok(id)
    }

    fn deploy_service(&self, namespace: &str, service: &ServiceDefinition) -> Result<String> {
        let mut services = self.services.write().map_err(|_| write_lock())?;

        let name = format!("{}_{}", namespace, service.name);
        let replicas = service
            .deploy
            .as_ref()
            .and_then(|d| d.replicas)
            .unwrap_or(1);
        let entry = LocalService {
            namespace: namespace.to_string(),
            name: name.clone(),
            image: service.image.clone(),
            replicas,
        };

        if let Some((id, existing)) = services.iter_mut().find(|(_, s)| s.name == name) {
            *existing = entry;
            return Ok(id.clone());
        }

        let id = short_id();
        services.insert(id.clone(), entry);
        Ok(id)
    }

    fn remove_service(&self, id: &str) -> Result<()> {
        let mut services = self.services.write().map_err(|_| write_lock())?;
        services
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| RunebookError::Engine(format!("no such service: {}", id)))
    }

    fn remove_network(&self, id: &str) -> Result<()> {
        let mut networks = self.networks.write().map_err(|_| write_lock())?;
        networks
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| RunebookError::Engine(format!("no such network: {}", id)))
    }

    fn remove_secret(&self, id: &str) -> Result<()> {
        let mut secrets = self.secrets.write().map_err(|_| write_lock())?;
        secrets
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| RunebookError::Engine(format!("no such secret: {}", id)))
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(engine: &LocalEngine, name: &str) -> Result<String> {
        let mut spec = ContainerRunSpec::default();
        spec.config.image = "alpine".to_string();
        engine.run(&RunOptions { name: name.to_string() }, &spec)
    }

    #[test]
    fn test_run_and_remove() {
        let engine = LocalEngine::new();
        let id = run(&engine, "hello").unwrap();
        assert_eq!(id.len(), 12);

        let containers = engine.containers().unwrap();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].status, ContainerStatus::Exited);
        assert_eq!(containers[0].exit_code, Some(0));

        engine.remove("hello", RemoveOptions::default()).unwrap();
        assert!(engine.containers().unwrap().is_empty());
        assert!(engine.remove(&id, RemoveOptions::default()).is_err());
    }

    #[test]
    fn test_local_engine_is_simulated() {
        let engine = LocalEngine::new();
        assert!(engine.is_simulated());

        let shared: Arc<dyn ContainerEngine> = Arc::new(engine);
        assert!(shared.is_simulated());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let engine = LocalEngine::new();
        run(&engine, "hello").unwrap();
        assert!(matches!(run(&engine, "hello"), Err(RunebookError::Engine(_))));
    }

    #[test]
    fn test_stack_resources() {
        let engine = LocalEngine::new();
        let mut web = ServiceDefinition::new("web", "nginx");
        web.deploy = Some(crate::compose::config::DeployConfig {
            replicas: Some(2),
            ..Default::default()
        });

        engine.deploy_service("shop", &web).unwrap();
        engine.deploy_service("other", &ServiceDefinition::new("db", "postgres")).unwrap();
        engine.create_network("shop", "shop_default").unwrap();
        engine.create_secret("shop", "token").unwrap();

        let resources = engine.stack_resources("shop").unwrap();
        assert_eq!(resources.services.len(), 1);
        assert_eq!(resources.services[0].name, "shop_web");
        assert_eq!(resources.networks[0].name, "shop_default");
        assert_eq!(resources.secrets[0].name, "shop_token");

        let tasks = engine
            .list_tasks(&TaskFilter {
                namespace: Some("shop".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].name, "shop_web.2");

        engine.remove_service(&resources.services[0].id).unwrap();
        assert!(engine.remove_service(&resources.services[0].id).is_err());
        assert!(engine.stack_resources("shop").unwrap().services.is_empty());
    }
}
