//! Stack configuration
//!
//! Deploy, remove and ps options for the project stack. The `stack` key
//! holds a document with a `Deploy` block; the first scope that decodes
//! wins outright, scopes are not merged.

use super::source::{ConfigSource, ScopedSource};
use crate::error::{Result, RunebookError};
use crate::stack::{DeployOptions, PsOptions, RemoveOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Configuration key holding the stack document
pub const STACK_CONFIG_KEY: &str = "stack";

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "default";

/// Compose file name used when none is configured
pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";

/// Provider of stack orchestration options
pub trait StackConfig: Send + Sync {
    fn deploy_options(&self) -> Result<DeployOptions>;
    fn remove_options(&self) -> Result<RemoveOptions>;
    fn ps_options(&self) -> Result<PsOptions>;
}

/// Stack configuration derived only from the project root
#[derive(Debug, Clone)]
pub struct DefaultStackConfig {
    project_root: PathBuf,
}

impl DefaultStackConfig {
    pub fn new(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
        }
    }
}

impl StackConfig for DefaultStackConfig {
    fn deploy_options(&self) -> Result<DeployOptions> {
        Ok(DeployOptions {
            bundlefile: None,
            composefile: Some(self.project_root.join(DEFAULT_COMPOSE_FILE)),
            namespace: DEFAULT_NAMESPACE.to_string(),
            send_registry_auth: false,
        })
    }

    fn remove_options(&self) -> Result<RemoveOptions> {
        Ok(RemoveOptions {
            namespace: DEFAULT_NAMESPACE.to_string(),
        })
    }

    fn ps_options(&self) -> Result<PsOptions> {
        Ok(PsOptions::for_namespace(DEFAULT_NAMESPACE))
    }
}

#[derive(Debug, Default, Deserialize)]
struct StackDocument {
    #[serde(rename = "Deploy", default)]
    deploy: Option<DeployBlock>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DeployBlock {
    #[serde(rename = "Bundlefile", default)]
    bundlefile: Option<String>,
    #[serde(rename = "Composefile", default)]
    composefile: Option<String>,
    #[serde(rename = "Namespace", default)]
    namespace: Option<String>,
    #[serde(rename = "SendRegistryAuth", default)]
    send_registry_auth: bool,
}

/// Stack configuration read from the `stack` key of a [`ConfigSource`]
pub struct YamlStackConfig {
    source: Arc<dyn ConfigSource>,
    defaults: DefaultStackConfig,
    deploy: RwLock<Option<DeployBlock>>,
}

impl YamlStackConfig {
    /// Create and load the configuration
    pub fn new(source: Arc<dyn ConfigSource>, project_root: &Path) -> Result<Self> {
        let config = Self {
            source,
            defaults: DefaultStackConfig::new(project_root),
            deploy: RwLock::new(None),
        };
        config.load()?;
        Ok(config)
    }

    /// Re-read the configuration from the source
    pub fn load(&self) -> Result<()> {
        let scoped = self.source.get(STACK_CONFIG_KEY)?;
        let mut deploy = None;

        for scope in scoped.scopes_in_order() {
            let bytes = scoped.bytes_for(&scope).unwrap_or_default();
            match decode(bytes) {
                Ok(document) => {
                    tracing::debug!("Using stack configuration from scope {}", scope);
                    deploy = document.deploy;
                    break;
                }
                Err(e) => {
                    tracing::error!("Couldn't decode stack configuration in scope {}: {}", scope, e);
                }
            }
        }

        let mut guard = self
            .deploy
            .write()
            .map_err(|_| RunebookError::Lock("Failed to acquire write lock".to_string()))?;
        *guard = deploy;
        Ok(())
    }

    /// Persisting stack configuration is not supported
    pub fn save(&self) -> Result<()> {
        Err(RunebookError::Unsupported(
            "saving stack configuration is not implemented".to_string(),
        ))
    }

    fn block(&self) -> Result<Option<DeployBlock>> {
        let guard = self
            .deploy
            .read()
            .map_err(|_| RunebookError::Lock("Failed to acquire read lock".to_string()))?;
        Ok(guard.clone())
    }

    fn namespace(block: &DeployBlock) -> String {
        block
            .namespace
            .clone()
            .filter(|ns| !ns.is_empty())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
    }

    fn resolve(&self, file: &Option<String>) -> Option<PathBuf> {
        file.as_ref()
            .filter(|f| !f.is_empty())
            .map(|f| self.defaults.project_root.join(f))
    }
}

fn decode(bytes: &[u8]) -> std::result::Result<StackDocument, serde_yaml::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(StackDocument::default());
    }
    serde_yaml::from_slice(bytes)
}

impl StackConfig for YamlStackConfig {
    fn deploy_options(&self) -> Result<DeployOptions> {
        match self.block()? {
            Some(block) => Ok(DeployOptions {
                bundlefile: self.resolve(&block.bundlefile),
                composefile: self.resolve(&block.composefile),
                namespace: Self::namespace(&block),
                send_registry_auth: block.send_registry_auth,
            }),
            None => self.defaults.deploy_options(),
        }
    }

    fn remove_options(&self) -> Result<RemoveOptions> {
        match self.block()? {
            Some(block) => Ok(RemoveOptions {
                namespace: Self::namespace(&block),
            }),
            None => self.defaults.remove_options(),
        }
    }

    fn ps_options(&self) -> Result<PsOptions> {
        match self.block()? {
            Some(block) => Ok(PsOptions::for_namespace(&Self::namespace(&block))),
            None => self.defaults.ps_options(),
        }
    }
}
