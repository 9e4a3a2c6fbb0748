//! Scoped configuration sources
//!
//! A configuration key (for example `commands`) resolves to one raw byte
//! blob per scope. Scopes are ordered by priority, highest first.

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Configuration file extensions tried for every key, in order
const EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// Provider of per-scope raw configuration bytes
pub trait ScopedSource {
    /// Scope names in priority order
    fn scopes_in_order(&self) -> Vec<String>;

    /// Raw bytes for a scope, if that scope contributes anything
    fn bytes_for(&self, scope: &str) -> Option<&[u8]>;
}

/// Ordered scope name to raw bytes mapping for a single key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopedBytes {
    entries: Vec<(String, Vec<u8>)>,
}

impl ScopedBytes {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a scope at the lowest priority
    pub fn push(&mut self, scope: &str, bytes: Vec<u8>) {
        self.entries.push((scope.to_string(), bytes));
    }

    /// Builder style [`push`](Self::push)
    pub fn with(mut self, scope: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.push(scope, bytes.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ScopedSource for ScopedBytes {
    fn scopes_in_order(&self) -> Vec<String> {
        self.entries.iter().map(|(scope, _)| scope.clone()).collect()
    }

    fn bytes_for(&self, scope: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(name, _)| name == scope)
            .map(|(_, bytes)| bytes.as_slice())
    }
}

/// Source of scoped configuration, keyed by configuration name
pub trait ConfigSource: Send + Sync {
    /// All scopes' bytes for a key
    fn get(&self, key: &str) -> Result<ScopedBytes>;
}

/// Configuration source backed by one directory per scope.
///
/// Key `k` in a scope is read from `<dir>/k.yml`, falling back to
/// `<dir>/k.yaml`. A scope without either file does not contribute, and
/// neither does one whose file can't be read.
#[derive(Debug, Clone, Default)]
pub struct DirectoryConfigSource {
    scopes: Vec<(String, PathBuf)>,
}

impl DirectoryConfigSource {
    /// Create a source with no scopes
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scope at the lowest priority
    pub fn with_scope(mut self, name: &str, dir: impl Into<PathBuf>) -> Self {
        self.scopes.push((name.to_string(), dir.into()));
        self
    }

    /// Default scopes for a project: `project` then `user`
    pub fn for_project(project_root: &Path) -> Self {
        let source = Self::new().with_scope("project", project_root.join(".runebook"));
        match dirs::config_dir() {
            Some(config_dir) => source.with_scope("user", config_dir.join("runebook")),
            None => {
                tracing::warn!("No user configuration directory found, using project scope only");
                source
            }
        }
    }

    /// Scope names and directories, in priority order
    pub fn scopes(&self) -> &[(String, PathBuf)] {
        &self.scopes
    }

    fn file_for(dir: &Path, key: &str) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{}.{}", key, ext)))
            .find(|path| path.exists())
    }
}

impl ConfigSource for DirectoryConfigSource {
    fn get(&self, key: &str) -> Result<ScopedBytes> {
        let mut scoped = ScopedBytes::new();

        for (scope, dir) in &self.scopes {
            match Self::file_for(dir, key) {
                Some(path) => {
                    tracing::debug!("Reading {} configuration for scope {} from {}", key, scope, path.display());
                    match std::fs::read(&path) {
                        Ok(bytes) => scoped.push(scope, bytes),
                        Err(e) => tracing::warn!(
                            "Skipping {} configuration for scope {}: couldn't read {}: {}",
                            key,
                            scope,
                            path.display(),
                            e
                        ),
                    }
                }
                None => tracing::debug!("Scope {} has no {} configuration", scope, key),
            }
        }

        Ok(scoped)
    }
}
