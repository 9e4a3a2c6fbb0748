//! Command registry
//!
//! Loads the `commands` key from every configuration scope, correlates
//! each scope's `Run` bodies to its commands and merges the scopes in
//! priority order. The merged set is built lazily and cached; a reload
//! builds a fresh set and swaps it in with a single write.

use super::adapter::correlate_services;
use super::command::Command;
use super::context::ServiceContext;
use super::document::parse;
use super::set::CommandSet;
use crate::config::{ConfigSource, ScopedBytes, ScopedSource};
use crate::error::{Result, RunebookError};
use std::sync::{Arc, RwLock};

/// Configuration key holding command documents
pub const COMMANDS_CONFIG_KEY: &str = "commands";

/// Cached, scope merged command set
pub struct CommandRegistry {
    source: Arc<dyn ConfigSource>,
    context: Arc<dyn ServiceContext>,
    cache: RwLock<Option<Arc<CommandSet>>>,
}

impl CommandRegistry {
    pub fn new(source: Arc<dyn ConfigSource>, context: Arc<dyn ServiceContext>) -> Self {
        Self {
            source,
            context,
            cache: RwLock::new(None),
        }
    }

    /// The merged command set, loading it on first use
    pub fn commands(&self) -> Result<Arc<CommandSet>> {
        {
            let cache = self
                .cache
                .read()
                .map_err(|_| RunebookError::Lock("Failed to acquire read lock".to_string()))?;
            if let Some(set) = cache.as_ref() {
                return Ok(Arc::clone(set));
            }
        }
        self.load()
    }

    /// Rebuild the command set from the source, replacing the cache.
    ///
    /// A source that can't be read yields an empty set.
    pub fn load(&self) -> Result<Arc<CommandSet>> {
        let scoped = self.source.get(COMMANDS_CONFIG_KEY).unwrap_or_else(|e| {
            tracing::warn!("Couldn't read command configuration: {}", e);
            ScopedBytes::new()
        });
        let set = Arc::new(build_command_set(&scoped, self.context.as_ref()));

        let mut cache = self
            .cache
            .write()
            .map_err(|_| RunebookError::Lock("Failed to acquire write lock".to_string()))?;
        *cache = Some(Arc::clone(&set));

        tracing::debug!("Loaded {} commands", set.len());
        Ok(set)
    }

    /// Every command, in listing order
    pub fn list(&self) -> Result<Vec<Command>> {
        Ok(self.commands()?.iter().cloned().collect())
    }

    /// Commands meant for users
    pub fn list_external(&self) -> Result<Vec<Command>> {
        Ok(self
            .commands()?
            .iter()
            .filter(|command| !command.entry().internal)
            .cloned()
            .collect())
    }

    pub fn get(&self, id: &str) -> Result<Command> {
        self.commands()?
            .get(id)
            .cloned()
            .ok_or_else(|| RunebookError::CommandNotFound(id.to_string()))
    }

    /// Persisting commands is not supported
    pub fn save(&self) -> Result<()> {
        Err(RunebookError::Unsupported("saving commands is not implemented".to_string()))
    }
}

/// Parse, correlate and merge every scope of `scoped`.
///
/// A scope that fails to decode contributes nothing. A scope whose
/// services fail to load keeps its commands, without service bodies.
pub fn build_command_set(scoped: &dyn ScopedSource, context: &dyn ServiceContext) -> CommandSet {
    let sets: Vec<CommandSet> = scoped
        .scopes_in_order()
        .into_iter()
        .map(|scope| {
            let bytes = scoped.bytes_for(&scope).unwrap_or_default();
            load_scope(&scope, bytes, context)
        })
        .collect();

    CommandSet::merge_all(sets)
}

fn load_scope(scope: &str, bytes: &[u8], context: &dyn ServiceContext) -> CommandSet {
    let mut set = match parse(bytes, scope) {
        Ok(set) => set,
        Err(e) => {
            tracing::warn!("Skipping commands in scope {}: {}", scope, e);
            return CommandSet::new();
        }
    };

    if set.is_empty() {
        return set;
    }

    match correlate_services(bytes, &context.working_dir(), &context.env_map()) {
        Ok(services) => {
            for (id, mut service) in services {
                match set.get_mut(&id) {
                    Some(command) => {
                        context.alter_service(&mut service);
                        command.set_service(service, true);
                    }
                    None => tracing::debug!("Service {} has no command in scope {}", id, scope),
                }
            }
        }
        Err(e) => {
            tracing::warn!("Couldn't load command services in scope {}: {}", scope, e);
        }
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::LocalServiceContext;
    use crate::config::{DirectoryConfigSource, ProjectSettings};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    fn context() -> Arc<LocalServiceContext> {
        let settings = ProjectSettings::new("/work/app".into(), "/home/u".into(), "/work".into());
        Arc::new(LocalServiceContext::new(&settings, HashMap::new()))
    }

    const PROJECT: &str = r#"
Commands:
  build:
    Description: Build the project
    Run:
      image: rust:1
      command: cargo build
      volumes:
        - ~/.cargo:/usr/local/cargo
  test:
    Description: Project tests
    Run:
      image: rust:1
      command: cargo test
"#;

    const USER: &str = r#"
Commands:
  test:
    Description: User tests
    Run:
      image: alpine
  lint:
    Internal: true
"#;

    #[test]
    fn test_merge_scopes_in_order() {
        let scoped = ScopedBytes::new().with("project", PROJECT).with("user", USER);
        let set = build_command_set(&scoped, context().as_ref());

        assert_eq!(set.ids(), vec!["build", "test", "lint"]);
        let test = set.get("test").unwrap();
        assert_eq!(test.entry().description, "Project tests");
        assert_eq!(test.entry().scope, "project");
        assert_eq!(test.service().unwrap().image, "rust:1");
    }

    #[test]
    fn test_services_correlated_and_rewritten() {
        let scoped = ScopedBytes::new().with("project", PROJECT);
        let set = build_command_set(&scoped, context().as_ref());

        let build = set.get("build").unwrap();
        assert_eq!(build.id(), "build");
        let service = build.service().unwrap();
        assert_eq!(service.command, vec!["cargo", "build"]);
        assert_eq!(service.volumes, vec!["/home/u/.cargo:/usr/local/cargo"]);
        assert!(build.validate().is_success());
    }

    #[test]
    fn test_command_without_run_is_listed() {
        let scoped = ScopedBytes::new().with("user", USER);
        let set = build_command_set(&scoped, context().as_ref());

        let lint = set.get("lint").unwrap();
        assert!(lint.service().is_none());
        assert!(matches!(lint.validate().errors(), [RunebookError::MissingService(_)]));
    }

    #[test]
    fn test_bad_scope_is_skipped() {
        let scoped = ScopedBytes::new()
            .with("broken", "Commands: [unterminated")
            .with("user", USER);
        let set = build_command_set(&scoped, context().as_ref());
        assert_eq!(set.ids(), vec!["test", "lint"]);
    }

    #[test]
    fn test_service_load_failure_keeps_commands() {
        let yaml = r#"
Commands:
  odd:
    Run:
      image: alpine
      not_a_compose_field: true
"#;
        let scoped = ScopedBytes::new().with("project", yaml);
        let set = build_command_set(&scoped, context().as_ref());

        assert_eq!(set.ids(), vec!["odd"]);
        assert!(set.get("odd").unwrap().service().is_none());
    }

    #[test]
    fn test_overflowing_duration_keeps_command() {
        let yaml = r#"
Commands:
  slow:
    Run:
      image: alpine
      stop_grace_period: 99999999999999999999999h
"#;
        let scoped = ScopedBytes::new().with("project", yaml).with("user", USER);
        let set = build_command_set(&scoped, context().as_ref());

        assert_eq!(set.ids(), vec!["slow", "test", "lint"]);
        let slow = set.get("slow").unwrap();
        assert!(slow.service().is_none());
        assert!(matches!(slow.validate().errors(), [RunebookError::MissingService(_)]));
        assert!(set.get("test").unwrap().service().is_some());
    }

    /// Source that can never be read
    struct BrokenSource;

    impl ConfigSource for BrokenSource {
        fn get(&self, key: &str) -> Result<ScopedBytes> {
            Err(RunebookError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("{} is not readable", key),
            )))
        }
    }

    #[test]
    fn test_unreadable_source_lists_nothing() {
        let registry = CommandRegistry::new(Arc::new(BrokenSource), context());

        assert!(registry.list().unwrap().is_empty());
        assert!(registry.list_external().unwrap().is_empty());
        assert!(matches!(registry.get("build"), Err(RunebookError::CommandNotFound(_))));
    }

    #[test]
    fn test_unreadable_scope_keeps_other_scopes() {
        let project = tempdir().unwrap();
        let user = tempdir().unwrap();
        fs::create_dir(project.path().join("commands.yml")).unwrap();
        fs::write(user.path().join("commands.yml"), USER).unwrap();

        let source = DirectoryConfigSource::new()
            .with_scope("project", project.path())
            .with_scope("user", user.path());
        let registry = CommandRegistry::new(Arc::new(source), context());

        let ids: Vec<String> = registry.list().unwrap().iter().map(|c| c.id().to_string()).collect();
        assert_eq!(ids, vec!["test", "lint"]);
    }

    #[test]
    fn test_disabled_command() {
        let yaml = r#"
Commands:
  off:
    Disabled: true
    Run:
      image: alpine
"#;
        let scoped = ScopedBytes::new().with("project", yaml);
        let set = build_command_set(&scoped, context().as_ref());
        assert!(matches!(
            set.get("off").unwrap().validate().errors(),
            [RunebookError::CommandDisabled(_)]
        ));
    }

    #[test]
    fn test_registry_reload_is_stable() {
        let project = tempdir().unwrap();
        let user = tempdir().unwrap();
        fs::write(project.path().join("commands.yml"), PROJECT).unwrap();
        fs::write(user.path().join("commands.yaml"), USER).unwrap();

        let source = DirectoryConfigSource::new()
            .with_scope("project", project.path())
            .with_scope("user", user.path());
        let registry = CommandRegistry::new(Arc::new(source), context());

        let first = registry.commands().unwrap();
        let reloaded = registry.load().unwrap();
        assert_eq!(*first, *reloaded);
        assert!(!Arc::ptr_eq(&first, &reloaded));
        assert!(Arc::ptr_eq(&reloaded, &registry.commands().unwrap()));

        let external: Vec<String> = registry
            .list_external()
            .unwrap()
            .iter()
            .map(|c| c.id().to_string())
            .collect();
        assert_eq!(external, vec!["build", "test"]);
        assert_eq!(registry.list().unwrap().len(), 3);
    }

    #[test]
    fn test_registry_get() {
        let source = DirectoryConfigSource::new();
        let registry = CommandRegistry::new(Arc::new(source), context());

        assert!(registry.commands().unwrap().is_empty());
        assert!(matches!(registry.get("nope"), Err(RunebookError::CommandNotFound(_))));
        assert!(matches!(registry.save(), Err(RunebookError::Unsupported(_))));
    }
}
