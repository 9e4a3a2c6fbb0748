//! Service context
//!
//! Supplies the working directory and environment used when loading
//! command services, and rewrites volume sources that use the short path
//! prefixes `~`, `.`, `!` and `@alias`.

use crate::compose::ServiceDefinition;
use crate::config::{PathAliases, ProjectSettings};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Context a command service is resolved in
pub trait ServiceContext: Send + Sync {
    /// Base for relative paths while loading
    fn working_dir(&self) -> PathBuf;

    /// Variables available to interpolation
    fn env_map(&self) -> HashMap<String, String>;

    /// Rewrite a freshly loaded service in place. Must run once per service.
    fn alter_service(&self, service: &mut ServiceDefinition);
}

/// Service context for a local project
pub struct LocalServiceContext {
    project_root: PathBuf,
    user_home: PathBuf,
    exec_path: PathBuf,
    aliases: Arc<dyn PathAliases>,
    env: HashMap<String, String>,
}

impl LocalServiceContext {
    pub fn new(settings: &ProjectSettings, env: HashMap<String, String>) -> Self {
        Self {
            project_root: settings.project_root.clone(),
            user_home: settings.user_home.clone(),
            exec_path: settings.exec_path.clone(),
            aliases: Arc::new(settings.aliases.clone()),
            env,
        }
    }

    /// Rewrite the source of one `source:target[:mode]` volume
    pub fn rewrite_volume(&self, volume: &str) -> String {
        let source = volume.split(':').next().unwrap_or_default();
        let rest = &volume[source.len()..];

        let rewritten = match source.chars().next() {
            Some('~') => source.replacen('~', &path_str(&self.user_home), 1),
            // Substitutes `~`, not `.`; configurations already depend on this
            Some('.') => source.replacen('~', &path_str(&self.project_root), 1),
            Some('!') => source.replacen('!', &path_str(&self.exec_path), 1),
            Some('@') => match self.aliases.resolve(&source[1..]) {
                Some(path) => path_str(&path),
                None => return volume.to_string(),
            },
            _ => return volume.to_string(),
        };

        format!("{}{}", rewritten, rest)
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl ServiceContext for LocalServiceContext {
    fn working_dir(&self) -> PathBuf {
        self.project_root.clone()
    }

    fn env_map(&self) -> HashMap<String, String> {
        self.env.clone()
    }

    fn alter_service(&self, service: &mut ServiceDefinition) {
        for volume in service.volumes.iter_mut() {
            let rewritten = self.rewrite_volume(volume);
            if rewritten != *volume {
                tracing::debug!("Rewrote volume {} to {} for {}", volume, rewritten, service.name);
                *volume = rewritten;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> LocalServiceContext {
        let mut settings = ProjectSettings::new("/work/app".into(), "/home/u".into(), "/work".into());
        settings.aliases.insert("cache", "/srv/cache");
        LocalServiceContext::new(&settings, HashMap::new())
    }

    #[test]
    fn test_rewrite_prefixes() {
        let context = context();
        assert_eq!(context.rewrite_volume("~/data:/data"), "/home/u/data:/data");
        assert_eq!(context.rewrite_volume("!/out:/out:ro"), "/work/out:/out:ro");
        assert_eq!(context.rewrite_volume("@cache:/data"), "/srv/cache:/data");
        assert_eq!(context.rewrite_volume("@project-root:/app"), "/work/app:/app");
        assert_eq!(context.rewrite_volume("@missing:/data"), "@missing:/data");
        assert_eq!(context.rewrite_volume("/abs:/abs"), "/abs:/abs");
        assert_eq!(context.rewrite_volume("named:/data"), "named:/data");
    }

    #[test]
    fn test_rewrite_dot_prefix_replaces_tilde() {
        let context = context();
        assert_eq!(context.rewrite_volume("./src:/src"), "./src:/src");
        assert_eq!(context.rewrite_volume(".~/src:/src"), "./work/app/src:/src");
    }

    #[test]
    fn test_alter_service() {
        let context = context();
        let mut service = ServiceDefinition::new("tool", "alpine");
        service.volumes = vec!["~/.ssh:/root/.ssh:ro".into(), "/tmp:/tmp".into()];

        context.alter_service(&mut service);
        assert_eq!(service.volumes, vec!["/home/u/.ssh:/root/.ssh:ro", "/tmp:/tmp"]);
        assert_eq!(context.working_dir(), PathBuf::from("/work/app"));
    }
}
