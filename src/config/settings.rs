//! Project settings and path aliases

use super::source::DirectoryConfigSource;
use crate::error::{Result, RunebookError};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Lookup from a short alias to a filesystem path
pub trait PathAliases: Send + Sync {
    fn resolve(&self, alias: &str) -> Option<PathBuf>;
}

/// Ordered alias table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathAliasTable {
    entries: IndexMap<String, PathBuf>,
}

impl PathAliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an alias
    pub fn insert(&mut self, alias: &str, path: impl Into<PathBuf>) {
        self.entries.insert(alias.to_string(), path.into());
    }

    /// Parse a `name=path` pair
    pub fn parse_pair(pair: &str) -> Result<(String, PathBuf)> {
        match pair.split_once('=') {
            Some((name, path)) if !name.is_empty() && !path.is_empty() => {
                Ok((name.to_string(), PathBuf::from(path)))
            }
            _ => Err(RunebookError::InvalidConfig(format!(
                "alias '{}' must look like name=path",
                pair
            ))),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PathBuf)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PathAliases for PathAliasTable {
    fn resolve(&self, alias: &str) -> Option<PathBuf> {
        self.entries.get(alias).cloned()
    }
}

/// Paths describing the project a command runs for
#[derive(Debug, Clone)]
pub struct ProjectSettings {
    /// Root of the project, used for relative volume sources
    pub project_root: PathBuf,
    /// Home directory of the invoking user
    pub user_home: PathBuf,
    /// Directory the process was started in
    pub exec_path: PathBuf,
    pub aliases: PathAliasTable,
}

impl ProjectSettings {
    /// Create settings with the default aliases
    pub fn new(project_root: PathBuf, user_home: PathBuf, exec_path: PathBuf) -> Self {
        let mut aliases = PathAliasTable::new();
        aliases.insert("project-root", project_root.clone());
        aliases.insert("user-home", user_home.clone());
        aliases.insert("exec", exec_path.clone());

        Self {
            project_root,
            user_home,
            exec_path,
            aliases,
        }
    }

    /// Discover settings from the process environment
    pub fn discover(project_root: Option<&Path>) -> Result<Self> {
        let exec_path = std::env::current_dir()?;
        let user_home = dirs::home_dir()
            .ok_or_else(|| RunebookError::InvalidConfig("could not determine the home directory".to_string()))?;
        let project_root = project_root
            .map(Path::to_path_buf)
            .unwrap_or_else(|| exec_path.clone());

        Ok(Self::new(project_root, user_home, exec_path))
    }

    /// Add a `conf-<scope>` alias for every configuration scope
    pub fn add_scope_aliases(&mut self, source: &DirectoryConfigSource) {
        for (scope, dir) in source.scopes() {
            self.aliases.insert(&format!("conf-{}", scope), dir.clone());
        }
    }

    /// Add user supplied `name=path` aliases; later pairs win
    pub fn add_alias_pairs(&mut self, pairs: &[String]) -> Result<()> {
        for pair in pairs {
            let (name, path) = PathAliasTable::parse_pair(pair)?;
            self.aliases.insert(&name, path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ProjectSettings {
        ProjectSettings::new("/work/app".into(), "/home/u".into(), "/work".into())
    }

    #[test]
    fn test_default_aliases() {
        let settings = settings();
        assert_eq!(settings.aliases.resolve("project-root"), Some(PathBuf::from("/work/app")));
        assert_eq!(settings.aliases.resolve("user-home"), Some(PathBuf::from("/home/u")));
        assert_eq!(settings.aliases.resolve("exec"), Some(PathBuf::from("/work")));
        assert_eq!(settings.aliases.resolve("missing"), None);
    }

    #[test]
    fn test_scope_and_user_aliases() {
        let mut settings = settings();
        let source = DirectoryConfigSource::new().with_scope("project", "/work/app/.runebook");
        settings.add_scope_aliases(&source);
        settings
            .add_alias_pairs(&["cache=/srv/cache".to_string(), "exec=/elsewhere".to_string()])
            .unwrap();

        assert_eq!(
            settings.aliases.resolve("conf-project"),
            Some(PathBuf::from("/work/app/.runebook"))
        );
        assert_eq!(settings.aliases.resolve("cache"), Some(PathBuf::from("/srv/cache")));
        assert_eq!(settings.aliases.resolve("exec"), Some(PathBuf::from("/elsewhere")));
    }

    #[test]
    fn test_parse_pair_rejects_malformed() {
        assert!(PathAliasTable::parse_pair("nopath").is_err());
        assert!(PathAliasTable::parse_pair("=/x").is_err());
        assert!(PathAliasTable::parse_pair("name=").is_err());
    }
}
