//! Configuration
//!
//! Scoped configuration sources, project settings with path aliases, and
//! the stack orchestration configuration.

pub mod settings;
pub mod source;
pub mod stack;

pub use settings::{PathAliasTable, PathAliases, ProjectSettings};
pub use source::{ConfigSource, DirectoryConfigSource, ScopedBytes, ScopedSource};
pub use stack::{DefaultStackConfig, StackConfig, YamlStackConfig};
