//! Commands
//!
//! A command is a named, single shot container run described in scoped
//! configuration documents. This module parses those documents, resolves
//! each command's service body through the compose loader, rewrites
//! volume paths for the local project and merges scopes by priority.

pub mod adapter;
#[allow(clippy::module_inception)]
pub mod command;
pub mod context;
pub mod document;
pub mod registry;
pub mod set;

pub use adapter::{correlate_services, wrap_as_fake_services};
pub use command::Command;
pub use context::{LocalServiceContext, ServiceContext};
pub use document::{parse, RawCommandEntry};
pub use registry::{build_command_set, CommandRegistry};
pub use set::CommandSet;
