//! Runebook - scoped container commands
//!
//! Runebook reads named commands from layered configuration scopes (the
//! project first, then the user). Each command carries a compose style
//! service body which is loaded with a compose compatible loader,
//! rewritten for the local project and run as a single shot container.
//!
//! - Scoped command documents, merged by priority
//! - Compose service loading (interpolation, normalization)
//! - Volume path aliases (`~`, `!`, `@alias`)
//! - Service to container spec translation
//! - Stack deploy, remove and task listing

pub mod command;
pub mod compose;
pub mod config;
pub mod engine;
pub mod error;
pub mod operation;
pub mod stack;

pub use error::{Result, RunebookError};
