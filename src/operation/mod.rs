//! Operations
//!
//! Every user facing action (running a command, bringing the stack up or
//! down, listing stack tasks) is an [`Operation`]. Operations are built
//! from narrow capability traits and run on their own blocking task,
//! reporting through an [`OperationResult`].

pub mod capability;
pub mod command;
pub mod handler;
pub mod orchestrate;
pub mod property;

pub use capability::{HasCommands, HasEngine, HasServiceContext, HasStackConfig, HasStreams, Streams};
pub use command::CommandExecOperation;
pub use handler::LocalHandler;
pub use orchestrate::{StackDownOperation, StackPsOperation, StackUpOperation};
pub use property::{Properties, Property, PropertyValue};

use crate::error::{Result, RunebookError};
use tokio::task::JoinHandle;

/// Who an operation or property is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    /// Used by other operations only
    Internal,
    /// Shown to users
    External,
}

/// Outcome of validating or running an operation
#[derive(Debug, Default)]
pub struct OperationResult {
    success: bool,
    errors: Vec<RunebookError>,
}

impl OperationResult {
    pub fn success() -> Self {
        Self {
            success: true,
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<RunebookError>) -> Self {
        Self {
            success: false,
            errors,
        }
    }

    pub fn from_result<T>(result: Result<T>) -> Self {
        match result {
            Ok(_) => Self::success(),
            Err(e) => Self::failed(vec![e]),
        }
    }

    /// Record an error and mark the result failed
    pub fn add_error(&mut self, error: RunebookError) {
        self.errors.push(error);
        self.success = false;
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn errors(&self) -> &[RunebookError] {
        &self.errors
    }

    /// First error, if the result failed
    pub fn into_result(self) -> Result<()> {
        if self.success {
            return Ok(());
        }
        Err(self
            .errors
            .into_iter()
            .next()
            .unwrap_or_else(|| RunebookError::Internal("operation failed without an error".to_string())))
    }
}

/// An operation running on its own task
pub struct PendingOperation {
    handle: JoinHandle<OperationResult>,
}

impl PendingOperation {
    /// Run `work` on the blocking pool. Must be called inside a tokio runtime.
    pub fn spawn<F>(work: F) -> Self
    where
        F: FnOnce() -> OperationResult + Send + 'static,
    {
        Self {
            handle: tokio::task::spawn_blocking(work),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the operation to finish
    pub async fn finished(self) -> OperationResult {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => OperationResult::failed(vec![RunebookError::Internal(format!(
                "operation task failed: {}",
                e
            ))]),
        }
    }
}

/// A runnable action
pub trait Operation: Send + Sync {
    fn id(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn usage(&self) -> Usage;

    /// Properties with their default values
    fn properties(&self) -> Properties;

    fn validate(&self) -> OperationResult;

    fn exec(&self, props: Properties) -> PendingOperation;
}
