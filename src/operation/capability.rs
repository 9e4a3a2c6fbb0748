//! Capabilities operations are built from

use crate::command::{CommandRegistry, ServiceContext};
use crate::config::StackConfig;
use crate::engine::ContainerEngine;
use crate::error::{Result, RunebookError};
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared, lockable writer
pub type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Output and error streams for human readable progress
#[derive(Clone)]
pub struct Streams {
    out: SharedWriter,
    err: SharedWriter,
}

impl Streams {
    pub fn new(out: impl Write + Send + 'static, err: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(out))),
            err: Arc::new(Mutex::new(Box::new(err))),
        }
    }

    /// Process stdout and stderr
    pub fn stdio() -> Self {
        Self::new(std::io::stdout(), std::io::stderr())
    }

    pub fn out(&self) -> Result<MutexGuard<'_, Box<dyn Write + Send>>> {
        self.out
            .lock()
            .map_err(|_| RunebookError::Lock("Failed to lock output stream".to_string()))
    }

    pub fn err(&self) -> Result<MutexGuard<'_, Box<dyn Write + Send>>> {
        self.err
            .lock()
            .map_err(|_| RunebookError::Lock("Failed to lock error stream".to_string()))
    }
}

pub trait HasEngine {
    fn engine(&self) -> Arc<dyn ContainerEngine>;
}

pub trait HasStackConfig {
    fn stack_config(&self) -> Arc<dyn StackConfig>;
}

pub trait HasCommands {
    fn commands(&self) -> Arc<CommandRegistry>;
}

pub trait HasServiceContext {
    fn service_context(&self) -> Arc<dyn ServiceContext>;
}

pub trait HasStreams {
    fn streams(&self) -> Streams;
}
