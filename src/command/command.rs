//! Resolved, executable commands

use super::context::ServiceContext;
use super::document::RawCommandEntry;
use crate::compose::ServiceDefinition;
use crate::engine::{service_to_container, ContainerEngine, ContainerRunSpec, RemoveOptions, RunOptions};
use crate::error::{Result, RunebookError};
use crate::operation::property::{Property, PropertyValue, COMMAND_FLAGS};
use crate::operation::{OperationResult, Properties, Usage};

/// A command bound to its service definition
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    entry: RawCommandEntry,
    service: Option<ServiceDefinition>,
    /// The service context rewrite has been applied to `service`
    rewritten: bool,
}

impl Command {
    /// Create a command with no service body yet
    pub fn new(entry: RawCommandEntry) -> Self {
        Self {
            entry,
            service: None,
            rewritten: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.entry.id
    }

    pub fn entry(&self) -> &RawCommandEntry {
        &self.entry
    }

    pub fn service(&self) -> Option<&ServiceDefinition> {
        self.service.as_ref()
    }

    /// Attach the correlated service definition
    pub fn set_service(&mut self, service: ServiceDefinition, rewritten: bool) {
        self.service = Some(service);
        self.rewritten = rewritten;
    }

    pub fn usage(&self) -> Usage {
        if self.entry.internal {
            Usage::Internal
        } else {
            Usage::External
        }
    }

    /// Runtime inputs accepted by [`exec`](Self::exec)
    pub fn properties(&self) -> Properties {
        let mut props = Properties::new();
        props.add(Property::new(
            COMMAND_FLAGS,
            "Flags",
            "Arguments replacing the command of the container",
            Usage::External,
            PropertyValue::List(Vec::new()),
        ));
        props
    }

    /// Check the command can run. Every failing condition is reported.
    pub fn validate(&self) -> OperationResult {
        let mut result = OperationResult::success();
        if self.entry.disabled {
            result.add_error(RunebookError::CommandDisabled(self.entry.id.clone()));
        }
        if self.service.is_none() {
            result.add_error(RunebookError::MissingService(self.entry.id.clone()));
        }
        result
    }

    /// Build the container run spec for this command.
    ///
    /// Non-empty `flags` replace the service command.
    pub fn run_spec(&self, context: &dyn ServiceContext, flags: &[String]) -> Result<ContainerRunSpec> {
        let mut service = self
            .service
            .clone()
            .ok_or_else(|| RunebookError::MissingService(self.entry.id.clone()))?;

        if !self.rewritten {
            context.alter_service(&mut service);
        }

        let mut spec = service_to_container(&service);
        if !flags.is_empty() {
            spec.config.cmd = flags.to_vec();
        }
        Ok(spec)
    }

    /// Run the command once, then remove its container unless the command
    /// is persistent.
    pub fn exec(&self, engine: &dyn ContainerEngine, context: &dyn ServiceContext, flags: &[String]) -> OperationResult {
        OperationResult::from_result(self.try_exec(engine, context, flags))
    }

    fn try_exec(&self, engine: &dyn ContainerEngine, context: &dyn ServiceContext, flags: &[String]) -> Result<()> {
        if self.entry.disabled {
            return Err(RunebookError::CommandDisabled(self.entry.id.clone()));
        }

        let spec = self.run_spec(context, flags)?;
        let opts = RunOptions {
            name: self.entry.id.clone(),
        };

        let id = engine.run(&opts, &spec)?;
        tracing::debug!("Command {} ran in container {}", self.entry.id, id);

        if !self.entry.persistent {
            engine.remove(
                &id,
                RemoveOptions {
                    remove_volumes: true,
                    remove_links: false,
                    force: false,
                },
            )?;
        }
        Ok(())
    }
}
