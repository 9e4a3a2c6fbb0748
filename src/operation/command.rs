//! Command execution operation

use super::capability::{HasCommands, HasEngine, HasServiceContext};
use super::property::{Property, PropertyValue, COMMAND_FLAGS, COMMAND_KEY};
use super::{Operation, OperationResult, PendingOperation, Properties, Usage};
use crate::command::{CommandRegistry, ServiceContext};
use crate::engine::ContainerEngine;
use crate::error::RunebookError;
use std::sync::Arc;

/// Runs one configured command by id
pub struct CommandExecOperation {
    engine: Arc<dyn ContainerEngine>,
    commands: Arc<CommandRegistry>,
    context: Arc<dyn ServiceContext>,
}

impl CommandExecOperation {
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        commands: Arc<CommandRegistry>,
        context: Arc<dyn ServiceContext>,
    ) -> Self {
        Self {
            engine,
            commands,
            context,
        }
    }

    pub fn from_capabilities<H>(handler: &H) -> Self
    where
        H: HasEngine + HasCommands + HasServiceContext,
    {
        Self::new(handler.engine(), handler.commands(), handler.service_context())
    }
}

impl Operation for CommandExecOperation {
    fn id(&self) -> &'static str {
        "command.exec"
    }

    fn description(&self) -> &'static str {
        "Run a configured command"
    }

    fn usage(&self) -> Usage {
        Usage::External
    }

    fn properties(&self) -> Properties {
        let mut props = Properties::new();
        props.add(Property::new(
            COMMAND_KEY,
            "Command",
            "Id of the command to run",
            Usage::External,
            PropertyValue::Text(String::new()),
        ));
        props.add(Property::new(
            COMMAND_FLAGS,
            "Flags",
            "Arguments replacing the command of the container",
            Usage::External,
            PropertyValue::List(Vec::new()),
        ));
        props
    }

    fn validate(&self) -> OperationResult {
        OperationResult::success()
    }

    fn exec(&self, props: Properties) -> PendingOperation {
        let engine = Arc::clone(&self.engine);
        let commands = Arc::clone(&self.commands);
        let context = Arc::clone(&self.context);

        PendingOperation::spawn(move || {
            let key = props.text(COMMAND_KEY).unwrap_or_default();
            if key.is_empty() {
                return OperationResult::failed(vec![RunebookError::InvalidConfig(
                    "No command name provided.".to_string(),
                )]);
            }
            let flags = props.list(COMMAND_FLAGS).unwrap_or_default();

            let command = match commands.get(key) {
                Ok(command) => command,
                Err(e) => return OperationResult::failed(vec![e]),
            };

            let validation = command.validate();
            if !validation.is_success() {
                return validation;
            }

            tracing::info!("Running command {}", key);
            command.exec(engine.as_ref(), context.as_ref(), flags)
        })
    }
}
