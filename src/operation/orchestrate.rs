//! Stack orchestration operations

use super::capability::{HasEngine, HasStackConfig, HasStreams, Streams};
use super::property::{Property, PropertyValue, STACK_DEPLOY_OPTIONS, STACK_PS_OPTIONS, STACK_REMOVE_OPTIONS};
use super::{Operation, OperationResult, PendingOperation, Properties, Usage};
use crate::config::StackConfig;
use crate::engine::ContainerEngine;
use crate::error::{Result, RunebookError};
use crate::stack::{run_deploy, run_ps, run_remove, DeployOptions, PsOptions, RemoveOptions};
use std::sync::Arc;

/// Shared state of the stack operations
#[derive(Clone)]
struct StackBase {
    engine: Arc<dyn ContainerEngine>,
    stack: Arc<dyn StackConfig>,
    streams: Streams,
}

impl StackBase {
    fn from_capabilities<H>(handler: &H) -> Self
    where
        H: HasEngine + HasStackConfig + HasStreams,
    {
        Self {
            engine: handler.engine(),
            stack: handler.stack_config(),
            streams: handler.streams(),
        }
    }

    /// Configured options, falling back to defaults when the
    /// configuration can't be read
    fn or_default<T: Default>(options: Result<T>, kind: &str) -> T {
        options.unwrap_or_else(|e| {
            tracing::error!("Couldn't read stack {} options: {}", kind, e);
            T::default()
        })
    }
}

fn missing(id: &str) -> OperationResult {
    OperationResult::failed(vec![RunebookError::InvalidConfig(format!("missing property {}", id))])
}

/// Deploy the project stack
pub struct StackUpOperation {
    base: StackBase,
}

impl StackUpOperation {
    pub fn from_capabilities<H>(handler: &H) -> Self
    where
        H: HasEngine + HasStackConfig + HasStreams,
    {
        Self {
            base: StackBase::from_capabilities(handler),
        }
    }
}

impl Operation for StackUpOperation {
    fn id(&self) -> &'static str {
        "stack.up"
    }

    fn description(&self) -> &'static str {
        "Deploy the project stack"
    }

    fn usage(&self) -> Usage {
        Usage::External
    }

    fn properties(&self) -> Properties {
        let options: DeployOptions = StackBase::or_default(self.base.stack.deploy_options(), "deploy");
        let mut props = Properties::new();
        props.add(Property::new(
            STACK_DEPLOY_OPTIONS,
            "Deploy options",
            "Options for deploying the stack",
            Usage::Internal,
            PropertyValue::Deploy(options),
        ));
        props
    }

    fn validate(&self) -> OperationResult {
        OperationResult::success()
    }

    fn exec(&self, props: Properties) -> PendingOperation {
        let base = self.base.clone();
        PendingOperation::spawn(move || {
            let Some(opts) = props.deploy_options(STACK_DEPLOY_OPTIONS) else {
                return missing(STACK_DEPLOY_OPTIONS);
            };
            tracing::info!("Deploying stack {}", opts.namespace);

            OperationResult::from_result(base.streams.out().and_then(|mut out| {
                run_deploy(base.engine.as_ref(), opts, &mut *out)
            }))
        })
    }
}

/// Remove the project stack
pub struct StackDownOperation {
    base: StackBase,
}

impl StackDownOperation {
    pub fn from_capabilities<H>(handler: &H) -> Self
    where
        H: HasEngine + HasStackConfig + HasStreams,
    {
        Self {
            base: StackBase::from_capabilities(handler),
        }
    }
}

impl Operation for StackDownOperation {
    fn id(&self) -> &'static str {
        "stack.down"
    }

    fn description(&self) -> &'static str {
        "Remove the project stack"
    }

    fn usage(&self) -> Usage {
        Usage::External
    }

    fn properties(&self) -> Properties {
        let options: RemoveOptions = StackBase::or_default(self.base.stack.remove_options(), "remove");
        let mut props = Properties::new();
        props.add(Property::new(
            STACK_REMOVE_OPTIONS,
            "Remove options",
            "Options for removing the stack",
            Usage::Internal,
            PropertyValue::Remove(options),
        ));
        props
    }

    fn validate(&self) -> OperationResult {
        OperationResult::success()
    }

    fn exec(&self, props: Properties) -> PendingOperation {
        let base = self.base.clone();
        PendingOperation::spawn(move || {
            let Some(opts) = props.remove_options(STACK_REMOVE_OPTIONS) else {
                return missing(STACK_REMOVE_OPTIONS);
            };
            tracing::info!("Removing stack {}", opts.namespace);

            let result = base.streams.out().and_then(|mut out| {
                let mut err = base.streams.err()?;
                run_remove(base.engine.as_ref(), opts, &mut *out, &mut *err)
            });
            OperationResult::from_result(result)
        })
    }
}

/// List the tasks of the project stack
pub struct StackPsOperation {
    base: StackBase,
}

impl StackPsOperation {
    pub fn from_capabilities<H>(handler: &H) -> Self
    where
        H: HasEngine + HasStackConfig + HasStreams,
    {
        Self {
            base: StackBase::from_capabilities(handler),
        }
    }
}

impl Operation for StackPsOperation {
    fn id(&self) -> &'static str {
        "stack.ps"
    }

    fn description(&self) -> &'static str {
        "List the tasks of the project stack"
    }

    fn usage(&self) -> Usage {
        Usage::External
    }

    fn properties(&self) -> Properties {
        let options: PsOptions = StackBase::or_default(self.base.stack.ps_options(), "ps");
        let mut props = Properties::new();
        props.add(Property::new(
            STACK_PS_OPTIONS,
            "Ps options",
            "Options for listing stack tasks",
            Usage::Internal,
            PropertyValue::Ps(options),
        ));
        props
    }

    fn validate(&self) -> OperationResult {
        OperationResult::success()
    }

    fn exec(&self, props: Properties) -> PendingOperation {
        let base = self.base.clone();
        PendingOperation::spawn(move || {
            let Some(opts) = props.ps_options(STACK_PS_OPTIONS) else {
                return missing(STACK_PS_OPTIONS);
            };

            OperationResult::from_result(
                base.streams
                    .out()
                    .and_then(|mut out| run_ps(base.engine.as_ref(), opts, &mut *out)),
            )
        })
    }
}
