//! Local handler
//!
//! Wires configuration, the service context, the command registry and a
//! container engine together, and hands out the operations built on them.

use super::capability::{HasCommands, HasEngine, HasServiceContext, HasStackConfig, HasStreams, Streams};
use super::command::CommandExecOperation;
use super::orchestrate::{StackDownOperation, StackPsOperation, StackUpOperation};
use super::Operation;
use crate::command::{CommandRegistry, LocalServiceContext, ServiceContext};
use crate::config::{ConfigSource, ProjectSettings, StackConfig, YamlStackConfig};
use crate::engine::ContainerEngine;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Handler for a project on the local machine
pub struct LocalHandler {
    engine: Arc<dyn ContainerEngine>,
    stack: Arc<dyn StackConfig>,
    commands: Arc<CommandRegistry>,
    context: Arc<dyn ServiceContext>,
    streams: Streams,
}

impl LocalHandler {
    pub fn new(
        settings: ProjectSettings,
        source: Arc<dyn ConfigSource>,
        engine: Arc<dyn ContainerEngine>,
        env: HashMap<String, String>,
        streams: Streams,
    ) -> Result<Self> {
        let stack = Arc::new(YamlStackConfig::new(Arc::clone(&source), &settings.project_root)?);
        let context: Arc<dyn ServiceContext> = Arc::new(LocalServiceContext::new(&settings, env));
        let commands = Arc::new(CommandRegistry::new(source, Arc::clone(&context)));

        tracing::debug!("Local handler ready for {}", settings.project_root.display());

        Ok(Self {
            engine,
            stack,
            commands,
            context,
            streams,
        })
    }

    pub fn id(&self) -> &'static str {
        "local"
    }

    pub fn operations(&self) -> Vec<Box<dyn Operation>> {
        vec![
            Box::new(CommandExecOperation::from_capabilities(self)),
            Box::new(StackUpOperation::from_capabilities(self)),
            Box::new(StackDownOperation::from_capabilities(self)),
            Box::new(StackPsOperation::from_capabilities(self)),
        ]
    }

    pub fn operation(&self, id: &str) -> Option<Box<dyn Operation>> {
        self.operations().into_iter().find(|op| op.id() == id)
    }
}

impl HasEngine for LocalHandler {
    fn engine(&self) -> Arc<dyn ContainerEngine> {
        Arc::clone(&self.engine)
    }
}

impl HasStackConfig for LocalHandler {
    fn stack_config(&self) -> Arc<dyn StackConfig> {
        Arc::clone(&self.stack)
    }
}

impl HasCommands for LocalHandler {
    fn commands(&self) -> Arc<CommandRegistry> {
        Arc::clone(&self.commands)
    }
}

impl HasServiceContext for LocalHandler {
    fn service_context(&self) -> Arc<dyn ServiceContext> {
        Arc::clone(&self.context)
    }
}

impl HasStreams for LocalHandler {
    fn streams(&self) -> Streams {
        self.streams.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DirectoryConfigSource;
    use crate::engine::LocalEngine;
    use crate::operation::property::{PropertyValue, COMMAND_FLAGS, COMMAND_KEY, STACK_DEPLOY_OPTIONS};
    use std::fs;
    use std::io::sink;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_handler_end_to_end() {
        let root = tempdir().unwrap();
        let conf = root.path().join(".runebook");
        fs::create_dir(&conf).unwrap();
        fs::write(
            conf.join("commands.yml"),
            "Commands:\n  greet:\n    Persistant: true\n    Run:\n      image: alpine\n      volumes:\n        - '@conf-project:/conf'\n",
        )
        .unwrap();
        fs::write(
            conf.join("stack.yml"),
            "Deploy:\n  Composefile: stack.yml\n  Namespace: demo\n",
        )
        .unwrap();
        fs::write(
            root.path().join("stack.yml"),
            "version: '3.7'\nservices:\n  api:\n    image: api:latest\n",
        )
        .unwrap();

        let source = DirectoryConfigSource::new().with_scope("project", &conf);
        let mut settings = ProjectSettings::new(root.path().to_path_buf(), "/home/u".into(), root.path().to_path_buf());
        settings.add_scope_aliases(&source);

        let engine = Arc::new(LocalEngine::new());
        let handler = LocalHandler::new(
            settings,
            Arc::new(source),
            engine.clone(),
            HashMap::new(),
            Streams::new(sink(), sink()),
        )
        .unwrap();

        assert_eq!(handler.id(), "local");
        let ids: Vec<&str> = handler.operations().iter().map(|op| op.id()).collect();
        assert_eq!(ids, vec!["command.exec", "stack.up", "stack.down", "stack.ps"]);

        let exec = handler.operation("command.exec").unwrap();
        let mut props = exec.properties();
        props.set(COMMAND_KEY, PropertyValue::Text("greet".into())).unwrap();
        props.set(COMMAND_FLAGS, PropertyValue::List(vec!["hi".into()])).unwrap();
        assert!(exec.exec(props).finished().await.is_success());

        let containers = engine.containers().unwrap();
        assert_eq!(containers.len(), 1);
        let spec = &containers[0].spec;
        assert_eq!(spec.config.cmd, vec!["hi"]);
        assert_eq!(spec.host_config.mounts[0].source, conf.to_string_lossy());

        let up = handler.operation("stack.up").unwrap();
        let props = up.properties();
        assert_eq!(props.deploy_options(STACK_DEPLOY_OPTIONS).unwrap().namespace, "demo");
        assert!(up.exec(props).finished().await.is_success());
        assert_eq!(engine.stack_resources("demo").unwrap().services.len(), 1);

        assert!(handler.operation("nope").is_none());
    }
}
