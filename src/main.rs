//! Runebook - scoped container commands
//!
//! This is the main CLI entry point for Runebook.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use runebook::command::Command;
use runebook::config::{DirectoryConfigSource, ProjectSettings};
use runebook::engine::LocalEngine;
use runebook::operation::property::{PropertyValue, COMMAND_FLAGS, COMMAND_KEY};
use runebook::operation::{HasCommands, HasEngine, HasServiceContext, LocalHandler, Operation, Properties, Streams, Usage};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Runebook - scoped container commands
#[derive(Parser)]
#[command(name = "runebook")]
#[command(author = "Evoker Industries")]
#[command(version)]
#[command(about = "Run project commands defined as compose services", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Project root (defaults to the current directory)
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    /// Extra volume path alias (NAME=PATH)
    #[arg(long = "alias", global = true)]
    aliases: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List commands
    List {
        /// Include internal commands
        #[arg(short, long)]
        all: bool,
    },

    /// Show a command and the container it would run
    Show {
        /// Command id
        id: String,
    },

    /// Run a command
    Run {
        /// Command id
        id: String,
        /// Arguments replacing the container command
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        flags: Vec<String>,
    },

    /// Deploy the project stack
    Up,

    /// Remove the project stack
    Down,

    /// List the tasks of the project stack
    Ps,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut settings =
        ProjectSettings::discover(cli.project_root.as_deref()).context("Failed to resolve project paths")?;
    let source = DirectoryConfigSource::for_project(&settings.project_root);
    settings.add_scope_aliases(&source);
    settings
        .add_alias_pairs(&cli.aliases)
        .context("Invalid --alias value")?;

    let env: HashMap<String, String> = std::env::vars().collect();
    let handler = LocalHandler::new(
        settings,
        Arc::new(source),
        Arc::new(LocalEngine::new()),
        env,
        Streams::stdio(),
    )
    .context("Failed to initialize the local handler")?;

    let runs_containers = matches!(cli.command, Commands::Run { .. } | Commands::Up | Commands::Down | Commands::Ps);
    if runs_containers && handler.engine().is_simulated() {
        tracing::warn!(
            "Using the in-process {} engine: containers are simulated and stack state is not kept between invocations",
            handler.id()
        );
    }

    match cli.command {
        Commands::List { all } => {
            let registry = handler.commands();
            let commands = if all {
                registry.list()?
            } else {
                registry.list_external()?
            };

            if commands.is_empty() {
                println!("No commands configured");
            }
            for command in &commands {
                print_summary(command);
            }
        }

        Commands::Show { id } => {
            let command = handler.commands().get(&id)?;
            print_summary(&command);

            let entry = command.entry();
            if !entry.help.is_empty() {
                println!("\n{}", entry.help);
            }

            let validation = command.validate();
            for error in validation.errors() {
                println!("  ! {}", error);
            }
            if validation.is_success() {
                let spec = command.run_spec(handler.service_context().as_ref(), &[])?;
                println!("{}", serde_json::to_string_pretty(&spec)?);
            }
        }

        Commands::Run { id, flags } => {
            let operation = required_operation(&handler, "command.exec")?;
            let mut props = operation.properties();
            props.set(COMMAND_KEY, PropertyValue::Text(id.clone()))?;
            props.set(COMMAND_FLAGS, PropertyValue::List(flags))?;
            run_operation(operation.as_ref(), props)
                .await
                .with_context(|| format!("Command {} failed", id))?;
        }

        Commands::Up => {
            let operation = required_operation(&handler, "stack.up")?;
            let props = operation.properties();
            run_operation(operation.as_ref(), props)
                .await
                .context("Stack deploy failed")?;
        }

        Commands::Down => {
            let operation = required_operation(&handler, "stack.down")?;
            let props = operation.properties();
            run_operation(operation.as_ref(), props)
                .await
                .context("Stack removal failed")?;
        }

        Commands::Ps => {
            let operation = required_operation(&handler, "stack.ps")?;
            let props = operation.properties();
            run_operation(operation.as_ref(), props)
                .await
                .context("Stack listing failed")?;
        }
    }

    Ok(())
}

fn print_summary(command: &Command) {
    let entry = command.entry();
    let mut markers = Vec::new();
    if command.usage() == Usage::Internal {
        markers.push("internal");
    }
    if entry.disabled {
        markers.push("disabled");
    }
    if entry.persistent {
        markers.push("persistent");
    }

    let label = if entry.label.is_empty() {
        command.id()
    } else {
        entry.label.as_str()
    };
    if markers.is_empty() {
        println!("{:<20} {:<24} {}", command.id(), label, entry.description);
    } else {
        println!(
            "{:<20} {:<24} {} [{}]",
            command.id(),
            label,
            entry.description,
            markers.join(", ")
        );
    }
}

fn required_operation(handler: &LocalHandler, id: &str) -> Result<Box<dyn Operation>> {
    handler
        .operation(id)
        .with_context(|| format!("Handler {} has no {} operation", handler.id(), id))
}

/// Validate, execute and wait for an operation
async fn run_operation(operation: &dyn Operation, props: Properties) -> Result<()> {
    operation.validate().into_result()?;

    let result = operation.exec(props).finished().await;
    for error in result.errors().iter().skip(1) {
        tracing::error!("{}", error);
    }
    result.into_result()?;
    Ok(())
}
