//! Compose schema adapter
//!
//! Command `Run` bodies are compose service definitions. Rather than
//! carrying a second service parser, each document is rewritten into a
//! compose document whose services are the commands (the
//! "wrap-as-fake-service" technique) and handed to the compose loader.
//! The loaded services are then correlated back to commands by name.
//!
//! Callers only see [`correlate_services`]; swapping the technique for a
//! native parser does not touch them.

use crate::compose::{load, parse_yaml, ConfigDetails, ConfigFile, ServiceDefinition};
use crate::error::{Result, RunebookError};
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::path::Path;

/// Top level key holding the commands
pub const COMMANDS_KEY: &str = "Commands";

/// Per command key holding the service body
pub const RUN_KEY: &str = "Run";

/// Compose version stamped on the synthesized document
pub const FAKE_COMPOSE_VERSION: &str = "3";

const FAKE_FILENAME: &str = "commands (as compose services)";

/// Resolve every command's `Run` body into a normalized service
/// definition, keyed by command id.
///
/// Commands without a `Run` body are left out.
pub fn correlate_services(
    bytes: &[u8],
    working_dir: &Path,
    env: &HashMap<String, String>,
) -> Result<IndexMap<String, ServiceDefinition>> {
    let document = parse_yaml(bytes)?;
    let fake = wrap_as_fake_services(&document)?;

    let details = ConfigDetails {
        working_dir: working_dir.to_path_buf(),
        config_files: vec![ConfigFile {
            filename: FAKE_FILENAME.to_string(),
            config: fake,
        }],
        environment: env.clone(),
    };

    let config = load(&details)?;
    Ok(config
        .services
        .into_iter()
        .map(|service| (service.name.clone(), service))
        .collect())
}

/// Build a compose document whose services are the `Run` bodies of the
/// commands in `document`.
pub fn wrap_as_fake_services(document: &Value) -> Result<Value> {
    let commands = match document.get(COMMANDS_KEY) {
        Some(Value::Mapping(commands)) => commands,
        Some(_) => {
            return Err(RunebookError::service_load(format!(
                "'{}' must be a mapping of commands",
                COMMANDS_KEY
            )))
        }
        None => {
            return Err(RunebookError::service_load(format!(
                "document has no '{}' key",
                COMMANDS_KEY
            )))
        }
    };

    let mut services = Mapping::new();
    for (id, command) in commands {
        let run = match command {
            Value::Mapping(body) => body.get(RUN_KEY),
            Value::Null => None,
            _ => {
                return Err(RunebookError::service_load(format!(
                    "command {:?} must be a mapping",
                    id.as_str().unwrap_or("?")
                )))
            }
        };

        match run {
            Some(run @ Value::Mapping(_)) => {
                services.insert(id.clone(), run.clone());
            }
            Some(_) => {
                return Err(RunebookError::service_load(format!(
                    "'{}' of command {:?} must be a mapping",
                    RUN_KEY,
                    id.as_str().unwrap_or("?")
                )))
            }
            None => {}
        }
    }

    let mut fake = Mapping::new();
    fake.insert(Value::from("version"), Value::from(FAKE_COMPOSE_VERSION));
    fake.insert(Value::from("services"), Value::Mapping(services));
    Ok(Value::Mapping(fake))
}
