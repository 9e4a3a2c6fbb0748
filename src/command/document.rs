//! Command document parsing
//!
//! A scope's command document looks like:
//!
//! ```yaml
//! Commands:
//!   shell:
//!     Label: Shell
//!     Description: Open a shell in the project image
//!     Man: Starts an interactive shell with the project mounted
//!     Persistant: false
//!     Internal: false
//!     Disabled: false
//!     Run:
//!       image: alpine
//!       command: sh
//!       volumes:
//!         - .:/app
//! ```
//!
//! Only the metadata is read here. The `Run` bodies are resolved by the
//! [`adapter`](super::adapter).

use super::command::Command;
use super::set::CommandSet;
use crate::error::{Result, RunebookError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Metadata for one command as written in a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCommandEntry {
    /// Document key, filled in after decoding
    #[serde(skip)]
    pub id: String,
    /// Scope the entry was read from
    #[serde(skip)]
    pub scope: String,
    #[serde(rename = "Label", default)]
    pub label: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Man", default)]
    pub help: String,
    /// Keep the container after the run
    #[serde(rename = "Persistant", default)]
    pub persistent: bool,
    /// Hidden from user facing listings
    #[serde(rename = "Internal", default)]
    pub internal: bool,
    #[serde(rename = "Disabled", default)]
    pub disabled: bool,
}

#[derive(Debug, Default, Deserialize)]
struct CommandDocument {
    #[serde(rename = "Commands", default)]
    commands: IndexMap<String, Option<RawCommandEntry>>,
}

/// Parse a scope's command document into a set of commands without
/// service bodies.
///
/// An empty document is an empty set.
pub fn parse(bytes: &[u8], scope: &str) -> Result<CommandSet> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(CommandSet::new());
    }

    let document: CommandDocument =
        serde_yaml::from_slice(bytes).map_err(|e| RunebookError::decode(scope, e))?;

    let mut set = CommandSet::new();
    for (id, entry) in document.commands {
        let mut entry = entry.unwrap_or_default();
        entry.id = id;
        entry.scope = scope.to_string();
        set.insert(Command::new(entry));
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let yaml = r#"
Commands:
  shell:
    Label: Shell
    Description: Open a shell
    Man: Longer help text
    Persistant: true
    Run:
      image: alpine
  hidden:
    Internal: true
    Disabled: true
  bare:
"#;
        let set = parse(yaml.as_bytes(), "project").unwrap();
        assert_eq!(set.ids(), vec!["shell", "hidden", "bare"]);

        let shell = set.get("shell").unwrap().entry();
        assert_eq!(shell.id, "shell");
        assert_eq!(shell.scope, "project");
        assert_eq!(shell.label, "Shell");
        assert_eq!(shell.description, "Open a shell");
        assert_eq!(shell.help, "Longer help text");
        assert!(shell.persistent);
        assert!(!shell.internal);

        let hidden = set.get("hidden").unwrap().entry();
        assert!(hidden.internal);
        assert!(hidden.disabled);

        assert_eq!(set.get("bare").unwrap().entry().id, "bare");
        assert!(set.get("shell").unwrap().service().is_none());
    }

    #[test]
    fn test_parse_empty_document() {
        assert!(parse(b"", "user").unwrap().is_empty());
        assert!(parse(b"\n  \n", "user").unwrap().is_empty());
        assert!(parse(b"Other: 1\n", "user").unwrap().is_empty());
    }

    #[test]
    fn test_parse_decode_error() {
        let result = parse(b"Commands: [unclosed", "project");
        assert!(matches!(result, Err(RunebookError::Decode { ref scope, .. }) if scope == "project"));

        let result = parse(b"Commands: just a string\n", "project");
        assert!(matches!(result, Err(RunebookError::Decode { .. })));
    }
}
