//! Stack removal

use super::options::RemoveOptions;
use crate::engine::{ContainerEngine, StackResource};
use crate::error::{Result, RunebookError};
use std::io::Write;

/// Remove every service, secret and network of a stack.
///
/// Progress goes to `err`. Removal continues past individual failures and
/// reports them together at the end.
pub fn run_remove(
    engine: &dyn ContainerEngine,
    opts: &RemoveOptions,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<()> {
    let resources = engine.stack_resources(&opts.namespace)?;

    if resources.is_empty() {
        writeln!(out, "Nothing found in stack: {}", opts.namespace)?;
        return Ok(());
    }

    let mut has_error = remove_all(&resources.services, "service", err, |id| engine.remove_service(id))?;
    has_error |= remove_all(&resources.secrets, "secret", err, |id| engine.remove_secret(id))?;
    has_error |= remove_all(&resources.networks, "network", err, |id| engine.remove_network(id))?;

    if has_error {
        return Err(RunebookError::Stack("Failed to remove some resources".to_string()));
    }
    Ok(())
}

fn remove_all<F>(resources: &[StackResource], kind: &str, err: &mut dyn Write, remove: F) -> Result<bool>
where
    F: Fn(&str) -> Result<()>,
{
    let mut failed = false;
    for resource in resources {
        writeln!(err, "Removing {} {}", kind, resource.name)?;
        if let Err(e) = remove(&resource.id) {
            writeln!(err, "Failed to remove {} {}: {}", kind, resource.id, e)?;
            failed = true;
        }
    }
    Ok(failed)
}
