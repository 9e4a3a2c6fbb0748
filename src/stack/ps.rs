//! Stack task listing

use super::options::PsOptions;
use crate::engine::{ContainerEngine, TaskFilter};
use crate::error::{Result, RunebookError};
use std::io::Write;

const TRUNCATED_ID_LEN: usize = 12;

/// List the tasks of a stack
pub fn run_ps(engine: &dyn ContainerEngine, opts: &PsOptions, out: &mut dyn Write) -> Result<()> {
    let filter = task_filter(opts)?;
    let tasks = engine.list_tasks(&filter)?;

    if tasks.is_empty() {
        writeln!(out, "Nothing found in stack: {}", opts.namespace)?;
        return Ok(());
    }

    if !opts.quiet {
        writeln!(out, "ID\tNAME\tIMAGE\tSTATE")?;
    }
    for task in &tasks {
        let id = display_id(&task.id, opts.no_trunc);

        if opts.quiet {
            writeln!(out, "{}", id)?;
        } else {
            writeln!(out, "{}\t{}\t{}\t{}", id, task.name, task.image, task.state)?;
        }
    }

    Ok(())
}

/// Task id as printed, cut to the first characters unless `no_trunc`
fn display_id(id: &str, no_trunc: bool) -> String {
    if no_trunc {
        id.to_string()
    } else {
        id.chars().take(TRUNCATED_ID_LEN).collect()
    }
}

fn task_filter(opts: &PsOptions) -> Result<TaskFilter> {
    let mut filter = TaskFilter {
        namespace: Some(opts.namespace.clone()),
        ..Default::default()
    };

    for entry in &opts.filter {
        match entry.split_once('=') {
            Some(("name", value)) => filter.name = Some(value.to_string()),
            Some(("service", value)) => filter.service = Some(value.to_string()),
            _ => return Err(RunebookError::Stack(format!("invalid filter '{}'", entry))),
        }
    }

    Ok(filter)
}
