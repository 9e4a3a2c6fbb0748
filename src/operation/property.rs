//! Typed operation properties

use super::Usage;
use crate::error::{Result, RunebookError};
use crate::stack::{DeployOptions, PsOptions, RemoveOptions};
use indexmap::IndexMap;
use std::mem::discriminant;

/// Id of the command to act on
pub const COMMAND_KEY: &str = "command.key";
/// Runtime arguments for a command
pub const COMMAND_FLAGS: &str = "command.flags";
pub const STACK_DEPLOY_OPTIONS: &str = "stack.deploy-options";
pub const STACK_REMOVE_OPTIONS: &str = "stack.remove-options";
pub const STACK_PS_OPTIONS: &str = "stack.ps-options";

/// A property value. Setting a property never changes its variant.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    List(Vec<String>),
    Deploy(DeployOptions),
    Remove(RemoveOptions),
    Ps(PsOptions),
}

impl PropertyValue {
    fn kind(&self) -> &'static str {
        match self {
            PropertyValue::Text(_) => "text",
            PropertyValue::List(_) => "list",
            PropertyValue::Deploy(_) => "deploy options",
            PropertyValue::Remove(_) => "remove options",
            PropertyValue::Ps(_) => "ps options",
        }
    }
}

/// A named operation input
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub id: String,
    pub label: String,
    pub description: String,
    pub usage: Usage,
    pub value: PropertyValue,
}

impl Property {
    pub fn new(id: &str, label: &str, description: &str, usage: Usage, value: PropertyValue) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            description: description.to_string(),
            usage,
            value,
        }
    }
}

/// Ordered property set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    entries: IndexMap<String, Property>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property, replacing any with the same id
    pub fn add(&mut self, property: Property) {
        self.entries.insert(property.id.clone(), property);
    }

    /// Add every property of `other` not already present
    pub fn merge(&mut self, other: Properties) {
        for (id, property) in other.entries {
            self.entries.entry(id).or_insert(property);
        }
    }

    pub fn get(&self, id: &str) -> Option<&Property> {
        self.entries.get(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Replace a property's value; the new value must be of the same kind
    pub fn set(&mut self, id: &str, value: PropertyValue) -> Result<()> {
        let property = self
            .entries
            .get_mut(id)
            .ok_or_else(|| RunebookError::InvalidConfig(format!("unknown property {}", id)))?;

        if discriminant(&property.value) != discriminant(&value) {
            tracing::error!(
                "Could not assign property {}: expected {}, got {}",
                id,
                property.value.kind(),
                value.kind()
            );
            return Err(RunebookError::InvalidConfig(format!(
                "property {} expects {}, got {}",
                id,
                property.value.kind(),
                value.kind()
            )));
        }

        property.value = value;
        Ok(())
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        match self.get(id).map(|p| &p.value) {
            Some(PropertyValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn list(&self, id: &str) -> Option<&[String]> {
        match self.get(id).map(|p| &p.value) {
            Some(PropertyValue::List(l)) => Some(l),
            _ => None,
        }
    }

    pub fn deploy_options(&self, id: &str) -> Option<&DeployOptions> {
        match self.get(id).map(|p| &p.value) {
            Some(PropertyValue::Deploy(o)) => Some(o),
            _ => None,
        }
    }

    pub fn remove_options(&self, id: &str) -> Option<&RemoveOptions> {
        match self.get(id).map(|p| &p.value) {
            Some(PropertyValue::Remove(o)) => Some(o),
            _ => None,
        }
    }

    pub fn ps_options(&self, id: &str) -> Option<&PsOptions> {
        match self.get(id).map(|p| &p.value) {
            Some(PropertyValue::Ps(o)) => Some(o),
            _ => None,
        }
    }
}
