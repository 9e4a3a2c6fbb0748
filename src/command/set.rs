//! Ordered command sets and scoped merging

use super::command::Command;
use indexmap::IndexMap;

/// Commands keyed by id, in listing order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandSet {
    commands: IndexMap<String, Command>,
}

impl CommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a command under its id
    pub fn insert(&mut self, command: Command) {
        self.commands.insert(command.id().to_string(), command);
    }

    pub fn get(&self, id: &str) -> Option<&Command> {
        self.commands.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Command> {
        self.commands.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.commands.contains_key(id)
    }

    /// Command ids in order
    pub fn ids(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Merge a lower priority set into this one.
    ///
    /// Only ids not already present are taken; they are appended in the
    /// order `other` lists them.
    pub fn merge(&mut self, other: CommandSet) {
        for (id, command) in other.commands {
            if !self.commands.contains_key(&id) {
                self.commands.insert(id, command);
            }
        }
    }

    /// Merge sets given in priority order, highest first
    pub fn merge_all(sets: impl IntoIterator<Item = CommandSet>) -> CommandSet {
        let mut merged = CommandSet::new();
        for set in sets {
            merged.merge(set);
        }
        merged
    }
}
