//! Tree mutation commands and batches

use std::fmt;

use serde::Serialize;

use crate::value::Value;

use super::element::Entry;

/// Identity of a collection entry: the first entry whose `field` equals `value`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryKey {
    pub field: String,
    pub value: Value,
}

impl EntryKey {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.field, self.value)
    }
}

/// A single field- or list-level mutation on one element
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Change {
    /// Set (or with `None`, clear) a direct attribute
    SetAttribute { name: String, value: Option<Value> },
    /// Create an empty container if absent
    EnsureContainer { container: String },
    RemoveContainer { container: String },
    /// Set (or clear) a scalar field of a container
    SetField {
        container: String,
        field: String,
        value: Option<Value>,
    },
    AppendEntry {
        container: String,
        #[serde(rename = "entryType")]
        entry_type: String,
        entry: Entry,
    },
    SetEntryField {
        container: String,
        #[serde(rename = "entryType")]
        entry_type: String,
        key: EntryKey,
        field: String,
        value: Option<Value>,
    },
    RemoveEntry {
        container: String,
        #[serde(rename = "entryType")]
        entry_type: String,
        key: EntryKey,
    },
    /// Replace a whole entry list (used for reordering only)
    ReplaceEntries {
        container: String,
        #[serde(rename = "entryType")]
        entry_type: String,
        entries: Vec<Entry>,
    },
}

/// A change addressed to one element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    pub element: String,
    pub change: Change,
}

/// All commands of one top-level operation, executed as one atomic step
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CommandBatch {
    commands: Vec<Command>,
}

impl CommandBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a batch from changes that all target one element
    pub fn for_element(element: &str, changes: Vec<Change>) -> Self {
        Self {
            commands: changes
                .into_iter()
                .map(|change| Command {
                    element: element.to_string(),
                    change,
                })
                .collect(),
        }
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }
}

impl<'a> IntoIterator for &'a CommandBatch {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
