//! Document tree nodes: elements, extension containers and collection entries

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

use super::command::{Change, EntryKey};
use super::TreeError;

/// One entry inside an identity-keyed collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entry {
    pub fields: BTreeMap<String, Value>,
}

impl Entry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Whether this entry's identity field matches the key
    pub fn matches(&self, key: &EntryKey) -> bool {
        self.get(&key.field) == Some(&key.value)
    }

    fn set(&mut self, field: &str, value: Option<&Value>) {
        match value {
            Some(v) => {
                self.fields.insert(field.to_string(), v.clone());
            }
            None => {
                self.fields.remove(field);
            }
        }
    }
}

/// Singleton extension container of one type on an element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    /// Scalar fields
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Value>,
    /// Ordered entry lists keyed by entry type
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub collections: BTreeMap<String, Vec<Entry>>,
}

impl Container {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Entries of one type, in document order
    pub fn entries(&self, entry_type: &str) -> &[Entry] {
        self.collections
            .get(entry_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// A container with no fields and no entries is garbage
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.collections.values().all(Vec::is_empty)
    }
}

/// A diagram element decorated by templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: String,
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub containers: BTreeMap<String, Container>,
}

impl Element {
    pub fn new(id: impl Into<String>, element_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            element_type: element_type.into(),
            attributes: BTreeMap::new(),
            containers: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Add an entry, creating the container if needed
    pub fn with_entry(
        mut self,
        container_type: impl Into<String>,
        entry_type: impl Into<String>,
        entry: Entry,
    ) -> Self {
        self.containers
            .entry(container_type.into())
            .or_default()
            .collections
            .entry(entry_type.into())
            .or_default()
            .push(entry);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn container(&self, container_type: &str) -> Option<&Container> {
        self.containers.get(container_type)
    }

    /// Entries of one type inside a container; empty if either is missing
    pub fn entries(&self, container_type: &str, entry_type: &str) -> &[Entry] {
        self.container(container_type)
            .map(|c| c.entries(entry_type))
            .unwrap_or(&[])
    }

    /// Apply a single change to this element
    pub fn apply(&mut self, change: &Change) -> Result<(), TreeError> {
        match change {
            Change::SetAttribute { name, value } => {
                match value {
                    Some(v) => {
                        self.attributes.insert(name.clone(), v.clone());
                    }
                    None => {
                        self.attributes.remove(name);
                    }
                }
                Ok(())
            }
            Change::EnsureContainer { container } => {
                self.containers.entry(container.clone()).or_default();
                Ok(())
            }
            Change::RemoveContainer { container } => {
                self.containers
                    .remove(container)
                    .map(|_| ())
                    .ok_or_else(|| self.missing_container(container))
            }
            Change::SetField {
                container,
                field,
                value,
            } => {
                let target = self.container_mut(container)?;
                match value {
                    Some(v) => {
                        target.fields.insert(field.clone(), v.clone());
                    }
                    None => {
                        target.fields.remove(field);
                    }
                }
                Ok(())
            }
            Change::AppendEntry {
                container,
                entry_type,
                entry,
            } => {
                self.container_mut(container)?
                    .collections
                    .entry(entry_type.clone())
                    .or_default()
                    .push(entry.clone());
                Ok(())
            }
            Change::SetEntryField {
                container,
                entry_type,
                key,
                field,
                value,
            } => {
                let element = self.id.clone();
                let target = self
                    .container_mut(container)?
                    .collections
                    .get_mut(entry_type)
                    .and_then(|entries| entries.iter_mut().find(|e| e.matches(key)))
                    .ok_or_else(|| TreeError::MissingEntry {
                        element,
                        container: container.clone(),
                        entry_type: entry_type.clone(),
                        key: key.to_string(),
                    })?;
                target.set(field, value.as_ref());
                Ok(())
            }
            Change::RemoveEntry {
                container,
                entry_type,
                key,
            } => {
                let element = self.id.clone();
                let target = self.container_mut(container)?;
                let removed = match target.collections.get_mut(entry_type) {
                    Some(entries) => match entries.iter().position(|e| e.matches(key)) {
                        Some(index) => {
                            entries.remove(index);
                            true
                        }
                        None => false,
                    },
                    None => false,
                };
                if !removed {
                    return Err(TreeError::MissingEntry {
                        element,
                        container: container.clone(),
                        entry_type: entry_type.clone(),
                        key: key.to_string(),
                    });
                }
                if target.collections.get(entry_type).is_some_and(Vec::is_empty) {
                    target.collections.remove(entry_type);
                }
                Ok(())
            }
            Change::ReplaceEntries {
                container,
                entry_type,
                entries,
            } => {
                let target = self.container_mut(container)?;
                if entries.is_empty() {
                    target.collections.remove(entry_type);
                } else {
                    target
                        .collections
                        .insert(entry_type.clone(), entries.clone());
                }
                Ok(())
            }
        }
    }

    fn container_mut(&mut self, container_type: &str) -> Result<&mut Container, TreeError> {
        let element = self.id.clone();
        self.containers
            .get_mut(container_type)
            .ok_or_else(|| TreeError::MissingContainer {
                element,
                container: container_type.to_string(),
            })
    }

    fn missing_container(&self, container_type: &str) -> TreeError {
        TreeError::MissingContainer {
            element: self.id.clone(),
            container: container_type.to_string(),
        }
    }
}
