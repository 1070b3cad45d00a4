//! In-memory diagram implementing the command execution boundary

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::command::CommandBatch;
use super::element::Element;
use super::{CommandStack, TreeError};

/// Errors that can occur when loading or saving diagrams
#[derive(Error, Debug)]
pub enum DiagramError {
    #[error("Failed to read diagram file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse diagram JSON: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// A flat list of elements plus the log of executed batches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    #[serde(default)]
    elements: Vec<Element>,
    #[serde(skip)]
    history: Vec<CommandBatch>,
}

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a diagram from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, DiagramError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, DiagramError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json(&self) -> Result<String, DiagramError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Batches executed so far, oldest first
    pub fn history(&self) -> &[CommandBatch] {
        &self.history
    }

    /// Mutate an element directly, bypassing the command boundary.
    ///
    /// Models a user edit; callers are expected to follow up with an
    /// external-change notification.
    pub fn edit<F>(&mut self, id: &str, edit: F) -> Result<(), TreeError>
    where
        F: FnOnce(&mut Element),
    {
        let element = self
            .elements
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| TreeError::UnknownElement {
                element: id.to_string(),
            })?;
        edit(element);
        Ok(())
    }
}

impl CommandStack for Diagram {
    fn element(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    fn execute(&mut self, batch: &CommandBatch) -> Result<(), TreeError> {
        // Stage every touched element; commit only if the whole batch applies
        let mut staged: HashMap<&str, Element> = HashMap::new();
        for command in batch {
            let id = command.element.as_str();
            if !staged.contains_key(id) {
                let original = self.element(id).cloned();
                if let Some(original) = original {
                    staged.insert(id, original);
                }
            }
            let element = staged
                .get_mut(id)
                .ok_or_else(|| TreeError::UnknownElement {
                    element: command.element.clone(),
                })?;
            element.apply(&command.change)?;
        }

        let touched = staged.len();
        for element in self.elements.iter_mut() {
            if let Some(updated) = staged.remove(element.id.as_str()) {
                *element = updated;
            }
        }
        self.history.push(batch.clone());
        debug!(commands = batch.len(), elements = touched, "executed command batch");
        Ok(())
    }
}
