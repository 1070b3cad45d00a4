//! Private working copy of an element that records every change made to it

use crate::tree::{Change, CommandBatch, Element, TreeError};

/// Changes are applied to the copy as they are prepared, so later planning
/// steps see earlier ones. The live tree is untouched until the batch executes.
#[derive(Debug)]
pub(crate) struct Staging {
    element: Element,
    changes: Vec<Change>,
}

impl Staging {
    pub(crate) fn new(element: &Element) -> Self {
        Self {
            element: element.clone(),
            changes: Vec::new(),
        }
    }

    pub(crate) fn element(&self) -> &Element {
        &self.element
    }

    pub(crate) fn push(&mut self, change: Change) -> Result<(), TreeError> {
        self.element.apply(&change)?;
        self.changes.push(change);
        Ok(())
    }

    pub(crate) fn extend(&mut self, changes: Vec<Change>) -> Result<(), TreeError> {
        for change in changes {
            self.push(change)?;
        }
        Ok(())
    }

    /// Drop a container that ended up with no fields and no entries
    pub(crate) fn prune_container(&mut self, container_type: &str) -> Result<(), TreeError> {
        let empty = self
            .element
            .container(container_type)
            .is_some_and(|c| c.is_empty());
        if empty {
            self.push(Change::RemoveContainer {
                container: container_type.to_string(),
            })?;
        }
        Ok(())
    }

    pub(crate) fn into_batch(self) -> CommandBatch {
        CommandBatch::for_element(&self.element.id, self.changes)
    }
}
