//! Target document tree and the command execution boundary
//!
//! The reconciliation engine never mutates the tree directly. It reads elements
//! through [`CommandStack::element`] and hands every mutation of one top-level
//! operation to [`CommandStack::execute`] as a single [`CommandBatch`], so the
//! owner of the stack controls transactionality and undo.

mod command;
mod diagram;
mod element;

pub use command::{Change, Command, CommandBatch, EntryKey};
pub use diagram::{Diagram, DiagramError};
pub use element::{Container, Element, Entry};

use thiserror::Error;

/// Errors raised while applying commands to the tree
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("element not found: {element}")]
    UnknownElement { element: String },

    #[error("container '{container}' not found on element {element}")]
    MissingContainer { element: String, container: String },

    #[error("no {entry_type} entry with {key} in '{container}' on element {element}")]
    MissingEntry {
        element: String,
        container: String,
        entry_type: String,
        key: String,
    },

    /// Raised by command stacks that refuse a batch
    #[error("command batch rejected: {reason}")]
    Rejected { reason: String },
}

/// Owner of the target tree: read access plus atomic batch execution
pub trait CommandStack {
    /// Look up an element by id
    fn element(&self, id: &str) -> Option<&Element>;

    /// Execute every command of the batch, or none of them
    fn execute(&mut self, batch: &CommandBatch) -> Result<(), TreeError>;
}
