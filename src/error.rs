//! Error types for reconciliation

use thiserror::Error;

use crate::binding::Flavor;
use crate::template::{BindingKind, TemplateKey};
use crate::tree::TreeError;

/// Errors surfaced by a top-level reconciliation operation.
///
/// Every variant aborts the whole operation; nothing is executed.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The active flavor has no resolver for a binding kind
    #[error("no resolver for binding kind '{kind}' in the {flavor} flavor")]
    UnknownBindingKind { kind: BindingKind, flavor: Flavor },

    /// Element id not present in the tree
    #[error("element not found: {element}")]
    UnknownElement { element: String },

    /// `bind` on an element that already has a template
    #[error("element {element} is already bound to template {bound}")]
    AlreadyBound { element: String, bound: TemplateKey },

    /// `rebind`/`unbind` on an element without a template
    #[error("element {element} has no template bound")]
    NotBound { element: String },

    /// Template `appliesTo` excludes the element type
    #[error("template {template} does not apply to {element_type} element {element}")]
    NotApplicable {
        template: TemplateKey,
        element: String,
        element_type: String,
    },

    /// A mutating operation started while another one is in progress
    #[error("reconciliation already in progress")]
    Reentrant,

    /// The command stack failed to apply the batch
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),
}

impl ReconcileError {
    /// Whether this error indicates an engine/schema mismatch rather than bad input
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::UnknownBindingKind { .. } | Self::Reentrant)
    }
}
