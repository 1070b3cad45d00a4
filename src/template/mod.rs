//! Element templates
//!
//! A template is a versioned, immutable list of property descriptors. Each
//! descriptor names a binding (where its value lands in the document tree), a
//! declared default value, and an optional activation condition.
//!
//! # Example
//!
//! ```json
//! {
//!   "id": "rest-connector",
//!   "version": 2,
//!   "properties": [
//!     { "id": "method", "binding": { "type": "input", "name": "method" }, "value": "GET" },
//!     {
//!       "id": "body",
//!       "binding": { "type": "input", "name": "body" },
//!       "optional": true,
//!       "condition": { "property": "method", "oneOf": ["POST", "PUT"] }
//!     }
//!   ]
//! }
//! ```

mod condition;
mod registry;
mod types;

pub use condition::{declared_value, is_active, reduce, reduce_with, ConditionEvaluator};
pub use registry::{CatalogError, TemplateCatalog};
pub use types::{Binding, BindingKind, Condition, PropertyDescriptor, Template, TemplateKey};
