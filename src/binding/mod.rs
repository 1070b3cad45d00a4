//! Binding kinds and their resolvers
//!
//! Every [`BindingKind`](crate::template::BindingKind) a flavor supports maps to
//! exactly one [`BindingResolver`]. Three resolver shapes cover all kinds:
//! direct attributes, scalar fields of a singleton container, and
//! identity-keyed entries in an ordered collection.

mod registry;
mod resolver;

pub use registry::{BindingRegistry, Flavor};
pub use resolver::{
    AttributeResolver, BindingResolver, CollectionLayout, CollectionResolver, Located,
    ScalarResolver,
};
