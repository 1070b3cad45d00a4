//! Binding registry: per-flavor table from binding kind to resolver

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::ReconcileError;
use crate::template::BindingKind;

use super::resolver::{
    AttributeResolver, BindingResolver, CollectionLayout, CollectionResolver, ScalarResolver,
};

/// Target schema flavor. Only the resolver table differs between flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    #[default]
    Zeebe,
    Camunda,
}

impl Flavor {
    /// Namespace prefix of flavor-specific attributes
    pub fn prefix(&self) -> &'static str {
        match self {
            Flavor::Zeebe => "zeebe",
            Flavor::Camunda => "camunda",
        }
    }

    /// Attribute recording the applied template id
    pub fn template_attribute(&self) -> String {
        format!("{}:modelerTemplate", self.prefix())
    }

    /// Attribute recording the applied template version
    pub fn version_attribute(&self) -> String {
        format!("{}:modelerTemplateVersion", self.prefix())
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Table mapping each supported binding kind to its resolver
#[derive(Debug)]
pub struct BindingRegistry {
    flavor: Flavor,
    resolvers: BTreeMap<BindingKind, Box<dyn BindingResolver>>,
}

impl BindingRegistry {
    /// Create an empty registry
    pub fn new(flavor: Flavor) -> Self {
        Self {
            flavor,
            resolvers: BTreeMap::new(),
        }
    }

    /// Built-in table for a flavor
    pub fn for_flavor(flavor: Flavor) -> Self {
        match flavor {
            Flavor::Zeebe => Self::zeebe(),
            Flavor::Camunda => Self::camunda(),
        }
    }

    /// Camunda 8 (zeebe) table
    pub fn zeebe() -> Self {
        Self::new(Flavor::Zeebe)
            .with(BindingKind::Property, AttributeResolver)
            .with(
                BindingKind::TaskDefinition,
                ScalarResolver::new("zeebe:TaskDefinition"),
            )
            .with_collection(
                BindingKind::Input,
                CollectionLayout::new("zeebe:IoMapping", "zeebe:Input", "target", "source"),
            )
            .with_collection(
                BindingKind::Output,
                CollectionLayout::new("zeebe:IoMapping", "zeebe:Output", "source", "target"),
            )
            .with_collection(
                BindingKind::Header,
                CollectionLayout::new("zeebe:TaskHeaders", "zeebe:Header", "key", "value"),
            )
            .with_collection(
                BindingKind::CustomProperty,
                CollectionLayout::new("zeebe:Properties", "zeebe:Property", "name", "value"),
            )
    }

    /// Camunda 7 table
    pub fn camunda() -> Self {
        Self::new(Flavor::Camunda)
            .with(BindingKind::Property, AttributeResolver)
            .with_collection(
                BindingKind::Input,
                CollectionLayout::new(
                    "camunda:InputOutput",
                    "camunda:InputParameter",
                    "name",
                    "value",
                ),
            )
            .with_collection(
                BindingKind::Output,
                CollectionLayout::new(
                    "camunda:InputOutput",
                    "camunda:OutputParameter",
                    "value",
                    "name",
                ),
            )
            .with_collection(
                BindingKind::CustomProperty,
                CollectionLayout::new("camunda:Properties", "camunda:Property", "name", "value"),
            )
            .with_collection(
                BindingKind::ErrorBinding,
                CollectionLayout::new(
                    "camunda:ErrorEventDefinitions",
                    "camunda:ErrorEventDefinition",
                    "errorRef",
                    "expression",
                ),
            )
    }

    /// Register (or replace) the resolver for a kind
    pub fn with(mut self, kind: BindingKind, resolver: impl BindingResolver + 'static) -> Self {
        self.resolvers.insert(kind, Box::new(resolver));
        self
    }

    /// Register a collection resolver for a kind
    pub fn with_collection(self, kind: BindingKind, layout: CollectionLayout) -> Self {
        self.with(kind, CollectionResolver::new(layout))
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// Resolver for a kind. A missing entry means the template and the engine
    /// disagree about the schema, which is never recoverable.
    pub fn resolver(&self, kind: BindingKind) -> Result<&dyn BindingResolver, ReconcileError> {
        match self.resolvers.get(&kind) {
            Some(resolver) => Ok(resolver.as_ref()),
            None => {
                error!(%kind, flavor = %self.flavor, "no resolver registered for binding kind");
                Err(ReconcileError::UnknownBindingKind {
                    kind,
                    flavor: self.flavor,
                })
            }
        }
    }

    /// Kinds this registry can resolve
    pub fn kinds(&self) -> impl Iterator<Item = BindingKind> + '_ {
        self.resolvers.keys().copied()
    }
}
