//! Template data model: templates, property descriptors, bindings and conditions

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{is_empty_value, Value};

/// Identity of a template: `(id, version)`.
///
/// A `None` version is its own slot, distinct from every numbered version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateKey {
    pub id: String,
    pub version: Option<u32>,
}

impl TemplateKey {
    pub fn new(id: impl Into<String>, version: Option<u32>) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            Some(v) => write!(f, "{}@{}", self.id, v),
            None => write!(f, "{}", self.id),
        }
    }
}

/// A versioned bundle of property descriptors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Element types this template may decorate; empty means any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applies_to: Vec<String>,
    #[serde(default)]
    pub properties: Vec<PropertyDescriptor>,
}

impl Template {
    pub fn new(id: impl Into<String>, version: Option<u32>) -> Self {
        Self {
            id: id.into(),
            version,
            name: None,
            applies_to: Vec::new(),
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_applies_to(mut self, element_type: impl Into<String>) -> Self {
        self.applies_to.push(element_type.into());
        self
    }

    pub fn key(&self) -> TemplateKey {
        TemplateKey::new(self.id.clone(), self.version)
    }

    /// Check whether this template may decorate an element of the given type
    pub fn applies_to_type(&self, element_type: &str) -> bool {
        self.applies_to.is_empty() || self.applies_to.iter().any(|t| t == element_type)
    }

    /// Find a descriptor by id (first match wins)
    pub fn property(&self, id: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.id == id)
    }

    /// Find the descriptor bound to a given location (first match wins)
    pub fn property_for(&self, binding: &Binding) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| &p.binding == binding)
    }
}

/// One template property and where it lands in the tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub id: String,
    pub binding: Binding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl PropertyDescriptor {
    pub fn new(id: impl Into<String>, binding: Binding) -> Self {
        Self {
            id: id.into(),
            binding,
            value: None,
            optional: false,
            condition: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// A descriptor gets a tree entry when it has a value or is not optional
    pub fn should_materialize(&self) -> bool {
        !is_empty_value(self.value.as_ref()) || !self.optional
    }

    /// The value written when materializing; absent defaults to the empty string
    pub fn materialized_value(&self) -> Value {
        self.value.clone().unwrap_or_else(Value::empty)
    }
}

/// Binding kind tags. Each flavor maps a subset of these onto resolvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BindingKind {
    Property,
    TaskDefinition,
    Input,
    Output,
    Header,
    CustomProperty,
    ErrorBinding,
}

impl BindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingKind::Property => "property",
            BindingKind::TaskDefinition => "taskDefinition",
            BindingKind::Input => "input",
            BindingKind::Output => "output",
            BindingKind::Header => "header",
            BindingKind::CustomProperty => "customProperty",
            BindingKind::ErrorBinding => "errorBinding",
        }
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a property lands: a kind tag plus the name that keys it.
///
/// For collection kinds `name` is the identity value of the entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binding {
    #[serde(rename = "type")]
    pub kind: BindingKind,
    pub name: String,
}

impl Binding {
    pub fn new(kind: BindingKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn property(name: impl Into<String>) -> Self {
        Self::new(BindingKind::Property, name)
    }

    pub fn task_definition(field: impl Into<String>) -> Self {
        Self::new(BindingKind::TaskDefinition, field)
    }

    pub fn input(target: impl Into<String>) -> Self {
        Self::new(BindingKind::Input, target)
    }

    pub fn output(source: impl Into<String>) -> Self {
        Self::new(BindingKind::Output, source)
    }

    pub fn header(key: impl Into<String>) -> Self {
        Self::new(BindingKind::Header, key)
    }

    pub fn custom_property(name: impl Into<String>) -> Self {
        Self::new(BindingKind::CustomProperty, name)
    }

    pub fn error_binding(error_ref: impl Into<String>) -> Self {
        Self::new(BindingKind::ErrorBinding, error_ref)
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// Activation rule for a descriptor, evaluated against sibling descriptors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    AllMatch {
        #[serde(rename = "allMatch")]
        all_match: Vec<Condition>,
    },
    Equals {
        property: String,
        equals: Value,
    },
    OneOf {
        property: String,
        #[serde(rename = "oneOf")]
        one_of: Vec<Value>,
    },
    IsActive {
        property: String,
        #[serde(rename = "isActive")]
        is_active: bool,
    },
}

impl Condition {
    pub fn equals(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Equals {
            property: property.into(),
            equals: value.into(),
        }
    }

    pub fn one_of<V: Into<Value>>(
        property: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Condition::OneOf {
            property: property.into(),
            one_of: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_active(property: impl Into<String>, active: bool) -> Self {
        Condition::IsActive {
            property: property.into(),
            is_active: active,
        }
    }

    pub fn all_match(conditions: Vec<Condition>) -> Self {
        Condition::AllMatch {
            all_match: conditions,
        }
    }
}
