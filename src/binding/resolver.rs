//! Resolvers: locate, create, write and remove one bound value in an element

use std::fmt;

use crate::template::Binding;
use crate::tree::{Change, Element, Entry, EntryKey};
use crate::value::Value;

/// The live state found at a binding's location
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    /// The template-controlled value; `None` when the slot exists but is unset
    pub value: Option<Value>,
}

/// Operations one binding shape supports against an element.
///
/// Resolvers never mutate; they describe mutations as [`Change`]s computed
/// against the element as it currently stands.
pub trait BindingResolver: fmt::Debug {
    /// Find the live slot for the binding, if any
    fn locate(&self, element: &Element, binding: &Binding) -> Option<Located>;

    /// Materialize a new slot holding `value`
    fn create(&self, element: &Element, binding: &Binding, value: &Value) -> Vec<Change>;

    /// Overwrite the value of an existing slot; identity fields are left alone
    fn write(&self, element: &Element, binding: &Binding, value: &Value) -> Vec<Change>;

    /// Remove the slot
    fn remove(&self, element: &Element, binding: &Binding) -> Vec<Change>;

    /// Extension container this resolver writes into, if any
    fn container_type(&self) -> Option<&str> {
        None
    }

    /// Collection layout, for resolvers that manage ordered entries
    fn collection(&self) -> Option<&CollectionLayout> {
        None
    }
}

fn non_empty(value: &Value) -> Option<Value> {
    if value.is_empty() {
        None
    } else {
        Some(value.clone())
    }
}

/// Direct attribute on the element itself
#[derive(Debug, Clone, Default)]
pub struct AttributeResolver;

impl BindingResolver for AttributeResolver {
    fn locate(&self, element: &Element, binding: &Binding) -> Option<Located> {
        element.attribute(&binding.name).map(|v| Located {
            value: Some(v.clone()),
        })
    }

    fn create(&self, element: &Element, binding: &Binding, value: &Value) -> Vec<Change> {
        self.write(element, binding, value)
    }

    fn write(&self, _element: &Element, binding: &Binding, value: &Value) -> Vec<Change> {
        vec![Change::SetAttribute {
            name: binding.name.clone(),
            value: Some(value.clone()),
        }]
    }

    fn remove(&self, _element: &Element, binding: &Binding) -> Vec<Change> {
        vec![Change::SetAttribute {
            name: binding.name.clone(),
            value: None,
        }]
    }
}

/// Scalar field inside a singleton container; the binding name is the field
#[derive(Debug, Clone)]
pub struct ScalarResolver {
    container_type: String,
}

impl ScalarResolver {
    pub fn new(container_type: impl Into<String>) -> Self {
        Self {
            container_type: container_type.into(),
        }
    }
}

impl BindingResolver for ScalarResolver {
    fn locate(&self, element: &Element, binding: &Binding) -> Option<Located> {
        element
            .container(&self.container_type)
            .and_then(|c| c.field(&binding.name))
            .map(|v| Located {
                value: Some(v.clone()),
            })
    }

    fn create(&self, element: &Element, binding: &Binding, value: &Value) -> Vec<Change> {
        let mut changes = Vec::new();
        if element.container(&self.container_type).is_none() {
            changes.push(Change::EnsureContainer {
                container: self.container_type.clone(),
            });
        }
        changes.extend(self.write(element, binding, value));
        changes
    }

    fn write(&self, _element: &Element, binding: &Binding, value: &Value) -> Vec<Change> {
        vec![Change::SetField {
            container: self.container_type.clone(),
            field: binding.name.clone(),
            value: Some(value.clone()),
        }]
    }

    fn remove(&self, _element: &Element, binding: &Binding) -> Vec<Change> {
        vec![Change::SetField {
            container: self.container_type.clone(),
            field: binding.name.clone(),
            value: None,
        }]
    }

    fn container_type(&self) -> Option<&str> {
        Some(&self.container_type)
    }
}

/// Where the entries of one collection kind live and how they are keyed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionLayout {
    pub container_type: String,
    pub entry_type: String,
    /// Field matched against the binding name
    pub identity_field: String,
    /// Field holding the template-controlled value
    pub value_field: String,
}

impl CollectionLayout {
    pub fn new(
        container_type: impl Into<String>,
        entry_type: impl Into<String>,
        identity_field: impl Into<String>,
        value_field: impl Into<String>,
    ) -> Self {
        Self {
            container_type: container_type.into(),
            entry_type: entry_type.into(),
            identity_field: identity_field.into(),
            value_field: value_field.into(),
        }
    }

    pub fn key(&self, binding: &Binding) -> EntryKey {
        EntryKey::new(self.identity_field.clone(), binding.name.clone())
    }

    /// Identity of an entry under this layout, if it has a string identity
    pub fn identity_of<'e>(&self, entry: &'e Entry) -> Option<&'e str> {
        entry.get(&self.identity_field).and_then(Value::as_str)
    }
}

/// Identity-keyed entry in an ordered collection
#[derive(Debug, Clone)]
pub struct CollectionResolver {
    layout: CollectionLayout,
}

impl CollectionResolver {
    pub fn new(layout: CollectionLayout) -> Self {
        Self { layout }
    }
}

impl BindingResolver for CollectionResolver {
    fn locate(&self, element: &Element, binding: &Binding) -> Option<Located> {
        let key = self.layout.key(binding);
        element
            .entries(&self.layout.container_type, &self.layout.entry_type)
            .iter()
            .find(|e| e.matches(&key))
            .map(|e| Located {
                value: e.get(&self.layout.value_field).cloned(),
            })
    }

    fn create(&self, element: &Element, binding: &Binding, value: &Value) -> Vec<Change> {
        let mut changes = Vec::new();
        if element.container(&self.layout.container_type).is_none() {
            changes.push(Change::EnsureContainer {
                container: self.layout.container_type.clone(),
            });
        }

        let mut entry = Entry::new().with(self.layout.identity_field.clone(), binding.name.clone());
        if let Some(value) = non_empty(value) {
            entry = entry.with(self.layout.value_field.clone(), value);
        }
        changes.push(Change::AppendEntry {
            container: self.layout.container_type.clone(),
            entry_type: self.layout.entry_type.clone(),
            entry,
        });
        changes
    }

    fn write(&self, _element: &Element, binding: &Binding, value: &Value) -> Vec<Change> {
        vec![Change::SetEntryField {
            container: self.layout.container_type.clone(),
            entry_type: self.layout.entry_type.clone(),
            key: self.layout.key(binding),
            field: self.layout.value_field.clone(),
            value: non_empty(value),
        }]
    }

    fn remove(&self, _element: &Element, binding: &Binding) -> Vec<Change> {
        vec![Change::RemoveEntry {
            container: self.layout.container_type.clone(),
            entry_type: self.layout.entry_type.clone(),
            key: self.layout.key(binding),
        }]
    }

    fn container_type(&self) -> Option<&str> {
        Some(&self.layout.container_type)
    }

    fn collection(&self) -> Option<&CollectionLayout> {
        Some(&self.layout)
    }
}
