//! Reconciliation planning: compute the command batch for bind, rebind and removal
//!
//! Planning is pure with respect to the live tree. Each plan works on a staged
//! copy of the element and returns the complete batch, so a failure part-way
//! through leaves nothing half-applied.
//!
//! The rule that protects user data: a live value is only ever overwritten or
//! removed when it still equals the value the previous template declared.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::binding::{BindingRegistry, BindingResolver};
use crate::error::ReconcileError;
use crate::template::{reduce, Binding, PropertyDescriptor, Template, TemplateKey};
use crate::tree::{Change, CommandBatch, Element};
use crate::value::{is_empty_value, same_value, Value};

use super::order::restore_order;
use super::staging::Staging;

/// Computes command batches against one binding registry
#[derive(Debug, Clone, Copy)]
pub struct Planner<'r> {
    registry: &'r BindingRegistry,
    stamp_template: bool,
}

impl<'r> Planner<'r> {
    pub fn new(registry: &'r BindingRegistry) -> Self {
        Self {
            registry,
            stamp_template: false,
        }
    }

    /// Also mirror the bound template key onto the element
    pub fn with_stamp_template(mut self, stamp: bool) -> Self {
        self.stamp_template = stamp;
        self
    }

    /// First application of a template to an element
    pub fn bind(
        &self,
        element: &Element,
        template: &Template,
    ) -> Result<CommandBatch, ReconcileError> {
        let effective = reduce(template);
        let mut staging = Staging::new(element);

        for descriptor in &effective.properties {
            let resolver = self.registry.resolver(descriptor.binding.kind)?;
            self.materialize(&mut staging, resolver, descriptor)?;
        }

        self.stamp(&mut staging, Some(template.key()))?;
        restore_order(self.registry, &mut staging, &effective)?;
        Ok(staging.into_batch())
    }

    /// Switch an element from `old` to `new`, preserving user edits
    pub fn rebind(
        &self,
        element: &Element,
        old: &Template,
        new: &Template,
    ) -> Result<CommandBatch, ReconcileError> {
        let old_effective = reduce(old);
        let new_effective = reduce(new);
        let mut staging = Staging::new(element);

        let mut previous: HashMap<&Binding, &PropertyDescriptor> = HashMap::new();
        for descriptor in &old_effective.properties {
            previous.entry(&descriptor.binding).or_insert(descriptor);
        }

        for descriptor in &new_effective.properties {
            let resolver = self.registry.resolver(descriptor.binding.kind)?;
            match previous.get(&descriptor.binding) {
                Some(old_descriptor) => {
                    self.carry_over(&mut staging, resolver, old_descriptor, descriptor)?
                }
                None => self.materialize(&mut staging, resolver, descriptor)?,
            }
        }

        let kept: HashSet<&Binding> = new_effective
            .properties
            .iter()
            .map(|d| &d.binding)
            .collect();
        for descriptor in old_effective
            .properties
            .iter()
            .filter(|d| !kept.contains(&d.binding))
        {
            let resolver = self.registry.resolver(descriptor.binding.kind)?;
            self.retire(&mut staging, resolver, descriptor)?;
        }

        self.stamp(&mut staging, Some(new.key()))?;
        restore_order(self.registry, &mut staging, &new_effective)?;
        Ok(staging.into_batch())
    }

    /// Remove every slot the effective template binds, edited or not
    pub fn remove(
        &self,
        element: &Element,
        template: &Template,
    ) -> Result<CommandBatch, ReconcileError> {
        let effective = reduce(template);
        let mut staging = Staging::new(element);

        for descriptor in &effective.properties {
            let resolver = self.registry.resolver(descriptor.binding.kind)?;
            if resolver.locate(staging.element(), &descriptor.binding).is_some() {
                self.remove_slot(&mut staging, resolver, &descriptor.binding)?;
            }
        }

        self.stamp(&mut staging, None)?;
        Ok(staging.into_batch())
    }

    /// Clear the template stamp only
    pub fn unlink(&self, element: &Element) -> Result<CommandBatch, ReconcileError> {
        let mut staging = Staging::new(element);
        self.stamp(&mut staging, None)?;
        Ok(staging.into_batch())
    }

    /// Create the slot for a descriptor that had no previous counterpart.
    ///
    /// A pre-existing hand-authored slot with the same identity is reused; its
    /// value is only filled in when it is empty.
    fn materialize(
        &self,
        staging: &mut Staging,
        resolver: &dyn BindingResolver,
        descriptor: &PropertyDescriptor,
    ) -> Result<(), ReconcileError> {
        if !descriptor.should_materialize() {
            return Ok(());
        }

        let binding = &descriptor.binding;
        let value = descriptor.materialized_value();
        let changes = match resolver.locate(staging.element(), binding) {
            None => {
                debug!(%binding, value = %value, "materializing");
                resolver.create(staging.element(), binding, &value)
            }
            Some(live) if is_empty_value(live.value.as_ref()) && !value.is_empty() => {
                debug!(%binding, value = %value, "filling empty hand-authored slot");
                resolver.write(staging.element(), binding, &value)
            }
            Some(_) => {
                debug!(%binding, "keeping hand-authored value");
                Vec::new()
            }
        };
        staging.extend(changes)?;
        Ok(())
    }

    /// Reconcile a binding present in both the old and the new template
    fn carry_over(
        &self,
        staging: &mut Staging,
        resolver: &dyn BindingResolver,
        old: &PropertyDescriptor,
        new: &PropertyDescriptor,
    ) -> Result<(), ReconcileError> {
        let binding = &new.binding;
        let Some(live) = resolver.locate(staging.element(), binding) else {
            if new.should_materialize() {
                let value = new.materialized_value();
                debug!(%binding, value = %value, "materializing missing slot");
                let changes = resolver.create(staging.element(), binding, &value);
                staging.extend(changes)?;
            }
            return Ok(());
        };

        if !same_value(live.value.as_ref(), old.value.as_ref()) {
            debug!(%binding, "preserving user-edited value");
            return Ok(());
        }

        if new.should_materialize() {
            let value = new.materialized_value();
            if !same_value(live.value.as_ref(), Some(&value)) {
                debug!(%binding, value = %value, "overwriting untouched value");
                let changes = resolver.write(staging.element(), binding, &value);
                staging.extend(changes)?;
            }
        } else {
            debug!(%binding, "removing untouched value of now-empty optional property");
            self.remove_slot(staging, resolver, binding)?;
        }
        Ok(())
    }

    /// Handle a binding that only the old template declared
    fn retire(
        &self,
        staging: &mut Staging,
        resolver: &dyn BindingResolver,
        old: &PropertyDescriptor,
    ) -> Result<(), ReconcileError> {
        let binding = &old.binding;
        match resolver.locate(staging.element(), binding) {
            Some(live) if same_value(live.value.as_ref(), old.value.as_ref()) => {
                debug!(%binding, "removing untouched value");
                self.remove_slot(staging, resolver, binding)
            }
            Some(_) => {
                debug!(%binding, "leaving user-edited value in place");
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn remove_slot(
        &self,
        staging: &mut Staging,
        resolver: &dyn BindingResolver,
        binding: &Binding,
    ) -> Result<(), ReconcileError> {
        let changes = resolver.remove(staging.element(), binding);
        staging.extend(changes)?;
        if let Some(container_type) = resolver.container_type() {
            staging.prune_container(container_type)?;
        }
        Ok(())
    }

    /// Write (or with `None`, clear) the template stamp when enabled
    fn stamp(&self, staging: &mut Staging, key: Option<TemplateKey>) -> Result<(), ReconcileError> {
        if !self.stamp_template {
            return Ok(());
        }

        let flavor = self.registry.flavor();
        let id = key.as_ref().map(|k| Value::from(k.id.clone()));
        let version = key
            .as_ref()
            .and_then(|k| k.version)
            .map(|v| Value::Number(f64::from(v)));

        for (name, value) in [
            (flavor.template_attribute(), id),
            (flavor.version_attribute(), version),
        ] {
            if staging.element().attribute(&name) != value.as_ref() {
                staging.push(Change::SetAttribute { name, value })?;
            }
        }
        Ok(())
    }
}
