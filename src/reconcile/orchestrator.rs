//! The reconciliation state machine exposed to collaborators
//!
//! Each element is either unbound or bound to exactly one template. Every
//! top-level operation prepares its whole batch first, executes it through the
//! [`CommandStack`] as one step, and only then updates the applied-template record.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::binding::BindingRegistry;
use crate::config::EngineConfig;
use crate::error::ReconcileError;
use crate::template::{reduce, Template, TemplateKey};
use crate::tree::{CommandBatch, CommandStack, Element};

use super::guard::ReentrancyFlag;
use super::order::order_changes;
use super::plan::Planner;

/// Per-element record of the bound template
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedTemplate {
    template: Template,
}

impl AppliedTemplate {
    pub fn new(template: Template) -> Self {
        Self { template }
    }

    pub fn key(&self) -> TemplateKey {
        self.template.key()
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Effective property set as currently reduced
    pub fn effective(&self) -> Template {
        reduce(&self.template)
    }
}

/// How `unbind` treats the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnbindMode {
    /// Forget the template; leave every entry in place
    #[default]
    Unlink,
    /// Also remove every slot the template binds, including user-edited ones
    Remove,
}

/// Notification that the tree changed outside the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalChange {
    pub element: String,
}

impl ExternalChange {
    pub fn new(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
        }
    }
}

/// Binds templates to elements and keeps them reconciled
#[derive(Debug)]
pub struct Reconciler {
    registry: BindingRegistry,
    config: EngineConfig,
    records: HashMap<String, AppliedTemplate>,
    flag: ReentrancyFlag,
}

impl Reconciler {
    /// Create a reconciler using the built-in table for the configured flavor
    pub fn new(config: EngineConfig) -> Self {
        Self::with_registry(BindingRegistry::for_flavor(config.flavor), config)
    }

    /// Create a reconciler with a custom binding registry
    pub fn with_registry(registry: BindingRegistry, config: EngineConfig) -> Self {
        Self {
            registry,
            config,
            records: HashMap::new(),
            flag: ReentrancyFlag::new(),
        }
    }

    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle on the re-entrancy flag, for change listeners sharing this tree
    pub fn flag(&self) -> ReentrancyFlag {
        self.flag.clone()
    }

    /// The template currently bound to an element
    pub fn applied(&self, element: &str) -> Option<&AppliedTemplate> {
        self.records.get(element)
    }

    /// Record an existing binding without touching the tree
    pub fn adopt(&mut self, element: impl Into<String>, template: Template) {
        self.records
            .insert(element.into(), AppliedTemplate::new(template));
    }

    /// Apply a template to an unbound element
    pub fn bind<S: CommandStack>(
        &mut self,
        stack: &mut S,
        element: &str,
        template: &Template,
    ) -> Result<CommandBatch, ReconcileError> {
        let _guard = self.flag.enter().ok_or(ReconcileError::Reentrant)?;

        if let Some(record) = self.records.get(element) {
            return Err(ReconcileError::AlreadyBound {
                element: element.to_string(),
                bound: record.key(),
            });
        }

        let target = lookup(stack, element)?;
        check_applies(template, target)?;
        let batch = self.planner().bind(target, template)?;
        commit(stack, &batch)?;

        info!(element, template = %template.key(), commands = batch.len(), "bound template");
        self.adopt(element, template.clone());
        Ok(batch)
    }

    /// Switch a bound element to another template or version
    pub fn rebind<S: CommandStack>(
        &mut self,
        stack: &mut S,
        element: &str,
        template: &Template,
    ) -> Result<CommandBatch, ReconcileError> {
        let _guard = self.flag.enter().ok_or(ReconcileError::Reentrant)?;

        let old = self
            .records
            .get(element)
            .ok_or_else(|| ReconcileError::NotBound {
                element: element.to_string(),
            })?;

        let target = lookup(stack, element)?;
        check_applies(template, target)?;
        let batch = self.planner().rebind(target, old.template(), template)?;
        commit(stack, &batch)?;

        info!(
            element,
            from = %old.key(),
            to = %template.key(),
            commands = batch.len(),
            "rebound template"
        );
        self.adopt(element, template.clone());
        Ok(batch)
    }

    /// Detach the template from an element
    pub fn unbind<S: CommandStack>(
        &mut self,
        stack: &mut S,
        element: &str,
        mode: UnbindMode,
    ) -> Result<CommandBatch, ReconcileError> {
        let _guard = self.flag.enter().ok_or(ReconcileError::Reentrant)?;

        let record = self
            .records
            .get(element)
            .ok_or_else(|| ReconcileError::NotBound {
                element: element.to_string(),
            })?;

        let target = lookup(stack, element)?;
        let batch = match mode {
            UnbindMode::Unlink => self.planner().unlink(target)?,
            UnbindMode::Remove => self.planner().remove(target, record.template())?,
        };
        commit(stack, &batch)?;

        info!(
            element,
            template = %record.key(),
            ?mode,
            commands = batch.len(),
            "unbound template"
        );
        self.records.remove(element);
        Ok(batch)
    }

    /// React to an edit made outside the engine: restore entry order only.
    ///
    /// Suppressed (empty batch) while a reconciliation holds the flag, so the
    /// engine's own writes never loop back through here.
    pub fn on_external_change<S: CommandStack>(
        &self,
        stack: &mut S,
        event: &ExternalChange,
    ) -> Result<CommandBatch, ReconcileError> {
        let Some(_guard) = self.flag.enter() else {
            debug!(element = %event.element, "external change during reconciliation, ignoring");
            return Ok(CommandBatch::new());
        };

        let Some(record) = self.records.get(&event.element) else {
            return Ok(CommandBatch::new());
        };

        let target = lookup(stack, &event.element)?;
        let changes = order_changes(&self.registry, target, &record.effective())?;
        let batch = CommandBatch::for_element(&event.element, changes);
        commit(stack, &batch)?;

        if !batch.is_empty() {
            info!(element = %event.element, "restored entry order after external change");
        }
        Ok(batch)
    }

    fn planner(&self) -> Planner<'_> {
        Planner::new(&self.registry).with_stamp_template(self.config.stamp_template)
    }
}

fn lookup<'s, S: CommandStack>(
    stack: &'s S,
    element: &str,
) -> Result<&'s Element, ReconcileError> {
    stack
        .element(element)
        .ok_or_else(|| ReconcileError::UnknownElement {
            element: element.to_string(),
        })
}

fn check_applies(template: &Template, element: &Element) -> Result<(), ReconcileError> {
    if template.applies_to_type(&element.element_type) {
        Ok(())
    } else {
        Err(ReconcileError::NotApplicable {
            template: template.key(),
            element: element.id.clone(),
            element_type: element.element_type.clone(),
        })
    }
}

fn commit<S: CommandStack>(stack: &mut S, batch: &CommandBatch) -> Result<(), ReconcileError> {
    if batch.is_empty() {
        return Ok(());
    }
    stack.execute(batch)?;
    Ok(())
}
