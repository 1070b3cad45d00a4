//! Condition evaluation and template reduction
//!
//! Conditions are evaluated against the *declared* values of sibling descriptors,
//! never against the live tree, so a template can be reduced before any mutation.
//! A descriptor that is itself inactive contributes no value to the conditions
//! that reference it.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use tracing::warn;

use crate::value::Value;

use super::types::{Condition, PropertyDescriptor, Template};

/// Resolves the declared value of a descriptor
pub fn declared_value(descriptor: &PropertyDescriptor) -> Option<Value> {
    descriptor.value.clone()
}

/// Evaluates descriptor conditions over one template's property list
///
/// Activity of referenced siblings is cached for the evaluator's lifetime, so
/// reducing a template visits each dependency once.
pub struct ConditionEvaluator<'a, F> {
    properties: &'a [PropertyDescriptor],
    value_of: F,
    resolved: RefCell<HashMap<&'a str, bool>>,
    cycles: Cell<usize>,
}

impl<'a> ConditionEvaluator<'a, fn(&PropertyDescriptor) -> Option<Value>> {
    /// Evaluator reading declared template values
    pub fn declared(properties: &'a [PropertyDescriptor]) -> Self {
        Self::new(properties, declared_value)
    }
}

impl<'a, F> ConditionEvaluator<'a, F>
where
    F: Fn(&PropertyDescriptor) -> Option<Value>,
{
    pub fn new(properties: &'a [PropertyDescriptor], value_of: F) -> Self {
        Self {
            properties,
            value_of,
            resolved: RefCell::new(HashMap::new()),
            cycles: Cell::new(0),
        }
    }

    /// Whether `descriptor` is active. No condition means always active.
    pub fn is_active(&self, descriptor: &PropertyDescriptor) -> bool {
        let mut visiting = Vec::new();
        self.descriptor_active(descriptor, &mut visiting)
    }

    fn descriptor_active(
        &self,
        descriptor: &PropertyDescriptor,
        visiting: &mut Vec<String>,
    ) -> bool {
        let Some(condition) = &descriptor.condition else {
            return true;
        };

        if visiting.iter().any(|id| id == &descriptor.id) {
            self.cycles.set(self.cycles.get() + 1);
            warn!(property = %descriptor.id, "condition cycle detected, treating as inactive");
            return false;
        }

        visiting.push(descriptor.id.clone());
        let met = self.condition_met(condition, visiting);
        visiting.pop();
        met
    }

    fn condition_met(&self, condition: &Condition, visiting: &mut Vec<String>) -> bool {
        match condition {
            Condition::AllMatch { all_match } => {
                all_match.iter().all(|c| self.condition_met(c, visiting))
            }
            Condition::Equals { property, equals } => self
                .referenced(property, visiting)
                .is_some_and(|value| value.as_ref() == Some(equals)),
            Condition::OneOf { property, one_of } => self
                .referenced(property, visiting)
                .flatten()
                .is_some_and(|value| one_of.contains(&value)),
            Condition::IsActive {
                property,
                is_active,
            } => match self.lookup(property) {
                Some(target) => self.target_active(target, visiting) == *is_active,
                None => false,
            },
        }
    }

    /// Activity of a sibling from the property list, memoized unless the
    /// walk ran into a cycle (those results depend on where the walk started)
    fn target_active(
        &self,
        target: &'a PropertyDescriptor,
        visiting: &mut Vec<String>,
    ) -> bool {
        let cached = self.resolved.borrow().get(target.id.as_str()).copied();
        if let Some(active) = cached {
            return active;
        }

        let cycles = self.cycles.get();
        let active = self.descriptor_active(target, visiting);
        if self.cycles.get() == cycles {
            self.resolved.borrow_mut().insert(target.id.as_str(), active);
        }
        active
    }

    /// Value of the referenced sibling. `None` for a dangling reference,
    /// `Some(None)` when the sibling is inactive or has no value.
    fn referenced(&self, property: &str, visiting: &mut Vec<String>) -> Option<Option<Value>> {
        let target = self.lookup(property)?;
        if self.target_active(target, visiting) {
            Some((self.value_of)(target))
        } else {
            Some(None)
        }
    }

    fn lookup(&self, property: &str) -> Option<&'a PropertyDescriptor> {
        let found = self.properties.iter().find(|p| p.id == property);
        if found.is_none() {
            warn!(property, "condition references unknown property, treating as not met");
        }
        found
    }
}

/// Evaluate a single descriptor's condition against its siblings' declared values
pub fn is_active(descriptor: &PropertyDescriptor, all: &[PropertyDescriptor]) -> bool {
    ConditionEvaluator::declared(all).is_active(descriptor)
}

/// Reduce a template to its effective properties using declared values
pub fn reduce(template: &Template) -> Template {
    reduce_with(template, declared_value)
}

/// Reduce a template to its effective properties, preserving declaration order
pub fn reduce_with<F>(template: &Template, value_of: F) -> Template
where
    F: Fn(&PropertyDescriptor) -> Option<Value>,
{
    let evaluator = ConditionEvaluator::new(&template.properties, value_of);
    let properties = template
        .properties
        .iter()
        .filter(|p| evaluator.is_active(p))
        .cloned()
        .collect();

    Template {
        id: template.id.clone(),
        version: template.version,
        name: template.name.clone(),
        applies_to: template.applies_to.clone(),
        properties,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::types::Binding;

    fn prop(id: &str, value: &str) -> PropertyDescriptor {
        PropertyDescriptor::new(id, Binding::input(id)).with_value(value)
    }

    fn ids(template: &Template) -> Vec<&str> {
        template.properties.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_no_condition_is_active() {
        let a = prop("a", "1");
        assert!(is_active(&a, std::slice::from_ref(&a)));
    }

    #[test]
    fn test_equals() {
        let b = prop("b", "x");
        let a = prop("a", "1").with_condition(Condition::equals("b", "x"));
        let c = prop("c", "1").with_condition(Condition::equals("b", "y"));
        let all = vec![a.clone(), b, c.clone()];
        assert!(is_active(&a, &all));
        assert!(!is_active(&c, &all));
    }

    #[test]
    fn test_one_of() {
        let b = prop("b", "z");
        let a = prop("a", "1").with_condition(Condition::one_of("b", ["x", "y"]));
        let all = vec![a.clone(), b];
        assert!(!is_active(&a, &all));

        let b = prop("b", "y");
        let all = vec![a.clone(), b];
        assert!(is_active(&a, &all));
    }

    #[test]
    fn test_dangling_reference_fails_closed() {
        let a = prop("a", "1").with_condition(Condition::equals("missing", "x"));
        assert!(!is_active(&a, std::slice::from_ref(&a)));

        let a = prop("a", "1").with_condition(Condition::is_active("missing", false));
        assert!(!is_active(&a, std::slice::from_ref(&a)));
    }

    #[test]
    fn test_inactive_reference_has_no_value() {
        let c = prop("c", "off");
        let b = prop("b", "x").with_condition(Condition::equals("c", "on"));
        let a = prop("a", "1").with_condition(Condition::equals("b", "x"));
        let all = vec![a.clone(), b, c];
        assert!(!is_active(&a, &all));
    }

    #[test]
    fn test_equals_empty_needs_a_value() {
        let b = PropertyDescriptor::new("b", Binding::input("b")).optional();
        let a = prop("a", "1").with_condition(Condition::equals("b", ""));
        let all = vec![a.clone(), b];
        assert!(!is_active(&a, &all));

        let b = prop("b", "");
        let all = vec![a.clone(), b];
        assert!(is_active(&a, &all));
    }

    #[test]
    fn test_inactive_reference_never_matches_empty() {
        let c = prop("c", "off");
        let b = prop("b", "").with_condition(Condition::equals("c", "on"));
        let a = prop("a", "1").with_condition(Condition::equals("b", ""));
        let d = prop("d", "1").with_condition(Condition::one_of("b", ["", "x"]));
        let all = vec![a.clone(), b, c, d.clone()];
        assert!(!is_active(&a, &all));
        assert!(!is_active(&d, &all));
    }

    #[test]
    fn test_diamond_dependencies_reduce() {
        // Each layer references both nodes of the layer below
        let mut template = Template::new("diamond", None)
            .with_property(prop("l0a", "on"))
            .with_property(prop("l0b", "on"));
        for layer in 1..=24 {
            for side in ["a", "b"] {
                let below = layer - 1;
                let condition = Condition::all_match(vec![
                    Condition::equals(format!("l{below}a"), "on"),
                    Condition::equals(format!("l{below}b"), "on"),
                ]);
                let id = format!("l{layer}{side}");
                template = template.with_property(prop(&id, "on").with_condition(condition));
            }
        }

        let reduced = reduce(&template);
        assert_eq!(reduced.properties.len(), template.properties.len());
    }

    #[test]
    fn test_cached_result_ignores_cycle_entry_point() {
        let a = prop("a", "1").with_condition(Condition::is_active("b", false));
        let b = prop("b", "1").with_condition(Condition::is_active("a", false));
        let template = Template::new("t", None)
            .with_property(a)
            .with_property(b)
            .with_property(prop("c", "1").with_condition(Condition::is_active("a", true)));

        let evaluator = ConditionEvaluator::declared(&template.properties);
        let first: Vec<bool> = template
            .properties
            .iter()
            .map(|p| evaluator.is_active(p))
            .collect();
        let fresh: Vec<bool> = template
            .properties
            .iter()
            .map(|p| ConditionEvaluator::declared(&template.properties).is_active(p))
            .collect();
        assert_eq!(first, fresh);
    }

    #[test]
    fn test_is_active_condition() {
        let c = prop("c", "off");
        let b = prop("b", "x").with_condition(Condition::equals("c", "on"));
        let a = prop("a", "1").with_condition(Condition::is_active("b", false));
        let all = vec![a.clone(), b, c];
        assert!(is_active(&a, &all));
    }

    #[test]
    fn test_all_match() {
        let b = prop("b", "x");
        let c = prop("c", "y");
        let a = prop("a", "1").with_condition(Condition::all_match(vec![
            Condition::equals("b", "x"),
            Condition::equals("c", "y"),
        ]));
        let d = prop("d", "1").with_condition(Condition::all_match(vec![
            Condition::equals("b", "x"),
            Condition::equals("c", "nope"),
        ]));
        let all = vec![a.clone(), b, c, d.clone()];
        assert!(is_active(&a, &all));
        assert!(!is_active(&d, &all));
    }

    #[test]
    fn test_cycle_is_inactive() {
        let a = prop("a", "1").with_condition(Condition::equals("b", "1"));
        let b = prop("b", "1").with_condition(Condition::equals("a", "1"));
        let all = vec![a.clone(), b.clone()];
        assert!(!is_active(&a, &all));
        assert!(!is_active(&b, &all));
    }

    #[test]
    fn test_reduce_preserves_order() {
        let template = Template::new("t", None)
            .with_property(prop("first", "1"))
            .with_property(prop("hidden", "1").with_condition(Condition::equals("mode", "b")))
            .with_property(prop("mode", "a"))
            .with_property(prop("shown", "1").with_condition(Condition::equals("mode", "a")));

        let reduced = reduce(&template);
        assert_eq!(ids(&reduced), vec!["first", "mode", "shown"]);
        assert_eq!(reduced.key(), template.key());
    }

    #[test]
    fn test_reduce_with_custom_values() {
        let template = Template::new("t", None)
            .with_property(prop("mode", "a"))
            .with_property(prop("x", "1").with_condition(Condition::equals("mode", "b")));

        let reduced = reduce_with(&template, |p| {
            if p.id == "mode" {
                Some(Value::from("b"))
            } else {
                p.value.clone()
            }
        });
        assert_eq!(ids(&reduced), vec!["mode", "x"]);
    }
}
