//! Order maintenance for identity-keyed collections
//!
//! Engine-managed entries are stable-sorted by the position of their declaring
//! descriptor in the effective template. Entries no descriptor claims keep their
//! relative order after the managed ones. Contents are never altered.

use std::collections::HashMap;

use crate::binding::{BindingRegistry, CollectionLayout};
use crate::error::ReconcileError;
use crate::template::Template;
use crate::tree::{Change, Element};

use super::staging::Staging;

/// Collection identity: (container type, entry type, identity field)
type CollectionId<'a> = (&'a str, &'a str, &'a str);

/// Declared rank of each identity value, per collection
struct Ranking<'a> {
    layouts: Vec<&'a CollectionLayout>,
    ranks: HashMap<CollectionId<'a>, HashMap<&'a str, usize>>,
}

impl<'a> Ranking<'a> {
    fn build(
        registry: &'a BindingRegistry,
        effective: &'a Template,
    ) -> Result<Self, ReconcileError> {
        let mut layouts: Vec<&'a CollectionLayout> = Vec::new();
        let mut ranks: HashMap<CollectionId<'a>, HashMap<&'a str, usize>> = HashMap::new();

        for descriptor in &effective.properties {
            let resolver = registry.resolver(descriptor.binding.kind)?;
            let Some(layout) = resolver.collection() else {
                continue;
            };
            let id = (
                layout.container_type.as_str(),
                layout.entry_type.as_str(),
                layout.identity_field.as_str(),
            );
            let collection = ranks.entry(id).or_insert_with(|| {
                layouts.push(layout);
                HashMap::new()
            });
            let next = collection.len();
            collection
                .entry(descriptor.binding.name.as_str())
                .or_insert(next);
        }

        Ok(Self { layouts, ranks })
    }

    /// Reorder changes needed to bring `element` in line with the declared order
    fn reorder(&self, element: &Element) -> Vec<Change> {
        let mut changes = Vec::new();
        for layout in &self.layouts {
            let id = (
                layout.container_type.as_str(),
                layout.entry_type.as_str(),
                layout.identity_field.as_str(),
            );
            let Some(ranks) = self.ranks.get(&id) else {
                continue;
            };
            let entries = element.entries(&layout.container_type, &layout.entry_type);
            if entries.len() < 2 {
                continue;
            }

            let mut sorted = entries.to_vec();
            sorted.sort_by_key(|entry| {
                layout
                    .identity_of(entry)
                    .and_then(|identity| ranks.get(identity).copied())
                    .unwrap_or(usize::MAX)
            });

            if sorted.as_slice() != entries {
                changes.push(Change::ReplaceEntries {
                    container: layout.container_type.clone(),
                    entry_type: layout.entry_type.clone(),
                    entries: sorted,
                });
            }
        }
        changes
    }
}

/// Reorder collections of a staged element after a reconciliation pass
pub(crate) fn restore_order(
    registry: &BindingRegistry,
    staging: &mut Staging,
    effective: &Template,
) -> Result<(), ReconcileError> {
    let ranking = Ranking::build(registry, effective)?;
    let changes = ranking.reorder(staging.element());
    staging.extend(changes)?;
    Ok(())
}

/// Reorder changes for a live element, without any other reconciliation
pub fn order_changes(
    registry: &BindingRegistry,
    element: &Element,
    effective: &Template,
) -> Result<Vec<Change>, ReconcileError> {
    Ok(Ranking::build(registry, effective)?.reorder(element))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{Binding, PropertyDescriptor};
    use crate::tree::Entry;
    use pretty_assertions::assert_eq;

    fn input(target: &str) -> Entry {
        Entry::new().with("target", target)
    }

    fn template(targets: &[&str]) -> Template {
        targets.iter().fold(Template::new("t", None), |t, target| {
            t.with_property(PropertyDescriptor::new(*target, Binding::input(*target)))
        })
    }

    fn element(targets: &[&str]) -> Element {
        targets
            .iter()
            .fold(Element::new("Task_1", "bpmn:ServiceTask"), |e, target| {
                e.with_entry("zeebe:IoMapping", "zeebe:Input", input(target))
            })
    }

    fn reordered(changes: &[Change]) -> Vec<String> {
        match changes {
            [Change::ReplaceEntries { entries, .. }] => entries
                .iter()
                .filter_map(|e| e.get("target").and_then(|v| v.as_str()).map(String::from))
                .collect(),
            other => panic!("expected one ReplaceEntries, got {:?}", other),
        }
    }

    #[test]
    fn test_sorted_collection_needs_no_change() {
        let registry = BindingRegistry::zeebe();
        let changes =
            order_changes(&registry, &element(&["a", "b", "c"]), &template(&["a", "b", "c"]))
                .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_managed_entries_follow_declaration_order() {
        let registry = BindingRegistry::zeebe();
        let changes =
            order_changes(&registry, &element(&["c", "a", "b"]), &template(&["a", "b", "c"]))
                .unwrap();
        assert_eq!(reordered(&changes), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unmanaged_entries_keep_relative_order_at_end() {
        let registry = BindingRegistry::zeebe();
        let changes = order_changes(
            &registry,
            &element(&["user2", "b", "user1", "a"]),
            &template(&["a", "b"]),
        )
        .unwrap();
        assert_eq!(reordered(&changes), vec!["a", "b", "user2", "user1"]);
    }

    #[test]
    fn test_reorder_does_not_alter_contents() {
        let registry = BindingRegistry::zeebe();
        let live = Element::new("Task_1", "bpmn:ServiceTask")
            .with_entry(
                "zeebe:IoMapping",
                "zeebe:Input",
                input("b").with("source", "2"),
            )
            .with_entry(
                "zeebe:IoMapping",
                "zeebe:Input",
                input("a").with("source", "1"),
            );
        let changes = order_changes(&registry, &live, &template(&["a", "b"])).unwrap();
        let Change::ReplaceEntries { entries, .. } = &changes[0] else {
            panic!("expected ReplaceEntries");
        };
        assert_eq!(
            entries,
            &vec![input("a").with("source", "1"), input("b").with("source", "2")]
        );
    }

    #[test]
    fn test_collections_sorted_independently() {
        let registry = BindingRegistry::zeebe();
        let effective = Template::new("t", None)
            .with_property(PropertyDescriptor::new("h2", Binding::header("h2")))
            .with_property(PropertyDescriptor::new("a", Binding::input("a")))
            .with_property(PropertyDescriptor::new("h1", Binding::header("h1")))
            .with_property(PropertyDescriptor::new("b", Binding::input("b")));
        let live = element(&["a", "b"])
            .with_entry("zeebe:TaskHeaders", "zeebe:Header", Entry::new().with("key", "h1"))
            .with_entry("zeebe:TaskHeaders", "zeebe:Header", Entry::new().with("key", "h2"));

        let changes = order_changes(&registry, &live, &effective).unwrap();
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes[0],
            Change::ReplaceEntries { entry_type, .. } if entry_type == "zeebe:Header"
        ));
    }
}
