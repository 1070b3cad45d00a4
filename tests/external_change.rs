//! External edits, re-entrancy suppression, and the Camunda 7 resolver table

use element_templates::reconcile::ReentrancyFlag;
use element_templates::{
    Binding, BindingKind, CommandBatch, CommandStack, Diagram, Element, EngineConfig, Entry,
    ExternalChange, Flavor, PropertyDescriptor, ReconcileError, Reconciler, Template, TreeError,
};
use pretty_assertions::assert_eq;

fn headers_template() -> Template {
    Template::new("headers", None)
        .with_property(PropertyDescriptor::new("first", Binding::header("first")).with_value("1"))
        .with_property(PropertyDescriptor::new("second", Binding::header("second")).with_value("2"))
}

fn header_keys(diagram: &Diagram) -> Vec<String> {
    diagram
        .element("Task_1")
        .expect("task exists")
        .entries("zeebe:TaskHeaders", "zeebe:Header")
        .iter()
        .filter_map(|e| e.get("key").and_then(|v| v.as_str()).map(String::from))
        .collect()
}

/// Diagram wrapper recording whether the reconciliation flag was held on execute
struct Observed {
    diagram: Diagram,
    flag: ReentrancyFlag,
    seen: Vec<bool>,
}

impl CommandStack for Observed {
    fn element(&self, id: &str) -> Option<&Element> {
        self.diagram.element(id)
    }

    fn execute(&mut self, batch: &CommandBatch) -> Result<(), TreeError> {
        self.seen.push(self.flag.is_set());
        self.diagram.execute(batch)
    }
}

#[test]
fn test_external_reorder_is_restored() {
    let mut diagram = Diagram::new().with_element(Element::new("Task_1", "bpmn:ServiceTask"));
    let mut reconciler = Reconciler::new(EngineConfig::default());
    reconciler
        .bind(&mut diagram, "Task_1", &headers_template())
        .unwrap();

    // User drags "second" above "first" and appends a header of their own
    diagram
        .edit("Task_1", |element| {
            let headers = element
                .containers
                .get_mut("zeebe:TaskHeaders")
                .and_then(|c| c.collections.get_mut("zeebe:Header"))
                .expect("headers exist");
            headers.reverse();
            headers.insert(0, Entry::new().with("key", "custom").with("value", "x"));
        })
        .unwrap();
    assert_eq!(header_keys(&diagram), vec!["custom", "second", "first"]);

    let batch = reconciler
        .on_external_change(&mut diagram, &ExternalChange::new("Task_1"))
        .unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(header_keys(&diagram), vec!["first", "second", "custom"]);
}

#[test]
fn test_external_change_never_materializes_or_removes() {
    let mut diagram = Diagram::new().with_element(Element::new("Task_1", "bpmn:ServiceTask"));
    let mut reconciler = Reconciler::new(EngineConfig::default());
    reconciler
        .bind(&mut diagram, "Task_1", &headers_template())
        .unwrap();

    // User deletes a managed header
    diagram
        .edit("Task_1", |element| {
            if let Some(headers) = element
                .containers
                .get_mut("zeebe:TaskHeaders")
                .and_then(|c| c.collections.get_mut("zeebe:Header"))
            {
                headers.retain(|e| e.get("key").and_then(|v| v.as_str()) != Some("first"));
            }
        })
        .unwrap();

    let batch = reconciler
        .on_external_change(&mut diagram, &ExternalChange::new("Task_1"))
        .unwrap();
    assert!(batch.is_empty());
    assert_eq!(header_keys(&diagram), vec!["second"]);
}

#[test]
fn test_external_change_suppressed_during_reconciliation() {
    let mut diagram = Diagram::new().with_element(Element::new("Task_1", "bpmn:ServiceTask"));
    let mut reconciler = Reconciler::new(EngineConfig::default());
    reconciler
        .bind(&mut diagram, "Task_1", &headers_template())
        .unwrap();
    diagram
        .edit("Task_1", |element| {
            if let Some(headers) = element
                .containers
                .get_mut("zeebe:TaskHeaders")
                .and_then(|c| c.collections.get_mut("zeebe:Header"))
            {
                headers.reverse();
            }
        })
        .unwrap();

    let flag = reconciler.flag();
    let held = flag.enter().expect("flag is free");
    let batch = reconciler
        .on_external_change(&mut diagram, &ExternalChange::new("Task_1"))
        .unwrap();
    assert!(batch.is_empty());
    assert_eq!(header_keys(&diagram), vec!["second", "first"]);

    drop(held);
    reconciler
        .on_external_change(&mut diagram, &ExternalChange::new("Task_1"))
        .unwrap();
    assert_eq!(header_keys(&diagram), vec!["first", "second"]);
}

#[test]
fn test_flag_held_while_engine_executes() {
    let mut reconciler = Reconciler::new(EngineConfig::default());
    let mut stack = Observed {
        diagram: Diagram::new().with_element(Element::new("Task_1", "bpmn:ServiceTask")),
        flag: reconciler.flag(),
        seen: Vec::new(),
    };

    reconciler
        .bind(&mut stack, "Task_1", &headers_template())
        .unwrap();
    assert_eq!(stack.seen, vec![true]);
    assert!(!reconciler.flag().is_set());
}

#[test]
fn test_camunda_flavor_tables() {
    let config = EngineConfig::default().with_flavor(Flavor::Camunda);
    let mut diagram = Diagram::new().with_element(Element::new("Task_1", "bpmn:ServiceTask"));
    let mut reconciler = Reconciler::new(config);
    let template = Template::new("c7", None)
        .with_property(PropertyDescriptor::new("in", Binding::input("url")).with_value("${url}"))
        .with_property(
            PropertyDescriptor::new("out", Binding::output("${response}")).with_value("result"),
        )
        .with_property(
            PropertyDescriptor::new("err", Binding::error_binding("Error_1"))
                .with_value("${failed}"),
        );

    reconciler.bind(&mut diagram, "Task_1", &template).unwrap();

    let task = diagram.element("Task_1").unwrap();
    assert_eq!(
        task.entries("camunda:InputOutput", "camunda:InputParameter"),
        &[Entry::new().with("name", "url").with("value", "${url}")]
    );
    assert_eq!(
        task.entries("camunda:InputOutput", "camunda:OutputParameter"),
        &[Entry::new().with("value", "${response}").with("name", "result")]
    );
    assert_eq!(
        task.entries("camunda:ErrorEventDefinitions", "camunda:ErrorEventDefinition"),
        &[Entry::new().with("errorRef", "Error_1").with("expression", "${failed}")]
    );
}

#[test]
fn test_unsupported_kind_aborts_without_writing() {
    let config = EngineConfig::default().with_flavor(Flavor::Camunda);
    let mut diagram = Diagram::new().with_element(Element::new("Task_1", "bpmn:ServiceTask"));
    let mut reconciler = Reconciler::new(config);
    let template = Template::new("mixed", None)
        .with_property(PropertyDescriptor::new("name", Binding::property("name")).with_value("A"))
        .with_property(
            PropertyDescriptor::new("type", Binding::task_definition("type")).with_value("http"),
        );

    let err = reconciler
        .bind(&mut diagram, "Task_1", &template)
        .unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::UnknownBindingKind {
            kind: BindingKind::TaskDefinition,
            ..
        }
    ));
    assert!(diagram.history().is_empty());
    assert!(diagram.element("Task_1").unwrap().attributes.is_empty());
    assert!(reconciler.applied("Task_1").is_none());
}
