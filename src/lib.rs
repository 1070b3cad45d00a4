//! Element Templates - declarative property templates for diagram elements
//!
//! This library binds versioned templates to document elements and keeps them
//! reconciled: applying a template, switching templates or versions, and hiding
//! or showing conditional properties, without ever discarding values the user
//! edited by hand.
//!
//! # Example
//!
//! ```rust
//! use element_templates::{
//!     Binding, CommandStack, Diagram, Element, EngineConfig, PropertyDescriptor, Reconciler,
//!     Template, Value,
//! };
//!
//! let mut diagram = Diagram::new().with_element(Element::new("Task_1", "bpmn:ServiceTask"));
//! let template = Template::new("rest", Some(1)).with_property(
//!     PropertyDescriptor::new("url", Binding::input("url")).with_value("http://a"),
//! );
//!
//! let mut reconciler = Reconciler::new(EngineConfig::default());
//! reconciler.bind(&mut diagram, "Task_1", &template).unwrap();
//!
//! let task = diagram.element("Task_1").unwrap();
//! let inputs = task.entries("zeebe:IoMapping", "zeebe:Input");
//! assert_eq!(inputs[0].get("source"), Some(&Value::from("http://a")));
//! ```

pub mod binding;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod template;
pub mod tree;
pub mod value;

pub use binding::{BindingRegistry, Flavor};
pub use config::{ConfigError, EngineConfig};
pub use error::ReconcileError;
pub use reconcile::{ExternalChange, Planner, Reconciler, UnbindMode};
pub use template::{
    reduce, Binding, BindingKind, CatalogError, Condition, PropertyDescriptor, Template,
    TemplateCatalog, TemplateKey,
};
pub use tree::{
    Change, Command, CommandBatch, CommandStack, Diagram, DiagramError, Element, Entry, TreeError,
};
pub use value::Value;
