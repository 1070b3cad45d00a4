//! Template catalog for storing and retrieving loaded templates

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::types::{Template, TemplateKey};

/// Errors that can occur during catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Template not found in catalog
    #[error("template not found: {key}")]
    NotFound { key: TemplateKey },

    /// Duplicate template definition
    #[error("duplicate template definition: {key}")]
    Duplicate { key: TemplateKey },

    /// Error reading a templates file
    #[error("error reading templates file {path}: {message}")]
    FileReadError { path: PathBuf, message: String },

    /// Templates JSON could not be decoded
    #[error("failed to parse templates JSON: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Catalog of immutable templates keyed by `(id, version)`
#[derive(Debug, Default)]
pub struct TemplateCatalog {
    templates: BTreeMap<TemplateKey, Template>,
}

impl TemplateCatalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from a JSON array of templates
    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        let templates: Vec<Template> = serde_json::from_str(content)?;
        let mut catalog = Self::new();
        for template in templates {
            catalog.register(template)?;
        }
        Ok(catalog)
    }

    /// Load a catalog from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::FileReadError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    /// Register a template
    pub fn register(&mut self, template: Template) -> Result<(), CatalogError> {
        let key = template.key();
        if self.templates.contains_key(&key) {
            return Err(CatalogError::Duplicate { key });
        }
        self.templates.insert(key, template);
        Ok(())
    }

    /// Get a template by exact slot. `None` addresses the unversioned slot.
    pub fn get(&self, id: &str, version: Option<u32>) -> Option<&Template> {
        self.templates.get(&TemplateKey::new(id, version))
    }

    /// Get a template by exact slot, failing if absent
    pub fn require(&self, id: &str, version: Option<u32>) -> Result<&Template, CatalogError> {
        self.get(id, version).ok_or_else(|| CatalogError::NotFound {
            key: TemplateKey::new(id, version),
        })
    }

    /// Highest numbered version of a template, falling back to the unversioned slot
    pub fn latest(&self, id: &str) -> Option<&Template> {
        self.templates
            .iter()
            .filter(|(key, _)| key.id == id)
            .max_by_key(|(key, _)| key.version)
            .map(|(_, template)| template)
    }

    /// All registered versions of a template, unversioned slot first
    pub fn versions(&self, id: &str) -> Vec<Option<u32>> {
        self.templates
            .keys()
            .filter(|key| key.id == id)
            .map(|key| key.version)
            .collect()
    }

    /// Check if a slot is occupied
    pub fn contains(&self, id: &str, version: Option<u32>) -> bool {
        self.get(id, version).is_some()
    }

    /// Number of registered templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_register_and_get() {
        let mut catalog = TemplateCatalog::new();
        catalog
            .register(Template::new("rest", Some(1)))
            .expect("Should register");
        assert!(catalog.contains("rest", Some(1)));
        assert!(!catalog.contains("rest", None));
        assert!(catalog.get("rest", Some(1)).is_some());
    }

    #[test]
    fn test_catalog_duplicate_error() {
        let mut catalog = TemplateCatalog::new();
        catalog
            .register(Template::new("rest", None))
            .expect("First register should succeed");
        let result = catalog.register(Template::new("rest", None));
        assert!(matches!(result, Err(CatalogError::Duplicate { .. })));
    }

    #[test]
    fn test_latest_prefers_highest_version() {
        let mut catalog = TemplateCatalog::new();
        catalog.register(Template::new("rest", None)).unwrap();
        catalog.register(Template::new("rest", Some(3))).unwrap();
        catalog.register(Template::new("rest", Some(1))).unwrap();
        catalog.register(Template::new("other", Some(9))).unwrap();

        assert_eq!(catalog.latest("rest").map(|t| t.version), Some(Some(3)));
        assert_eq!(catalog.versions("rest"), vec![None, Some(1), Some(3)]);
    }

    #[test]
    fn test_latest_falls_back_to_unversioned() {
        let mut catalog = TemplateCatalog::new();
        catalog.register(Template::new("rest", None)).unwrap();
        assert_eq!(catalog.latest("rest").map(|t| t.version), Some(None));
        assert!(catalog.latest("missing").is_none());
    }

    #[test]
    fn test_require_missing() {
        let catalog = TemplateCatalog::new();
        let err = catalog.require("rest", Some(2)).unwrap_err();
        assert_eq!(err.to_string(), "template not found: rest@2");
    }

    #[test]
    fn test_from_json_rejects_duplicates() {
        let json = r#"[{ "id": "a", "properties": [] }, { "id": "a", "properties": [] }]"#;
        assert!(matches!(
            TemplateCatalog::from_json(json),
            Err(CatalogError::Duplicate { .. })
        ));
    }
}
