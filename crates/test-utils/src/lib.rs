//! Relata test utilities.
//!
//! Helpers for integration testing: relationship fixtures, in-memory
//! implementations of the host collaborator traits, a SQLite-backed host
//! store and SQL assertion utilities.

mod sqlite;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use relata_kernel::host::{
    DefinitionRepository, ElementRepository, HostServices, LanguageService, Row, RowExecutor,
};
use relata_kernel::models::{
    Cardinality, Domain, Element, RelationshipDefinition, RelationshipOrigin, RoleDescriptor,
};

pub use sqlite::SqliteHost;

/// Create a relationship definition between two post types.
pub fn test_relationship(
    id: i64,
    slug: &str,
    parent_type: &str,
    child_type: &str,
) -> TestRelationship {
    TestRelationship(RelationshipDefinition {
        id,
        slug: slug.to_string(),
        parent: RoleDescriptor::posts(&[parent_type]),
        child: RoleDescriptor::posts(&[child_type]),
        intermediary_type: None,
        cardinality: Cardinality::ManyToMany,
        origin: RelationshipOrigin::Wizard,
        is_active: true,
        needs_legacy_support: false,
    })
}

/// The "book-author" relationship used throughout the tests.
pub fn book_author() -> RelationshipDefinition {
    test_relationship(1, "book-author", "book", "author").build()
}

/// A relationship definition builder.
#[derive(Debug, Clone)]
pub struct TestRelationship(RelationshipDefinition);

impl TestRelationship {
    /// Parent elements are of `domain` (types cleared).
    pub fn with_parent_domain(mut self, domain: Domain) -> Self {
        self.0.parent = RoleDescriptor {
            domain,
            types: Vec::new(),
        };
        self
    }

    /// Child elements are of `domain` (types cleared).
    pub fn with_child_domain(mut self, domain: Domain) -> Self {
        self.0.child = RoleDescriptor {
            domain,
            types: Vec::new(),
        };
        self
    }

    pub fn with_intermediary(mut self, post_type: &str) -> Self {
        self.0.intermediary_type = Some(post_type.to_string());
        self
    }

    pub fn with_origin(mut self, origin: RelationshipOrigin) -> Self {
        self.0.origin = origin;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.0.is_active = false;
        self
    }

    pub fn legacy(mut self) -> Self {
        self.0.needs_legacy_support = true;
        self
    }

    pub fn build(self) -> RelationshipDefinition {
        self.0
    }
}

/// Definitions held in memory.
#[derive(Debug, Default)]
pub struct StaticDefinitions {
    definitions: Vec<RelationshipDefinition>,
}

impl StaticDefinitions {
    pub fn new(definitions: Vec<RelationshipDefinition>) -> Self {
        Self { definitions }
    }
}

impl DefinitionRepository for StaticDefinitions {
    fn get_definition(&self, slug: &str) -> Result<Option<RelationshipDefinition>> {
        Ok(self.definitions.iter().find(|d| d.slug == slug).cloned())
    }

    fn get_definition_by_id(&self, id: i64) -> Result<Option<RelationshipDefinition>> {
        Ok(self.definitions.iter().find(|d| d.id == id).cloned())
    }
}

/// Elements held in memory.
#[derive(Debug, Default)]
pub struct StaticElements {
    elements: HashMap<(Domain, i64), Element>,
}

impl StaticElements {
    pub fn with_post(mut self, id: i64, post_type: &str, title: &str) -> Self {
        self.elements.insert(
            (Domain::Posts, id),
            Element {
                id,
                domain: Domain::Posts,
                title: title.to_string(),
                element_type: Some(post_type.to_string()),
                status: Some("publish".to_string()),
            },
        );
        self
    }
}

impl ElementRepository for StaticElements {
    fn load_element(&self, domain: Domain, id: i64) -> Result<Option<Element>> {
        Ok(self.elements.get(&(domain, id)).cloned())
    }
}

/// Multilingual language service with fixed answers.
#[derive(Debug, Clone)]
pub struct FixedLanguages {
    default: String,
    current: String,
    translations: HashMap<(i64, String), i64>,
    element_languages: HashMap<i64, String>,
}

impl FixedLanguages {
    /// Multilingual site with `default` as default and current language.
    pub fn new(default: &str) -> Self {
        Self {
            default: default.to_string(),
            current: default.to_string(),
            translations: HashMap::new(),
            element_languages: HashMap::new(),
        }
    }

    /// Language the host currently shows; may be the all-languages sentinel.
    pub fn showing(mut self, current: &str) -> Self {
        self.current = current.to_string();
        self
    }

    /// `id` translated into `language` is `translated_id`.
    pub fn with_translation(mut self, id: i64, language: &str, translated_id: i64) -> Self {
        self.translations.insert((id, language.to_string()), translated_id);
        self
    }

    /// `id` is written in `language`.
    pub fn with_element_language(mut self, id: i64, language: &str) -> Self {
        self.element_languages.insert(id, language.to_string());
        self
    }
}

impl LanguageService for FixedLanguages {
    fn is_multilingual(&self) -> bool {
        true
    }

    fn current_language(&self) -> String {
        self.current.clone()
    }

    fn default_language(&self) -> String {
        self.default.clone()
    }

    fn translate_element_id(
        &self,
        id: i64,
        _domain: Domain,
        language: &str,
    ) -> Result<Option<i64>> {
        Ok(self.translations.get(&(id, language.to_string())).copied())
    }

    fn element_language(&self, id: i64, _domain: Domain) -> Result<Option<String>> {
        Ok(self.element_languages.get(&id).cloned())
    }
}

/// Executor returning canned rows and recording every statement.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    rows: Vec<Row>,
    found_rows: u64,
    statements: Mutex<Vec<String>>,
    found_rows_calls: Mutex<usize>,
}

impl RecordingExecutor {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn with_found_rows(mut self, found_rows: u64) -> Self {
        self.found_rows = found_rows;
        self
    }

    /// Statements executed so far.
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    /// How often `found_rows` was read.
    pub fn found_rows_calls(&self) -> usize {
        *self.found_rows_calls.lock()
    }
}

impl RowExecutor for RecordingExecutor {
    fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        self.statements.lock().push(sql.to_string());
        Ok(self.rows.clone())
    }

    fn found_rows(&self) -> Result<u64> {
        *self.found_rows_calls.lock() += 1;
        Ok(self.found_rows)
    }
}

/// Services backed by in-memory fakes.
pub fn fake_services(
    definitions: Vec<RelationshipDefinition>,
    executor: Arc<RecordingExecutor>,
) -> HostServices {
    HostServices::new(
        Arc::new(StaticDefinitions::new(definitions)),
        executor,
        Arc::new(StaticElements::default()),
    )
}

/// Build a result row from `(column, value)` pairs.
pub fn row(columns: &[(&str, serde_json::Value)]) -> Row {
    columns
        .iter()
        .map(|(column, value)| ((*column).to_string(), value.clone()))
        .collect()
}

/// Assertion helpers for generated SQL.
pub mod assert {
    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that a string does not contain a substring.
    pub fn not_contains(haystack: &str, needle: &str) {
        assert!(
            !haystack.contains(needle),
            "Expected string to NOT contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that `needle` occurs exactly `count` times.
    pub fn occurs(haystack: &str, needle: &str, count: usize) {
        let actual = haystack.matches(needle).count();
        assert_eq!(
            actual, count,
            "Expected '{needle}' {count} time(s), found {actual}\nActual: {haystack}"
        );
    }
}
