//! Host collaborators consumed by the query engine.
//!
//! The engine never talks to storage directly. Everything it needs from
//! the host content store comes through the traits in this module, bundled
//! into a [`HostServices`] value that is passed to every query.

mod language;

use std::sync::Arc;

use anyhow::Result;

use crate::config::EngineConfig;
use crate::models::{Domain, Element, RelationshipDefinition};

pub use language::{LanguageService, Monolingual, validate_language_code};

/// One result row, keyed by column alias.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Read access to relationship definitions.
pub trait DefinitionRepository: Send + Sync {
    /// Look up a definition by slug.
    fn get_definition(&self, slug: &str) -> Result<Option<RelationshipDefinition>>;

    /// Look up a definition by its row id.
    fn get_definition_by_id(&self, id: i64) -> Result<Option<RelationshipDefinition>>;
}

/// Statement execution against the host store.
///
/// Implementations own parameter escaping, connection handling and timeouts.
pub trait RowExecutor: Send + Sync {
    /// Run a SELECT statement and return its rows.
    fn execute(&self, sql: &str) -> Result<Vec<Row>>;

    /// Total row count of the previous statement, ignoring its LIMIT.
    ///
    /// Only meaningful right after [`execute`](Self::execute) ran a statement
    /// selecting `SQL_CALC_FOUND_ROWS`.
    fn found_rows(&self) -> Result<u64>;
}

/// Loads host elements for the element-instance result shape.
pub trait ElementRepository: Send + Sync {
    /// Load an element, or `None` if it no longer exists.
    fn load_element(&self, domain: Domain, id: i64) -> Result<Option<Element>>;
}

/// Collaborators injected into every query.
#[derive(Clone)]
pub struct HostServices {
    pub definitions: Arc<dyn DefinitionRepository>,
    pub executor: Arc<dyn RowExecutor>,
    pub languages: Arc<dyn LanguageService>,
    pub elements: Arc<dyn ElementRepository>,
    pub config: Arc<EngineConfig>,
}

impl HostServices {
    /// Wire up services for a monolingual site with the default configuration.
    pub fn new(
        definitions: Arc<dyn DefinitionRepository>,
        executor: Arc<dyn RowExecutor>,
        elements: Arc<dyn ElementRepository>,
    ) -> Self {
        Self {
            definitions,
            executor,
            languages: Arc::new(Monolingual::default()),
            elements,
            config: Arc::new(EngineConfig::default()),
        }
    }

    /// Replace the language service.
    pub fn with_languages(mut self, languages: Arc<dyn LanguageService>) -> Self {
        self.languages = languages;
        self
    }

    /// Replace the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Arc::new(config);
        self
    }
}

impl std::fmt::Debug for HostServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostServices")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
