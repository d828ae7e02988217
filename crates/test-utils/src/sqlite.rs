//! SQLite-backed host store.
//!
//! Creates the association, relationship, content, postmeta and
//! translation tables in an in-memory database and executes the engine's
//! statements against them. SQLite accepts MySQL's backtick quoting, so
//! generated SQL runs unchanged apart from `SQL_CALC_FOUND_ROWS`, which is
//! stripped and emulated by counting the statement without its LIMIT.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use relata_kernel::EngineConfig;
use relata_kernel::host::{
    DefinitionRepository, ElementRepository, HostServices, LanguageService, Row, RowExecutor,
};
use relata_kernel::models::{Domain, Element, RelationshipDefinition};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;

const FOUND_ROWS_MARKER: &str = "SQL_CALC_FOUND_ROWS ";

/// In-memory host store implementing every collaborator trait.
pub struct SqliteHost {
    conn: Mutex<Connection>,
    prefix: String,
    definitions: Mutex<HashMap<i64, RelationshipDefinition>>,
    last_statement: Mutex<Option<String>>,
    statements: Mutex<Vec<String>>,
}

impl SqliteHost {
    /// Empty store using the default table prefix.
    pub fn new() -> Result<Self> {
        Self::with_config(&EngineConfig::default())
    }

    /// Empty store using `config`'s table prefix.
    pub fn with_config(config: &EngineConfig) -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        let prefix = config.table_prefix.clone();
        conn.execute_batch(&schema(&prefix))
            .context("failed to create host tables")?;
        Ok(Self {
            conn: Mutex::new(conn),
            prefix,
            definitions: Mutex::new(HashMap::new()),
            last_statement: Mutex::new(None),
            statements: Mutex::new(Vec::new()),
        })
    }

    /// Wrap the store into [`HostServices`] with the given language service.
    pub fn services(self: &Arc<Self>, languages: Arc<dyn LanguageService>) -> HostServices {
        HostServices::new(self.clone(), self.clone(), self.clone()).with_languages(languages)
    }

    fn table(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }

    /// Store a relationship definition.
    pub fn insert_relationship(&self, definition: &RelationshipDefinition) -> Result<()> {
        self.conn.lock().execute(
            &format!(
                "INSERT INTO {} (id, slug, parent_domain, child_domain, is_active, origin, needs_legacy_support) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                self.table("toolset_relationships")
            ),
            params![
                definition.id,
                definition.slug,
                definition.parent.domain.as_str(),
                definition.child.domain.as_str(),
                i32::from(definition.is_active),
                definition.origin.as_str(),
                i32::from(definition.needs_legacy_support),
            ],
        )?;
        self.definitions
            .lock()
            .insert(definition.id, definition.clone());
        Ok(())
    }

    /// Store an association and return its id.
    pub fn insert_association(
        &self,
        relationship_id: i64,
        parent_id: i64,
        child_id: i64,
        intermediary_id: Option<i64>,
    ) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            &format!(
                "INSERT INTO {} (relationship_id, parent_id, child_id, intermediary_id) VALUES (?1, ?2, ?3, ?4)",
                self.table("toolset_associations")
            ),
            params![relationship_id, parent_id, child_id, intermediary_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Store a post.
    pub fn insert_post(&self, id: i64, post_type: &str, status: &str, title: &str) -> Result<()> {
        self.conn.lock().execute(
            &format!(
                "INSERT INTO {} (ID, post_type, post_status, post_title, post_content, post_excerpt) \
                 VALUES (?1, ?2, ?3, ?4, '', '')",
                self.table("posts")
            ),
            params![id, post_type, status, title],
        )?;
        Ok(())
    }

    /// Store a taxonomy term.
    pub fn insert_term(&self, id: i64, name: &str) -> Result<()> {
        self.conn.lock().execute(
            &format!("INSERT INTO {} (term_id, name) VALUES (?1, ?2)", self.table("terms")),
            params![id, name],
        )?;
        Ok(())
    }

    /// Store a user.
    pub fn insert_user(&self, id: i64, display_name: &str) -> Result<()> {
        self.conn.lock().execute(
            &format!(
                "INSERT INTO {} (ID, display_name) VALUES (?1, ?2)",
                self.table("users")
            ),
            params![id, display_name],
        )?;
        Ok(())
    }

    /// Store a postmeta row.
    pub fn insert_postmeta(&self, post_id: i64, key: &str, value: &str) -> Result<()> {
        self.conn.lock().execute(
            &format!(
                "INSERT INTO {} (post_id, meta_key, meta_value) VALUES (?1, ?2, ?3)",
                self.table("postmeta")
            ),
            params![post_id, key, value],
        )?;
        Ok(())
    }

    /// Store a translation row; `element_type` is `post_<type>` for posts.
    pub fn insert_translation(
        &self,
        element_id: i64,
        element_type: &str,
        trid: i64,
        language: &str,
    ) -> Result<()> {
        self.conn.lock().execute(
            &format!(
                "INSERT INTO {} (element_id, element_type, trid, language_code) VALUES (?1, ?2, ?3, ?4)",
                self.table("icl_translations")
            ),
            params![element_id, element_type, trid, language],
        )?;
        Ok(())
    }

    /// Every statement passed to [`RowExecutor::execute`], in order.
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    fn query_rows(&self, sql: &str) -> Result<Vec<Row>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(sql)
            .with_context(|| format!("failed to prepare: {sql}"))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = Row::new();
            for (i, column) in columns.iter().enumerate() {
                map.insert(column.clone(), json_value(row.get_ref(i)?));
            }
            out.push(map);
        }
        Ok(out)
    }
}

impl RowExecutor for SqliteHost {
    fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        self.statements.lock().push(sql.to_string());
        let plain = sql.replacen(FOUND_ROWS_MARKER, "", 1);
        let rows = self.query_rows(&plain)?;
        tracing::trace!(rows = rows.len(), "sqlite host executed statement");
        *self.last_statement.lock() = Some(plain);
        Ok(rows)
    }

    fn found_rows(&self) -> Result<u64> {
        let last = self
            .last_statement
            .lock()
            .clone()
            .context("found_rows called before any statement ran")?;
        let unlimited = match last.rfind(" LIMIT ") {
            Some(pos) => &last[..pos],
            None => last.as_str(),
        };
        let count = self.conn.lock().query_row(
            &format!("SELECT COUNT(*) FROM ({unlimited})"),
            [],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(u64::try_from(count)?)
    }
}

impl DefinitionRepository for SqliteHost {
    fn get_definition(&self, slug: &str) -> Result<Option<RelationshipDefinition>> {
        Ok(self
            .definitions
            .lock()
            .values()
            .find(|d| d.slug == slug)
            .cloned())
    }

    fn get_definition_by_id(&self, id: i64) -> Result<Option<RelationshipDefinition>> {
        Ok(self.definitions.lock().get(&id).cloned())
    }
}

impl ElementRepository for SqliteHost {
    fn load_element(&self, domain: Domain, id: i64) -> Result<Option<Element>> {
        let conn = self.conn.lock();
        let element = match domain {
            Domain::Posts => conn
                .query_row(
                    &format!(
                        "SELECT post_title, post_type, post_status FROM {} WHERE ID = ?1",
                        self.table("posts")
                    ),
                    params![id],
                    |row| {
                        Ok(Element {
                            id,
                            domain,
                            title: row.get(0)?,
                            element_type: row.get(1)?,
                            status: row.get(2)?,
                        })
                    },
                )
                .optional()?,
            Domain::Terms | Domain::Users => {
                let table = domain.content_table();
                conn.query_row(
                    &format!(
                        "SELECT {} FROM {} WHERE {} = ?1",
                        table.title_column,
                        self.table(table.table),
                        table.id_column
                    ),
                    params![id],
                    |row| {
                        Ok(Element {
                            id,
                            domain,
                            title: row.get(0)?,
                            element_type: None,
                            status: None,
                        })
                    },
                )
                .optional()?
            }
        };
        Ok(element)
    }
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::from(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::from(b.to_vec()),
    }
}

fn schema(prefix: &str) -> String {
    format!(
        "
        CREATE TABLE {prefix}toolset_associations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            relationship_id INTEGER NOT NULL,
            parent_id INTEGER NOT NULL,
            child_id INTEGER NOT NULL,
            intermediary_id INTEGER
        );
        CREATE TABLE {prefix}toolset_relationships (
            id INTEGER PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            parent_domain TEXT NOT NULL,
            child_domain TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            origin TEXT NOT NULL DEFAULT 'wizard',
            needs_legacy_support INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE {prefix}posts (
            ID INTEGER PRIMARY KEY,
            post_type TEXT NOT NULL,
            post_status TEXT NOT NULL,
            post_title TEXT NOT NULL,
            post_content TEXT NOT NULL DEFAULT '',
            post_excerpt TEXT NOT NULL DEFAULT ''
        );
        CREATE TABLE {prefix}terms (
            term_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        );
        CREATE TABLE {prefix}users (
            ID INTEGER PRIMARY KEY,
            display_name TEXT NOT NULL
        );
        CREATE TABLE {prefix}postmeta (
            meta_id INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id INTEGER NOT NULL,
            meta_key TEXT NOT NULL,
            meta_value TEXT
        );
        CREATE TABLE {prefix}icl_translations (
            translation_id INTEGER PRIMARY KEY AUTOINCREMENT,
            element_id INTEGER NOT NULL,
            element_type TEXT NOT NULL,
            trid INTEGER NOT NULL,
            language_code TEXT NOT NULL
        );
        "
    )
}
