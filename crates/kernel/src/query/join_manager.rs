//! Join deduplication for one query.
//!
//! Conditions, the orderby strategy and the element selector ask for joined
//! tables by *what* they need ("the parent's post row", "the child's
//! `_price` meta row"); the manager hands out one alias per distinct need
//! and renders every join exactly once, in a fixed order.

use std::collections::HashMap;

use sea_query::{Alias, Cond, Expr, JoinType, SelectStatement};

use crate::models::{Domain, Role};

use super::alias::UniqueAliasGenerator;
use super::schema::{ASSOCIATIONS_ALIAS, RELATIONSHIPS_ALIAS, RELATIONSHIPS_TABLE, Schema};

/// What a registered join provides.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JoinKey {
    /// The content row of the element in `role`, for one domain.
    Content { domain: Domain, role: Role },
    /// The postmeta row with `meta_key` of the element in `role`.
    Postmeta { role: Role, meta_key: String },
}

/// A join ready to be applied to a SELECT.
#[derive(Debug, Clone)]
pub struct JoinClause {
    /// Prefixed table name.
    pub table: String,
    /// Alias the rest of the query uses for the table.
    pub alias: String,
    pub join_type: JoinType,
    pub on: Cond,
}

impl JoinClause {
    /// Outer join; absence of the joined row must not drop the association.
    pub fn left(table: String, alias: String, on: Cond) -> Self {
        Self {
            table,
            alias,
            join_type: JoinType::LeftJoin,
            on,
        }
    }

    pub fn apply(&self, query: &mut SelectStatement) {
        query.join_as(
            self.join_type,
            Alias::new(&self.table),
            Alias::new(&self.alias),
            self.on.clone(),
        );
    }
}

/// Deduplicates join requests and renders them in order.
#[derive(Debug)]
pub struct JoinManager {
    schema: Schema,
    aliases: UniqueAliasGenerator,
    relationships: bool,
    index: HashMap<JoinKey, usize>,
    joins: Vec<JoinClause>,
}

impl JoinManager {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            aliases: UniqueAliasGenerator::new(),
            relationships: false,
            index: HashMap::new(),
            joins: Vec::new(),
        }
    }

    /// Number of registered joins (test-only).
    #[cfg(test)]
    fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Mark the relationship definitions table as needed and return its alias.
    pub fn relationships(&mut self) -> &'static str {
        self.relationships = true;
        RELATIONSHIPS_ALIAS
    }

    /// Alias already registered for `key`, if any.
    pub fn alias(&self, key: &JoinKey) -> Option<&str> {
        self.index.get(key).map(|&i| self.joins[i].alias.as_str())
    }

    /// Issue a fresh alias without registering a join.
    ///
    /// Used by the element selector, whose joins are rendered separately.
    pub fn allocate_alias(&mut self, base: &str) -> String {
        self.aliases.generate(base)
    }

    /// Register a LEFT JOIN for `key`, or return the alias of the existing one.
    ///
    /// `on` receives the new alias and builds the ON condition; it is not
    /// called when the key is already registered.
    pub fn request(
        &mut self,
        key: JoinKey,
        table: &str,
        alias_base: &str,
        on: impl FnOnce(&str) -> Cond,
    ) -> String {
        if let Some(alias) = self.alias(&key) {
            return alias.to_string();
        }
        let alias = self.aliases.generate(alias_base);
        let clause = JoinClause::left(self.schema.table(table), alias.clone(), on(&alias));
        self.index.insert(key, self.joins.len());
        self.joins.push(clause);
        alias
    }

    /// Render all joins: relationships first, then the element selector's
    /// joins, then the per-role content and metadata joins in request order.
    pub fn into_ordered(self, selector_joins: Vec<JoinClause>) -> Vec<JoinClause> {
        let mut ordered = Vec::with_capacity(self.joins.len() + selector_joins.len() + 1);
        if self.relationships {
            ordered.push(JoinClause {
                table: self.schema.table(RELATIONSHIPS_TABLE),
                alias: RELATIONSHIPS_ALIAS.to_string(),
                join_type: JoinType::InnerJoin,
                on: Cond::all().add(
                    Expr::col((Alias::new(RELATIONSHIPS_ALIAS), Alias::new("id")))
                        .equals((Alias::new(ASSOCIATIONS_ALIAS), Alias::new("relationship_id"))),
                ),
            });
        }
        ordered.extend(selector_joins);
        ordered.extend(self.joins);
        ordered
    }
}
