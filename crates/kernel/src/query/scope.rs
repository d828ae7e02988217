//! Per-query compilation scope.
//!
//! Bundles the join manager, the element selector and the resolved
//! language so that conditions, the orderby strategy and the result
//! transformation can ask for tables and columns without knowing about
//! each other. A scope lives for exactly one SQL assembly.

use std::collections::HashMap;

use sea_query::{Cond, Expr, SimpleExpr};

use crate::error::QueryResult;
use crate::host::LanguageService;
use crate::models::{Domain, Role};

use super::element_selector::{ElementSelector, LanguageResolution};
use super::join_manager::{JoinClause, JoinKey, JoinManager};
use super::schema::{POSTMETA_TABLE, Schema, col, domain_column};

/// Mutable state shared by everything that contributes to one statement.
pub struct QueryScope<'a> {
    joins: JoinManager,
    selector: ElementSelector,
    languages: &'a dyn LanguageService,
    language: LanguageResolution,
    fixed_domains: HashMap<Role, Domain>,
    columns: Vec<(SimpleExpr, String)>,
}

/// Projection and joins of a finished scope.
#[derive(Debug)]
pub struct CompiledScope {
    pub columns: Vec<(SimpleExpr, String)>,
    pub joins: Vec<JoinClause>,
}

impl<'a> QueryScope<'a> {
    pub fn new(
        schema: Schema,
        languages: &'a dyn LanguageService,
        language: LanguageResolution,
    ) -> Self {
        let translation = language.translation_target().map(str::to_string);
        Self {
            joins: JoinManager::new(schema),
            selector: ElementSelector::new(translation),
            languages,
            language,
            fixed_domains: HashMap::new(),
            columns: Vec::new(),
        }
    }

    /// Let the element selector settle which roles may be translated.
    pub fn initialize(&mut self, fixed_domains: &HashMap<Role, Domain>) {
        self.selector.initialize(fixed_domains);
        self.fixed_domains = fixed_domains.clone();
    }

    /// Domain every match has in `role`, when the conditions pin it.
    pub fn fixed_domain(&self, role: Role) -> Option<Domain> {
        match role {
            Role::Intermediary => Some(Domain::Posts),
            _ => self.fixed_domains.get(&role).copied(),
        }
    }

    /// Alias of the relationship definitions table, joining it if needed.
    pub fn relationships(&mut self) -> &'static str {
        self.joins.relationships()
    }

    /// `relationships.<role>_domain`, or `None` for the intermediary.
    pub fn domain_column(&mut self, role: Role) -> Option<Expr> {
        let column = domain_column(role)?;
        Some(col(self.joins.relationships(), &column))
    }

    /// Element id of `role` as shown in results (possibly translated).
    pub fn element_id(&mut self, role: Role) -> SimpleExpr {
        self.selector.element_id(role, &mut self.joins)
    }

    /// Alias of the content row of `role`'s element in `domain`.
    ///
    /// Elements of other domains get no row, so filters on this alias never
    /// match them.
    pub fn content(&mut self, role: Role, domain: Domain) -> String {
        let key = JoinKey::Content { domain, role };
        if let Some(alias) = self.joins.alias(&key) {
            return alias.to_string();
        }
        let table = domain.content_table();
        let element_id = self.element_id(role);
        let guard = self.domain_column(role).map(|c| c.eq(domain.as_str()));
        self.joins.request(
            key,
            table.table,
            &format!("{role}_{}", table.table),
            |alias| {
                let on = Cond::all().add(col(alias, table.id_column).eq(element_id));
                match guard {
                    Some(guard) => on.add(guard),
                    None => on,
                }
            },
        )
    }

    /// Alias of the postmeta row with `meta_key` of `role`'s element.
    pub fn postmeta(&mut self, role: Role, meta_key: &str) -> String {
        let key = JoinKey::Postmeta {
            role,
            meta_key: meta_key.to_string(),
        };
        if let Some(alias) = self.joins.alias(&key) {
            return alias.to_string();
        }
        let element_id = self.element_id(role);
        let guard = self
            .domain_column(role)
            .map(|c| c.eq(Domain::Posts.as_str()));
        self.joins.request(
            key,
            POSTMETA_TABLE,
            &format!("{role}_postmeta"),
            |alias| {
                let on = Cond::all()
                    .add(col(alias, "post_id").eq(element_id))
                    .add(col(alias, "meta_key").eq(meta_key));
                match guard {
                    Some(guard) => on.add(guard),
                    None => on,
                }
            },
        )
    }

    /// Map a caller-supplied element id to the language it is compared in.
    ///
    /// Ids compared against the stored column go to the default language,
    /// ids compared against the selected column go to the result language.
    pub fn translate_supplied_id(
        &self,
        id: i64,
        domain: Domain,
        against_stored: bool,
    ) -> QueryResult<i64> {
        if !self.language.multilingual || !domain.is_translatable() {
            return Ok(id);
        }
        let language = if against_stored || self.selector.translation_language().is_none() {
            &self.language.default_language
        } else {
            &self.language.language
        };
        Ok(self
            .languages
            .translate_element_id(id, domain, language)?
            .unwrap_or(id))
    }

    /// Add an explicit column to the projection.
    pub fn select(&mut self, expr: SimpleExpr, alias: &str) {
        self.columns.push((expr, alias.to_string()));
    }

    /// Project `role`'s element id as `<role>_id`.
    pub fn request_element_id(&mut self, role: Role) {
        self.selector.request_id(role);
    }

    /// Project `role`'s domain as `<role>_domain`.
    pub fn request_element_domain(&mut self, role: Role) {
        self.selector.request_domain(role);
    }

    /// Close the scope: resolve the selector's fragments, then order all joins.
    pub fn finish(mut self) -> CompiledScope {
        let mut columns = std::mem::take(&mut self.columns);
        columns.extend(self.selector.select_fragments(&mut self.joins));
        let joins = self.joins.into_ordered(self.selector.into_joins());
        CompiledScope { columns, joins }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::host::Monolingual;

    fn scope(languages: &dyn LanguageService) -> QueryScope<'_> {
        let mut scope = QueryScope::new(
            Schema::default(),
            languages,
            LanguageResolution::monolingual("en"),
        );
        scope.initialize(&HashMap::new());
        scope
    }

    #[test]
    fn content_join_is_shared() {
        let languages = Monolingual::default();
        let mut scope = scope(&languages);
        let a = scope.content(Role::Parent, Domain::Posts);
        let b = scope.content(Role::Parent, Domain::Posts);
        let c = scope.content(Role::Child, Domain::Posts);
        assert_eq!(a, b);
        assert_eq!(a, "parent_posts");
        assert_eq!(c, "child_posts");
        assert_eq!(scope.finish().joins.len(), 3);
    }

    #[test]
    fn intermediary_content_has_no_domain_guard() {
        let languages = Monolingual::default();
        let mut scope = scope(&languages);
        scope.content(Role::Intermediary, Domain::Posts);
        let compiled = scope.finish();
        assert_eq!(compiled.joins.len(), 1);
        assert_eq!(compiled.joins[0].alias, "intermediary_posts");
    }

    #[test]
    fn explicit_columns_come_before_element_columns() {
        let languages = Monolingual::default();
        let mut scope = scope(&languages);
        scope.request_element_id(Role::Child);
        scope.select(col("associations", "id").into(), "association_id");
        let compiled = scope.finish();
        let aliases: Vec<&str> = compiled.columns.iter().map(|(_, a)| a.as_str()).collect();
        assert_eq!(aliases, vec!["association_id", "child_id"]);
    }

    #[test]
    fn monolingual_ids_are_not_translated() {
        let languages = Monolingual::default();
        let scope = scope(&languages);
        assert_eq!(scope.translate_supplied_id(9, Domain::Posts, false).unwrap(), 9);
    }
}
