//! Condition tree.
//!
//! Callers compose [`Condition`] values with the constructors below and add
//! them to an association query. Each node compiles to one boolean
//! expression against a [`QueryScope`], asking the scope for whatever
//! tables it needs; nodes never see each other's joins.
//!
//! Combinators are normalized on construction: nested combinators of the
//! same kind are flattened, identity constants are dropped and absorbing
//! constants win, so `all([])` is [`Condition::Tautology`] and `any([])` is
//! [`Condition::Contradiction`].

use std::collections::HashMap;

use sea_query::{Alias, Expr, ExprTrait, Func, SelectStatement, SimpleExpr};

use crate::error::{QueryError, QueryResult};
use crate::host::DefinitionRepository;
use crate::models::{
    Domain, ElementStatus, PUBLIC_POST_STATUS, RelationshipDefinition, RelationshipOrigin, Role,
    UNAVAILABLE_POST_STATUSES,
};

use super::schema::{ASSOCIATIONS_ALIAS, col, stored_element_id};
use super::scope::QueryScope;
use super::types::MetaCompare;

/// Token a caller must pass to [`Condition::host_query`].
pub const HOST_QUERY_ACKNOWLEDGEMENT: &str = "i_know_what_i_am_doing";

/// One node of a query's WHERE clause.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Always true.
    Tautology,
    /// Always false.
    Contradiction,
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    RelationshipId(i64),
    AssociationId(i64),
    Element(ElementCondition),
    ExcludeElement(ElementCondition),
    ElementStatus { role: Role, status: ElementStatus },
    HasDomain { role: Role, domain: Domain },
    /// Post type of the element; only posts have types.
    HasType { role: Role, post_type: String },
    HasActiveRelationship(bool),
    HasLegacyRelationship(bool),
    HasOrigin(RelationshipOrigin),
    HasIntermediaryId,
    IntermediaryId(i64),
    Postmeta(PostmetaCondition),
    Search { role: Role, text: String, exact: bool },
    HostQuery { role: Role, subquery: Box<SelectStatement> },
}

/// Match one element in one role.
///
/// By default the supplied id is translated into the result language and
/// compared against the element id as shown in results, and the element's
/// language becomes the query language in "all languages" mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementCondition {
    pub role: Role,
    pub id: i64,
    pub domain: Domain,
    /// Compare against the stored (default-language) id.
    pub query_original: bool,
    /// Translate the supplied id before comparing.
    pub translate_id: bool,
    /// Let this element choose the translation language.
    pub set_language: bool,
}

impl ElementCondition {
    pub fn new(role: Role, id: i64, domain: Domain) -> Self {
        Self {
            role,
            id,
            domain,
            query_original: false,
            translate_id: true,
            set_language: true,
        }
    }

    /// Match the association's stored id instead of the translated one.
    pub fn query_original(mut self) -> Self {
        self.query_original = true;
        self
    }

    /// Use the supplied id verbatim.
    pub fn without_id_translation(mut self) -> Self {
        self.translate_id = false;
        self
    }

    /// Do not influence the query's translation language.
    pub fn without_language_hint(mut self) -> Self {
        self.set_language = false;
        self
    }

    fn column(&self, scope: &mut QueryScope<'_>) -> SimpleExpr {
        if self.query_original {
            stored_element_id(self.role)
        } else {
            scope.element_id(self.role)
        }
    }

    fn supplied_id(&self, scope: &QueryScope<'_>) -> QueryResult<i64> {
        if self.translate_id {
            scope.translate_supplied_id(self.id, self.domain, self.query_original)
        } else {
            Ok(self.id)
        }
    }
}

impl From<ElementCondition> for Condition {
    fn from(element: ElementCondition) -> Self {
        Condition::Element(element)
    }
}

/// Compare a postmeta value of the element in one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostmetaCondition {
    pub role: Role,
    pub meta_key: String,
    pub value: String,
    pub compare: MetaCompare,
}

impl Condition {
    pub fn tautology() -> Self {
        Condition::Tautology
    }

    pub fn contradiction() -> Self {
        Condition::Contradiction
    }

    /// Conjunction; see the module docs for normalization.
    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Self {
        let mut children = Vec::new();
        for condition in conditions {
            match condition {
                Condition::Tautology => {}
                Condition::Contradiction => return Condition::Contradiction,
                Condition::And(nested) => children.extend(nested),
                other => children.push(other),
            }
        }
        match children.len() {
            0 => Condition::Tautology,
            1 => children.remove(0),
            _ => Condition::And(children),
        }
    }

    /// Disjunction; see the module docs for normalization.
    pub fn any(conditions: impl IntoIterator<Item = Condition>) -> Self {
        let mut children = Vec::new();
        for condition in conditions {
            match condition {
                Condition::Contradiction => {}
                Condition::Tautology => return Condition::Tautology,
                Condition::Or(nested) => children.extend(nested),
                other => children.push(other),
            }
        }
        match children.len() {
            0 => Condition::Contradiction,
            1 => children.remove(0),
            _ => Condition::Or(children),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: Condition) -> Self {
        match condition {
            Condition::Tautology => Condition::Contradiction,
            Condition::Contradiction => Condition::Tautology,
            Condition::Not(inner) => *inner,
            other => Condition::Not(Box::new(other)),
        }
    }

    pub fn relationship_id(id: i64) -> Self {
        Condition::RelationshipId(id)
    }

    pub fn relationship(definition: &RelationshipDefinition) -> Self {
        Condition::RelationshipId(definition.id)
    }

    /// Resolve a relationship slug once, now.
    ///
    /// An unknown slug is not an error: the condition simply matches nothing.
    pub fn relationship_slug(
        slug: &str,
        definitions: &dyn DefinitionRepository,
    ) -> QueryResult<Self> {
        match definitions.get_definition(slug)? {
            Some(definition) => Ok(Condition::RelationshipId(definition.id)),
            None => {
                tracing::debug!(
                    slug = %slug,
                    "unknown relationship slug, query will match nothing"
                );
                Ok(Condition::Contradiction)
            }
        }
    }

    pub fn association_id(id: i64) -> Self {
        Condition::AssociationId(id)
    }

    pub fn element(element: ElementCondition) -> Self {
        Condition::Element(element)
    }

    pub fn parent_id(id: i64, domain: Domain) -> Self {
        Condition::Element(ElementCondition::new(Role::Parent, id, domain))
    }

    pub fn child_id(id: i64, domain: Domain) -> Self {
        Condition::Element(ElementCondition::new(Role::Child, id, domain))
    }

    /// Associations that do not have this element in this role.
    pub fn exclude_element(element: ElementCondition) -> Self {
        Condition::ExcludeElement(element)
    }

    pub fn element_status(role: Role, status: ElementStatus) -> Self {
        Condition::ElementStatus { role, status }
    }

    pub fn has_domain(role: Role, domain: Domain) -> Self {
        Condition::HasDomain { role, domain }
    }

    /// Element is a post of the given type.
    pub fn has_type(role: Role, post_type: &str) -> Self {
        Condition::HasType {
            role,
            post_type: post_type.to_string(),
        }
    }

    /// Element belongs to `domain` and has `element_type`.
    ///
    /// Only posts have types, so any other domain matches nothing.
    pub fn has_domain_and_type(role: Role, domain: Domain, element_type: &str) -> Self {
        match domain {
            Domain::Posts => Condition::all([
                Condition::has_domain(role, domain),
                Condition::has_type(role, element_type),
            ]),
            Domain::Terms | Domain::Users => Condition::Contradiction,
        }
    }

    pub fn has_active_relationship(active: bool) -> Self {
        Condition::HasActiveRelationship(active)
    }

    pub fn has_legacy_relationship(legacy: bool) -> Self {
        Condition::HasLegacyRelationship(legacy)
    }

    pub fn has_origin(origin: RelationshipOrigin) -> Self {
        Condition::HasOrigin(origin)
    }

    /// Association has an intermediary post.
    pub fn has_intermediary_id() -> Self {
        Condition::HasIntermediaryId
    }

    pub fn intermediary_id(id: i64) -> Self {
        Condition::IntermediaryId(id)
    }

    /// Compare the element's `meta_key` value.
    ///
    /// Numeric comparisons require an integer `value`.
    pub fn postmeta(
        role: Role,
        meta_key: &str,
        value: &str,
        compare: MetaCompare,
    ) -> QueryResult<Self> {
        if meta_key.is_empty() {
            return Err(QueryError::InvalidArguments(
                "postmeta condition needs a meta key".to_string(),
            ));
        }
        if compare.is_numeric() && value.trim().parse::<i64>().is_err() {
            return Err(QueryError::InvalidArguments(format!(
                "numeric postmeta comparison needs an integer value, got '{value}'"
            )));
        }
        Ok(Condition::Postmeta(PostmetaCondition {
            role,
            meta_key: meta_key.to_string(),
            value: value.to_string(),
            compare,
        }))
    }

    /// Text search over the element's post. Empty text matches everything.
    pub fn search(role: Role, text: &str, exact: bool) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Condition::Tautology;
        }
        Condition::Search {
            role,
            text: text.to_string(),
            exact,
        }
    }

    /// Element id must be among the ids selected by a native host query.
    ///
    /// The subquery bypasses the engine's own defaults, so the caller must
    /// pass [`HOST_QUERY_ACKNOWLEDGEMENT`].
    pub fn host_query(
        role: Role,
        subquery: SelectStatement,
        acknowledgement: &str,
    ) -> QueryResult<Self> {
        if acknowledgement != HOST_QUERY_ACKNOWLEDGEMENT {
            return Err(QueryError::MissingAcknowledgement);
        }
        Ok(Condition::HostQuery {
            role,
            subquery: Box::new(subquery),
        })
    }

    /// Visit this node and all of its descendants, depth first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Condition)) {
        visit(self);
        match self {
            Condition::And(children) | Condition::Or(children) => {
                for child in children {
                    child.walk(visit);
                }
            }
            Condition::Not(inner) => inner.walk(visit),
            _ => {}
        }
    }

    /// Whether any node in the tree satisfies `predicate`.
    pub fn contains(&self, predicate: impl Fn(&Condition) -> bool) -> bool {
        let mut found = false;
        self.walk(&mut |node| found |= predicate(node));
        found
    }

    pub fn contains_element_status(&self) -> bool {
        self.contains(|node| matches!(node, Condition::ElementStatus { .. }))
    }

    pub fn contains_active_relationship(&self) -> bool {
        self.contains(|node| matches!(node, Condition::HasActiveRelationship(_)))
    }

    /// Whether every match is pinned to a single association row.
    pub fn pins_association(&self) -> bool {
        self.conjuncts()
            .iter()
            .any(|node| matches!(node, Condition::AssociationId(_)))
    }

    /// Elements that opted to choose the translation language, in tree order.
    pub fn language_hints(&self) -> Vec<(i64, Domain)> {
        let mut hints = Vec::new();
        self.walk(&mut |node| {
            if let Condition::Element(element) = node
                && element.set_language
            {
                hints.push((element.id, element.domain));
            }
        });
        hints
    }

    /// Domains every match must have, per role.
    ///
    /// Only conditions that hold for the whole query count, i.e. those
    /// reachable through conjunctions alone.
    pub fn fixed_domains(&self) -> HashMap<Role, Domain> {
        let mut domains = HashMap::new();
        for node in self.conjuncts() {
            match node {
                Condition::HasDomain { role, domain } => {
                    domains.insert(*role, *domain);
                }
                Condition::Element(element) => {
                    domains.insert(element.role, element.domain);
                }
                Condition::HasType { role, .. } | Condition::Search { role, .. } => {
                    domains.insert(*role, Domain::Posts);
                }
                _ => {}
            }
        }
        domains
    }

    /// Nodes joined to the root by AND only.
    fn conjuncts(&self) -> Vec<&Condition> {
        match self {
            Condition::And(children) => children.iter().flat_map(|c| c.conjuncts()).collect(),
            other => vec![other],
        }
    }

    /// Compile to a boolean expression, registering joins on `scope`.
    pub(crate) fn to_expr(&self, scope: &mut QueryScope<'_>) -> QueryResult<SimpleExpr> {
        let expr = match self {
            Condition::Tautology => tautology(),
            Condition::Contradiction => contradiction(),
            Condition::And(children) => {
                let mut exprs = Vec::with_capacity(children.len());
                for child in children {
                    exprs.push(child.to_expr(scope)?);
                }
                all_of(exprs)
            }
            Condition::Or(children) => {
                let mut exprs = Vec::with_capacity(children.len());
                for child in children {
                    exprs.push(child.to_expr(scope)?);
                }
                any_of(exprs)
            }
            Condition::Not(inner) => Expr::cust_with_expr("NOT (?)", inner.to_expr(scope)?),
            Condition::RelationshipId(id) => col(ASSOCIATIONS_ALIAS, "relationship_id").eq(*id),
            Condition::AssociationId(id) => col(ASSOCIATIONS_ALIAS, "id").eq(*id),
            Condition::Element(element) => element_expr(element, scope)?,
            Condition::ExcludeElement(element) => exclude_element_expr(element, scope)?,
            Condition::ElementStatus { role, status } => status_expr(*role, *status, scope),
            Condition::HasDomain { role, domain } => match scope.domain_column(*role) {
                Some(column) => column.eq(domain.as_str()),
                None if *domain == Domain::Posts => tautology(),
                None => contradiction(),
            },
            Condition::HasType { role, post_type } => {
                let table = Domain::Posts.content_table();
                let Some(type_column) = table.type_column else {
                    return Ok(contradiction());
                };
                let alias = scope.content(*role, Domain::Posts);
                on_joined_row(
                    &alias,
                    table.id_column,
                    col(&alias, type_column).eq(post_type.as_str()),
                )
            }
            Condition::HasActiveRelationship(active) => {
                let relationships = scope.relationships();
                col(relationships, "is_active").eq(i32::from(*active))
            }
            Condition::HasLegacyRelationship(legacy) => {
                let relationships = scope.relationships();
                col(relationships, "needs_legacy_support").eq(i32::from(*legacy))
            }
            Condition::HasOrigin(origin) => {
                let relationships = scope.relationships();
                col(relationships, "origin").eq(origin.as_str())
            }
            Condition::HasIntermediaryId => {
                let stored = col(ASSOCIATIONS_ALIAS, "intermediary_id");
                stored.clone().is_not_null().and(stored.ne(0))
            }
            Condition::IntermediaryId(id) => {
                let stored = col(ASSOCIATIONS_ALIAS, "intermediary_id");
                stored.clone().is_not_null().and(stored.eq(*id))
            }
            Condition::Postmeta(meta) => postmeta_expr(meta, scope)?,
            Condition::Search { role, text, exact } => {
                let alias = scope.content(*role, Domain::Posts);
                let table = Domain::Posts.content_table();
                let matches = if *exact {
                    col(&alias, table.title_column).eq(text.as_str())
                } else {
                    let pattern = format!("%{}%", escape_like_wildcards(text));
                    any_of(
                        table
                            .search_columns
                            .iter()
                            .map(|column| col(&alias, column).like(pattern.as_str()))
                            .collect(),
                    )
                };
                on_joined_row(&alias, table.id_column, matches)
            }
            Condition::HostQuery { role, subquery } => {
                let id = scope.element_id(*role);
                let matches = id.clone().in_subquery(subquery.as_ref().clone());
                match role {
                    Role::Intermediary => id.is_not_null().and(matches),
                    _ => matches,
                }
            }
        };
        Ok(expr)
    }
}

/// `expr` over a LEFT-joined row; false rather than NULL when the row is missing.
fn on_joined_row(alias: &str, key: &str, expr: SimpleExpr) -> SimpleExpr {
    col(alias, key).is_not_null().and(expr)
}

fn tautology() -> SimpleExpr {
    Expr::cust("1 = 1")
}

fn contradiction() -> SimpleExpr {
    Expr::cust("1 = 0")
}

/// AND of `exprs` in order; empty is true.
fn all_of(exprs: Vec<SimpleExpr>) -> SimpleExpr {
    exprs
        .into_iter()
        .reduce(|acc, expr| acc.and(expr))
        .unwrap_or_else(tautology)
}

/// OR of `exprs` in order; empty is false.
fn any_of(exprs: Vec<SimpleExpr>) -> SimpleExpr {
    exprs
        .into_iter()
        .reduce(|acc, expr| acc.or(expr))
        .unwrap_or_else(contradiction)
}

fn element_expr(element: &ElementCondition, scope: &mut QueryScope<'_>) -> QueryResult<SimpleExpr> {
    let id = element.supplied_id(scope)?;
    match scope.domain_column(element.role) {
        Some(domain) => {
            let column = element.column(scope);
            Ok(column.eq(id).and(domain.eq(element.domain.as_str())))
        }
        None if element.domain == Domain::Posts => {
            let column = element.column(scope);
            Ok(column.clone().is_not_null().and(column.eq(id)))
        }
        None => Ok(contradiction()),
    }
}

fn exclude_element_expr(
    element: &ElementCondition,
    scope: &mut QueryScope<'_>,
) -> QueryResult<SimpleExpr> {
    let id = element.supplied_id(scope)?;
    let domain = match scope.domain_column(element.role) {
        Some(domain) => Some(domain),
        None if element.domain == Domain::Posts => None,
        None => return Ok(tautology()),
    };
    let column = element.column(scope);
    let mut alternatives = vec![column.clone().is_null(), column.ne(id)];
    if let Some(domain) = domain {
        alternatives.push(domain.ne(element.domain.as_str()));
    }
    Ok(any_of(alternatives))
}

/// Status filter for the element in `role`.
///
/// Only posts have a status; elements of other domains always pass.
fn status_expr(role: Role, status: ElementStatus, scope: &mut QueryScope<'_>) -> SimpleExpr {
    let table = Domain::Posts.content_table();
    let Some(status_column) = table.status_column else {
        return tautology();
    };
    if status == ElementStatus::Any {
        return tautology();
    }
    let alias = scope.content(role, Domain::Posts);
    let column = col(&alias, status_column);
    let filter = on_joined_row(
        &alias,
        table.id_column,
        match status {
            ElementStatus::Public => column.eq(PUBLIC_POST_STATUS),
            _ => column.is_not_in(UNAVAILABLE_POST_STATUSES.iter().copied()),
        },
    );
    match scope.domain_column(role) {
        Some(domain) => any_of(vec![domain.ne(Domain::Posts.as_str()), filter]),
        None => {
            let stored = col(ASSOCIATIONS_ALIAS, "intermediary_id");
            any_of(vec![stored.clone().is_null(), stored.eq(0), filter])
        }
    }
}

fn postmeta_expr(meta: &PostmetaCondition, scope: &mut QueryScope<'_>) -> QueryResult<SimpleExpr> {
    let alias = scope.postmeta(meta.role, &meta.meta_key);
    let value = col(&alias, "meta_value");
    let compared = match meta.compare {
        MetaCompare::Exists => return Ok(col(&alias, "meta_id").is_not_null()),
        MetaCompare::NotExists => return Ok(col(&alias, "meta_id").is_null()),
        MetaCompare::Equal => value.eq(meta.value.as_str()),
        MetaCompare::NotEqual => value.ne(meta.value.as_str()),
        MetaCompare::Like => value.like(format!("%{}%", escape_like_wildcards(&meta.value))),
        numeric => {
            let number: i64 = meta.value.trim().parse().map_err(|_| {
                QueryError::InvalidArguments(format!(
                    "numeric postmeta comparison needs an integer value, got '{}'",
                    meta.value
                ))
            })?;
            let cast = Expr::expr(Func::cast_as(value, Alias::new("SIGNED")));
            match numeric {
                MetaCompare::Greater => cast.gt(number),
                MetaCompare::GreaterOrEqual => cast.gte(number),
                MetaCompare::Less => cast.lt(number),
                _ => cast.lte(number),
            }
        }
    };
    Ok(on_joined_row(&alias, "meta_value", compared))
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
pub fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::host::Monolingual;
    use crate::query::element_selector::LanguageResolution;
    use crate::query::schema::Schema;
    use sea_query::{Alias, MysqlQueryBuilder, Query};

    fn compile(condition: &Condition) -> String {
        let languages = Monolingual::default();
        let mut scope = QueryScope::new(
            Schema::default(),
            &languages,
            LanguageResolution::monolingual("en"),
        );
        scope.initialize(&condition.fixed_domains());
        let expr = condition.to_expr(&mut scope).unwrap();
        let compiled = scope.finish();

        let mut query = Query::select();
        query
            .expr(Expr::val(1))
            .from_as(
                Alias::new("wp_toolset_associations"),
                Alias::new(ASSOCIATIONS_ALIAS),
            );
        for join in &compiled.joins {
            join.apply(&mut query);
        }
        query.and_where(expr);
        query.to_string(MysqlQueryBuilder)
    }

    #[test]
    fn empty_combinators_are_constants() {
        assert!(matches!(Condition::all([]), Condition::Tautology));
        assert!(matches!(Condition::any([]), Condition::Contradiction));
    }

    #[test]
    fn identity_elements_are_dropped() {
        let c = Condition::all([Condition::relationship_id(3), Condition::tautology()]);
        assert!(matches!(c, Condition::RelationshipId(3)));

        let c = Condition::any([Condition::contradiction(), Condition::association_id(5)]);
        assert!(matches!(c, Condition::AssociationId(5)));
    }

    #[test]
    fn absorbing_elements_win() {
        let c = Condition::all([Condition::relationship_id(3), Condition::contradiction()]);
        assert!(matches!(c, Condition::Contradiction));

        let c = Condition::any([Condition::relationship_id(3), Condition::tautology()]);
        assert!(matches!(c, Condition::Tautology));
    }

    #[test]
    fn nested_combinators_flatten_in_order() {
        let c = Condition::all([
            Condition::relationship_id(1),
            Condition::all([Condition::association_id(2), Condition::intermediary_id(3)]),
        ]);
        let Condition::And(children) = c else {
            panic!("expected a conjunction");
        };
        assert_eq!(children.len(), 3);
        assert!(matches!(children[0], Condition::RelationshipId(1)));
        assert!(matches!(children[2], Condition::IntermediaryId(3)));
    }

    #[test]
    fn double_negation_cancels() {
        let c = Condition::not(Condition::not(Condition::relationship_id(9)));
        assert!(matches!(c, Condition::RelationshipId(9)));
        assert!(matches!(
            Condition::not(Condition::tautology()),
            Condition::Contradiction
        ));
    }

    #[test]
    fn constants_render_as_fixed_comparisons() {
        let sql = compile(&Condition::tautology());
        assert!(sql.contains("WHERE 1 = 1"), "{sql}");
        let sql = compile(&Condition::contradiction());
        assert!(sql.contains("WHERE 1 = 0"), "{sql}");
    }

    #[test]
    fn not_parenthesizes_its_child() {
        let c = Condition::not(Condition::any([
            Condition::relationship_id(1),
            Condition::relationship_id(2),
        ]));
        let sql = compile(&c);
        assert!(sql.contains("NOT ("), "{sql}");

        let sql = compile(&Condition::not(Condition::relationship_id(3)));
        assert!(
            sql.contains("WHERE NOT (`associations`.`relationship_id` = 3)"),
            "{sql}"
        );
    }

    #[test]
    fn joined_row_predicates_are_false_without_a_row() {
        let sql = compile(&Condition::has_type(Role::Parent, "book"));
        assert!(
            sql.contains("`parent_posts`.`ID` IS NOT NULL AND `parent_posts`.`post_type` = 'book'"),
            "{sql}"
        );

        let c = Condition::postmeta(Role::Child, "award", "hugo", MetaCompare::Equal).unwrap();
        let sql = compile(&Condition::not(c));
        assert!(
            sql.contains(
                "NOT (`child_postmeta`.`meta_value` IS NOT NULL AND `child_postmeta`.`meta_value` = 'hugo')"
            ),
            "{sql}"
        );

        let sql = compile(&Condition::search(Role::Child, "dune", true));
        assert!(sql.contains("`child_posts`.`ID` IS NOT NULL AND"), "{sql}");

        let sql = compile(&Condition::intermediary_id(5));
        assert!(
            sql.contains("`associations`.`intermediary_id` IS NOT NULL AND `associations`.`intermediary_id` = 5"),
            "{sql}"
        );
    }

    #[test]
    fn element_condition_guards_domain() {
        let sql = compile(&Condition::parent_id(42, Domain::Posts));
        assert!(sql.contains("`associations`.`parent_id` = 42"), "{sql}");
        assert!(sql.contains("`relationships`.`parent_domain` = 'posts'"), "{sql}");
        assert!(sql.contains("INNER JOIN `wp_toolset_relationships`"), "{sql}");
    }

    #[test]
    fn non_post_intermediary_never_matches() {
        let c = Condition::element(ElementCondition::new(Role::Intermediary, 4, Domain::Users));
        let sql = compile(&c);
        assert!(sql.contains("1 = 0"), "{sql}");
    }

    #[test]
    fn exclude_element_keeps_missing_rows() {
        let c = Condition::exclude_element(ElementCondition::new(Role::Child, 7, Domain::Posts));
        let sql = compile(&c);
        assert!(sql.contains("`associations`.`child_id` IS NULL"), "{sql}");
        assert!(sql.contains("`associations`.`child_id` <> 7"), "{sql}");
        assert!(sql.contains("`relationships`.`child_domain` <> 'posts'"), "{sql}");
    }

    #[test]
    fn status_and_type_share_one_content_join() {
        let c = Condition::all([
            Condition::element_status(Role::Parent, ElementStatus::Public),
            Condition::has_type(Role::Parent, "book"),
        ]);
        let sql = compile(&c);
        assert_eq!(sql.matches("LEFT JOIN `wp_posts`").count(), 1, "{sql}");
        assert!(sql.contains("`parent_posts`.`post_status` = 'publish'"), "{sql}");
        assert!(sql.contains("`parent_posts`.`post_type` = 'book'"), "{sql}");
    }

    #[test]
    fn any_status_needs_no_join() {
        let sql = compile(&Condition::element_status(Role::Child, ElementStatus::Any));
        assert!(!sql.contains("JOIN"), "{sql}");
    }

    #[test]
    fn available_status_excludes_trash() {
        let sql = compile(&Condition::element_status(Role::Child, ElementStatus::Available));
        assert!(
            sql.contains("`child_posts`.`post_status` NOT IN ('trash', 'auto-draft')"),
            "{sql}"
        );
    }

    #[test]
    fn has_domain_and_type_outside_posts_is_contradiction() {
        assert!(matches!(
            Condition::has_domain_and_type(Role::Child, Domain::Users, "author"),
            Condition::Contradiction
        ));
    }

    #[test]
    fn relationship_flags_use_relationships_table() {
        let c = Condition::all([
            Condition::has_active_relationship(true),
            Condition::has_origin(RelationshipOrigin::RepeatableGroup),
        ]);
        let sql = compile(&c);
        assert!(sql.contains("`relationships`.`is_active` = 1"), "{sql}");
        assert!(sql.contains("`relationships`.`origin` = 'repeatable_group'"), "{sql}");
        assert_eq!(sql.matches("`wp_toolset_relationships`").count(), 1, "{sql}");
    }

    #[test]
    fn postmeta_joins_are_keyed_by_meta_key() {
        let c = Condition::all([
            Condition::postmeta(Role::Child, "_price", "10", MetaCompare::Greater).unwrap(),
            Condition::postmeta(Role::Child, "_price", "100", MetaCompare::Less).unwrap(),
            Condition::postmeta(Role::Child, "_color", "red", MetaCompare::Equal).unwrap(),
        ]);
        let sql = compile(&c);
        assert_eq!(sql.matches("LEFT JOIN `wp_postmeta`").count(), 2, "{sql}");
        assert!(sql.contains("CAST(`child_postmeta`.`meta_value` AS SIGNED) > 10"), "{sql}");
        assert!(sql.contains("`child_postmeta_2`.`meta_value` = 'red'"), "{sql}");
    }

    #[test]
    fn numeric_postmeta_rejects_text() {
        let err = Condition::postmeta(Role::Parent, "_price", "cheap", MetaCompare::Less)
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidArguments(_)));
    }

    #[test]
    fn search_escapes_wildcards() {
        let sql = compile(&Condition::search(Role::Parent, "100%", false));
        assert!(sql.contains("`parent_posts`.`post_title` LIKE"), "{sql}");
        assert!(sql.contains("`parent_posts`.`post_excerpt` LIKE"), "{sql}");
        assert!(sql.contains("100\\\\%"), "{sql}");
    }

    #[test]
    fn empty_search_matches_everything() {
        assert!(matches!(
            Condition::search(Role::Child, "   ", true),
            Condition::Tautology
        ));
    }

    #[test]
    fn host_query_requires_acknowledgement() {
        let subquery = Query::select().expr(Expr::val(1)).to_owned();
        let err = Condition::host_query(Role::Parent, subquery.clone(), "yes").unwrap_err();
        assert!(matches!(err, QueryError::MissingAcknowledgement));

        let c = Condition::host_query(Role::Parent, subquery, HOST_QUERY_ACKNOWLEDGEMENT).unwrap();
        let sql = compile(&c);
        assert!(sql.contains("`associations`.`parent_id` IN (SELECT 1)"), "{sql}");
    }

    #[test]
    fn language_hints_respect_opt_out() {
        let c = Condition::any([
            Condition::parent_id(1, Domain::Posts),
            Condition::element(
                ElementCondition::new(Role::Child, 2, Domain::Posts).without_language_hint(),
            ),
            Condition::not(Condition::child_id(3, Domain::Posts)),
        ]);
        assert_eq!(
            c.language_hints(),
            vec![(1, Domain::Posts), (3, Domain::Posts)]
        );
    }

    #[test]
    fn fixed_domains_ignore_disjunctions() {
        let c = Condition::all([
            Condition::has_domain(Role::Parent, Domain::Users),
            Condition::any([
                Condition::has_domain(Role::Child, Domain::Terms),
                Condition::has_domain(Role::Child, Domain::Users),
            ]),
        ]);
        let domains = c.fixed_domains();
        assert_eq!(domains.get(&Role::Parent), Some(&Domain::Users));
        assert!(!domains.contains_key(&Role::Child));
    }

    #[test]
    fn association_id_pins_only_in_conjunction() {
        let pinned = Condition::all([
            Condition::relationship_id(1),
            Condition::association_id(5),
        ]);
        assert!(pinned.pins_association());

        let loose = Condition::any([Condition::association_id(5), Condition::association_id(6)]);
        assert!(!loose.pins_association());
    }

    #[test]
    fn sticky_flag_detection() {
        let c = Condition::any([
            Condition::relationship_id(1),
            Condition::element_status(Role::Parent, ElementStatus::Any),
        ]);
        assert!(c.contains_element_status());
        assert!(!c.contains_active_relationship());
    }

    #[test]
    fn escape_like_wildcards_function() {
        assert_eq!(escape_like_wildcards("hello"), "hello");
        assert_eq!(escape_like_wildcards("100%"), "100\\%");
        assert_eq!(escape_like_wildcards("a_b"), "a\\_b");
        assert_eq!(escape_like_wildcards("a\\b"), "a\\\\b");
    }
}
