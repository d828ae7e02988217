//! SQL assembly.
//!
//! Turns a finished query plan into one MySQL SELECT statement. The order
//! of the steps matters: the orderby registers its joins before the WHERE
//! clause is compiled, and the result transformation requests its columns
//! before the join list is closed, so only joins something actually uses
//! are rendered.

use sea_query::{Alias, MysqlQueryBuilder, Order, Query};

use crate::error::{QueryError, QueryResult};
use crate::host::LanguageService;

use super::condition::Condition;
use super::element_selector::LanguageResolution;
use super::orderby::OrderBy;
use super::schema::{ASSOCIATIONS_ALIAS, ASSOCIATIONS_TABLE, Schema, col};
use super::scope::QueryScope;
use super::transformation::ResultTransformation;
use super::types::SortDirection;

/// Everything the assembler needs from a query.
#[derive(Debug, Clone, Copy)]
pub struct QueryPlan<'q> {
    pub root: &'q Condition,
    pub limit: Option<u64>,
    pub offset: u64,
    pub orderby: &'q OrderBy,
    pub direction: SortDirection,
    pub found_rows: bool,
    pub transformation: &'q dyn ResultTransformation,
}

/// Builds SQL statements for one schema and language setup.
pub struct SqlAssembler<'a> {
    schema: Schema,
    languages: &'a dyn LanguageService,
    language: LanguageResolution,
}

impl<'a> SqlAssembler<'a> {
    pub fn new(
        schema: Schema,
        languages: &'a dyn LanguageService,
        language: LanguageResolution,
    ) -> Self {
        Self {
            schema,
            languages,
            language,
        }
    }

    /// Assemble the statement for `plan`.
    pub fn assemble(self, plan: &QueryPlan<'_>) -> QueryResult<String> {
        let limit = plan.limit.ok_or(QueryError::MissingLimit)?;

        let table = self.schema.table(ASSOCIATIONS_TABLE);
        let mut scope = QueryScope::new(self.schema, self.languages, self.language);
        scope.initialize(&plan.root.fixed_domains());

        let order_expr = plan.orderby.register(&mut scope);
        let where_expr = plan.root.to_expr(&mut scope)?;
        plan.transformation.request_columns(&mut scope);
        let compiled = scope.finish();

        let mut query = Query::select();
        if compiled.columns.is_empty() {
            query.expr_as(col(ASSOCIATIONS_ALIAS, "id"), Alias::new("association_uid"));
        }
        for (expr, alias) in compiled.columns {
            query.expr_as(expr, Alias::new(alias));
        }
        query.from_as(Alias::new(table), Alias::new(ASSOCIATIONS_ALIAS));
        for join in &compiled.joins {
            join.apply(&mut query);
        }
        query.and_where(where_expr);

        let association_id = (Alias::new(ASSOCIATIONS_ALIAS), Alias::new("id"));
        match order_expr {
            Some(expr) => {
                query.order_by_expr(expr, plan.direction.into());
                query.order_by(association_id, Order::Asc);
            }
            None => {
                query.order_by(association_id, plan.direction.into());
            }
        }
        query.limit(limit).offset(plan.offset);

        let mut sql = query.to_string(MysqlQueryBuilder);
        if plan.found_rows {
            sql = with_found_rows(&sql);
        }

        tracing::debug!(
            sql = %sql,
            limit,
            offset = plan.offset,
            shape = ?plan.transformation.shape(),
            "assembled association query"
        );
        Ok(sql)
    }
}

/// Ask MySQL to remember the unlimited row count for `FOUND_ROWS()`.
fn with_found_rows(sql: &str) -> String {
    match sql.strip_prefix("SELECT ") {
        Some(rest) => format!("SELECT SQL_CALC_FOUND_ROWS {rest}"),
        None => sql.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::host::Monolingual;
    use crate::models::{Domain, Role};
    use crate::query::transformation::{AssociationUids, ElementIds};

    fn assemble(plan: &QueryPlan<'_>) -> QueryResult<String> {
        let languages = Monolingual::default();
        SqlAssembler::new(
            Schema::default(),
            &languages,
            LanguageResolution::monolingual("en"),
        )
        .assemble(plan)
    }

    fn plan<'q>(
        root: &'q Condition,
        orderby: &'q OrderBy,
        transformation: &'q dyn ResultTransformation,
    ) -> QueryPlan<'q> {
        QueryPlan {
            root,
            limit: Some(10),
            offset: 0,
            orderby,
            direction: SortDirection::Asc,
            found_rows: false,
            transformation,
        }
    }

    #[test]
    fn missing_limit_fails() {
        let root = Condition::tautology();
        let orderby = OrderBy::None;
        let mut plan = plan(&root, &orderby, &AssociationUids);
        plan.limit = None;
        assert!(matches!(assemble(&plan), Err(QueryError::MissingLimit)));
    }

    #[test]
    fn basic_statement_shape() {
        let root = Condition::relationship_id(3);
        let orderby = OrderBy::None;
        let mut plan = plan(&root, &orderby, &AssociationUids);
        plan.offset = 20;
        let sql = assemble(&plan).unwrap();
        assert!(
            sql.starts_with("SELECT `associations`.`id` AS `association_uid` FROM `wp_toolset_associations` AS `associations`"),
            "{sql}"
        );
        assert!(sql.contains("WHERE `associations`.`relationship_id` = 3"), "{sql}");
        assert!(sql.contains("ORDER BY `associations`.`id` ASC"), "{sql}");
        assert!(sql.ends_with("LIMIT 10 OFFSET 20"), "{sql}");
    }

    #[test]
    fn found_rows_prefix() {
        let root = Condition::tautology();
        let orderby = OrderBy::None;
        let mut plan = plan(&root, &orderby, &AssociationUids);
        plan.found_rows = true;
        let sql = assemble(&plan).unwrap();
        assert!(sql.starts_with("SELECT SQL_CALC_FOUND_ROWS `associations`.`id`"), "{sql}");
    }

    #[test]
    fn orderby_comes_before_tiebreaker() {
        let root = Condition::tautology();
        let orderby = OrderBy::title(Role::Child);
        let mut plan = plan(&root, &orderby, &AssociationUids);
        plan.direction = SortDirection::Desc;
        let sql = assemble(&plan).unwrap();
        let order = &sql[sql.find("ORDER BY").unwrap()..];
        assert!(order.contains("DESC, `associations`.`id` ASC"), "{sql}");
    }

    #[test]
    fn shared_parent_join_is_rendered_once() {
        let root = Condition::all([
            Condition::parent_id(42, Domain::Posts),
            Condition::has_type(Role::Parent, "book"),
            Condition::search(Role::Parent, "rust", false),
        ]);
        let transformation = ElementIds(Role::Child);
        let sql = assemble(&plan(&root, &OrderBy::title(Role::Parent), &transformation)).unwrap();
        assert_eq!(sql.matches("LEFT JOIN `wp_posts`").count(), 1, "{sql}");
        assert_eq!(sql.matches("JOIN `wp_toolset_relationships`").count(), 1, "{sql}");
        assert!(sql.contains("`associations`.`child_id` AS `child_id`"), "{sql}");
    }

    #[test]
    fn association_uids_emit_no_translation_joins() {
        let languages = Monolingual::new("en");
        let resolution = LanguageResolution {
            multilingual: true,
            default_language: "en".to_string(),
            language: "de".to_string(),
        };
        let root = Condition::relationship_id(1);
        let sql = SqlAssembler::new(Schema::default(), &languages, resolution)
            .assemble(&plan(&root, &OrderBy::None, &AssociationUids))
            .unwrap();
        assert!(!sql.contains("icl_translations"), "{sql}");
    }
}
