//! Association query orchestration.
//!
//! A query is built, executed once, and then read. [`QueryDraft`] holds the
//! building state and is consumed by [`QueryDraft::execute`], so running a
//! draft twice does not compile. [`AssociationQuery`] wraps the same
//! lifecycle behind `&mut self` methods for callers that keep one query
//! object around, and reports misuse as [`QueryError`]s instead.

use crate::error::{QueryError, QueryResult};
use crate::host::{HostServices, validate_language_code};
use crate::models::{ElementStatus, Role};

use super::condition::Condition;
use super::element_selector::{LanguageResolution, resolve_translation_language};
use super::orderby::OrderBy;
use super::schema::Schema;
use super::sql_builder::{QueryPlan, SqlAssembler};
use super::transformation::{
    AssociationInstances, AssociationUids, ElementIds, ElementInstances, QueryOutput,
    ResultTransformation, TransformContext,
};
use super::types::SortDirection;

/// A query that has not run yet.
#[derive(Debug)]
pub struct QueryDraft {
    services: HostServices,
    conditions: Vec<Condition>,
    limit: Option<u64>,
    limit_pinned: bool,
    offset: u64,
    direction: SortDirection,
    orderby: OrderBy,
    found_rows: bool,
    transformation: Box<dyn ResultTransformation>,
    translation_language: Option<String>,
    has_element_status: bool,
    has_active_relationship: bool,
}

impl QueryDraft {
    /// New query returning association instances.
    pub fn new(services: HostServices) -> Self {
        Self {
            services,
            conditions: Vec::new(),
            limit: None,
            limit_pinned: false,
            offset: 0,
            direction: SortDirection::Asc,
            orderby: OrderBy::None,
            found_rows: false,
            transformation: Box::new(AssociationInstances),
            translation_language: None,
            has_element_status: false,
            has_active_relationship: false,
        }
    }

    pub fn services(&self) -> &HostServices {
        &self.services
    }

    /// Top-level conditions added so far, in order.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Add a condition; all top-level conditions must hold.
    pub fn add(&mut self, condition: impl Into<Condition>) -> &mut Self {
        let condition = condition.into();
        self.has_element_status |= condition.contains_element_status();
        self.has_active_relationship |= condition.contains_active_relationship();
        if condition.pins_association() {
            tracing::trace!("association id condition pins the limit to 1");
            self.limit = Some(1);
            self.limit_pinned = true;
        }
        self.conditions.push(condition);
        self
    }

    /// Maximum number of results. Must be positive.
    pub fn limit(&mut self, limit: i64) -> QueryResult<&mut Self> {
        let limit = u64::try_from(limit)
            .ok()
            .filter(|l| *l > 0)
            .ok_or(QueryError::InvalidLimit(limit))?;
        if self.limit_pinned {
            tracing::trace!(limit, "limit ignored, query is pinned to one association");
        } else {
            self.limit = Some(limit);
        }
        Ok(self)
    }

    /// Number of results to skip. Must not be negative.
    pub fn offset(&mut self, offset: i64) -> QueryResult<&mut Self> {
        self.offset = u64::try_from(offset).map_err(|_| QueryError::InvalidOffset(offset))?;
        Ok(self)
    }

    pub fn order(&mut self, direction: SortDirection) -> &mut Self {
        self.direction = direction;
        self
    }

    pub fn order_by(&mut self, orderby: OrderBy) -> &mut Self {
        self.orderby = orderby;
        self
    }

    pub fn return_association_uids(&mut self) -> &mut Self {
        self.transformation = Box::new(AssociationUids);
        self
    }

    pub fn return_association_instances(&mut self) -> &mut Self {
        self.transformation = Box::new(AssociationInstances);
        self
    }

    pub fn return_element_ids(&mut self, role: Role) -> &mut Self {
        self.transformation = Box::new(ElementIds(role));
        self
    }

    pub fn return_element_instances(&mut self, role: Role) -> &mut Self {
        self.transformation = Box::new(ElementInstances(role));
        self
    }

    /// Also count all matching rows, ignoring the limit.
    pub fn need_found_rows(&mut self) -> &mut Self {
        self.found_rows = true;
        self
    }

    /// Language to show results in when the host shows all languages.
    pub fn set_translation_language(&mut self, language: &str) -> QueryResult<&mut Self> {
        validate_language_code(language)
            .map_err(|e| QueryError::InvalidArguments(e.to_string()))?;
        self.translation_language = Some(language.to_string());
        Ok(self)
    }

    /// Skip the default element status and active relationship conditions.
    pub fn without_default_conditions(&mut self) -> &mut Self {
        self.has_element_status = true;
        self.has_active_relationship = true;
        self
    }

    /// Append the default conditions the caller did not supply.
    ///
    /// Safe to call any number of times: each default is added at most once.
    pub fn apply_default_conditions(&mut self) {
        for condition in self.pending_defaults() {
            self.add(condition);
        }
    }

    fn pending_defaults(&self) -> Vec<Condition> {
        let mut defaults = Vec::new();
        if self.has_element_status {
            tracing::trace!("element status supplied, default suppressed");
        } else {
            tracing::trace!("adding default element status condition");
            defaults.push(Condition::all(
                Role::PARENT_CHILD
                    .map(|role| Condition::element_status(role, ElementStatus::Available)),
            ));
        }
        if self.has_active_relationship {
            tracing::trace!("active relationship condition supplied, default suppressed");
        } else {
            tracing::trace!("adding default active relationship condition");
            defaults.push(Condition::has_active_relationship(true));
        }
        defaults
    }

    fn root(&self, defaults: Vec<Condition>) -> Condition {
        Condition::all(self.conditions.iter().cloned().chain(defaults))
    }

    fn resolve_language(&self, root: &Condition) -> QueryResult<LanguageResolution> {
        resolve_translation_language(
            root,
            self.services.languages.as_ref(),
            &self.services.config.all_languages_code,
            self.translation_language.as_deref(),
        )
    }

    fn assemble(&self, root: &Condition) -> QueryResult<String> {
        let language = self.resolve_language(root)?;
        let plan = QueryPlan {
            root,
            limit: self.limit,
            offset: self.offset,
            orderby: &self.orderby,
            direction: self.direction,
            found_rows: self.found_rows,
            transformation: self.transformation.as_ref(),
        };
        SqlAssembler::new(
            Schema::new(&self.services.config),
            self.services.languages.as_ref(),
            language,
        )
        .assemble(&plan)
    }

    /// The statement this draft would run, defaults included.
    pub fn to_sql(&self) -> QueryResult<String> {
        let root = self.root(self.pending_defaults());
        self.assemble(&root)
    }

    /// Run the query.
    pub fn execute(mut self) -> QueryResult<ExecutedQuery> {
        self.apply_default_conditions();
        let root = self.root(Vec::new());
        let sql = self.assemble(&root)?;

        let rows = self.services.executor.execute(&sql)?;
        let found_rows = if self.found_rows {
            Some(self.services.executor.found_rows()?)
        } else {
            None
        };

        let mut ctx = TransformContext::new(
            self.services.definitions.as_ref(),
            self.services.elements.as_ref(),
        );
        let mut results = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(output) = self.transformation.transform(row, &mut ctx)? {
                results.push(output);
            }
        }
        tracing::debug!(
            rows = rows.len(),
            results = results.len(),
            found_rows = ?found_rows,
            "association query executed"
        );
        Ok(ExecutedQuery {
            results,
            found_rows,
        })
    }
}

/// Results of an executed query.
#[derive(Debug, Clone)]
pub struct ExecutedQuery {
    results: Vec<QueryOutput>,
    found_rows: Option<u64>,
}

impl ExecutedQuery {
    pub fn results(&self) -> &[QueryOutput] {
        &self.results
    }

    pub fn into_results(self) -> Vec<QueryOutput> {
        self.results
    }

    /// Matching rows ignoring the limit. Requires `need_found_rows()`.
    pub fn found_rows(&self) -> QueryResult<u64> {
        self.found_rows.ok_or(QueryError::FoundRowsNotRequested)
    }
}

#[derive(Debug)]
enum QueryState {
    Building(Box<QueryDraft>),
    Executed(ExecutedQuery),
    /// Execution was attempted and failed.
    Failed,
}

/// Single-use association query.
///
/// Builder methods fail with [`QueryError::AlreadyExecuted`] once the query
/// ran; result accessors fail with [`QueryError::NotExecuted`] before.
#[derive(Debug)]
pub struct AssociationQuery {
    state: QueryState,
}

impl AssociationQuery {
    pub fn new(services: HostServices) -> Self {
        Self {
            state: QueryState::Building(Box::new(QueryDraft::new(services))),
        }
    }

    fn draft(&mut self) -> QueryResult<&mut QueryDraft> {
        match &mut self.state {
            QueryState::Building(draft) => Ok(&mut **draft),
            QueryState::Executed(_) | QueryState::Failed => Err(QueryError::AlreadyExecuted),
        }
    }

    pub fn add(&mut self, condition: impl Into<Condition>) -> QueryResult<&mut Self> {
        self.draft()?.add(condition);
        Ok(self)
    }

    pub fn limit(&mut self, limit: i64) -> QueryResult<&mut Self> {
        self.draft()?.limit(limit)?;
        Ok(self)
    }

    pub fn offset(&mut self, offset: i64) -> QueryResult<&mut Self> {
        self.draft()?.offset(offset)?;
        Ok(self)
    }

    pub fn order(&mut self, direction: SortDirection) -> QueryResult<&mut Self> {
        self.draft()?.order(direction);
        Ok(self)
    }

    pub fn order_by(&mut self, orderby: OrderBy) -> QueryResult<&mut Self> {
        self.draft()?.order_by(orderby);
        Ok(self)
    }

    pub fn return_association_uids(&mut self) -> QueryResult<&mut Self> {
        self.draft()?.return_association_uids();
        Ok(self)
    }

    pub fn return_association_instances(&mut self) -> QueryResult<&mut Self> {
        self.draft()?.return_association_instances();
        Ok(self)
    }

    pub fn return_element_ids(&mut self, role: Role) -> QueryResult<&mut Self> {
        self.draft()?.return_element_ids(role);
        Ok(self)
    }

    pub fn return_element_instances(&mut self, role: Role) -> QueryResult<&mut Self> {
        self.draft()?.return_element_instances(role);
        Ok(self)
    }

    pub fn need_found_rows(&mut self) -> QueryResult<&mut Self> {
        self.draft()?.need_found_rows();
        Ok(self)
    }

    pub fn set_translation_language(&mut self, language: &str) -> QueryResult<&mut Self> {
        self.draft()?.set_translation_language(language)?;
        Ok(self)
    }

    pub fn without_default_conditions(&mut self) -> QueryResult<&mut Self> {
        self.draft()?.without_default_conditions();
        Ok(self)
    }

    /// The statement the query would run.
    pub fn to_sql(&mut self) -> QueryResult<String> {
        self.draft()?.to_sql()
    }

    /// Execute the query and return its results. Only the first call runs.
    pub fn get_results(&mut self) -> QueryResult<Vec<QueryOutput>> {
        let draft = match std::mem::replace(&mut self.state, QueryState::Failed) {
            QueryState::Building(draft) => draft,
            executed @ QueryState::Executed(_) => {
                self.state = executed;
                return Err(QueryError::AlreadyExecuted);
            }
            QueryState::Failed => return Err(QueryError::AlreadyExecuted),
        };
        let executed = draft.execute()?;
        let results = executed.results().to_vec();
        self.state = QueryState::Executed(executed);
        Ok(results)
    }

    /// Matching rows ignoring the limit.
    pub fn get_found_rows(&self) -> QueryResult<u64> {
        match &self.state {
            QueryState::Executed(executed) => executed.found_rows(),
            QueryState::Building(_) | QueryState::Failed => Err(QueryError::NotExecuted),
        }
    }

    pub fn is_executed(&self) -> bool {
        !matches!(self.state, QueryState::Building(_))
    }
}
