//! Association query engine.
//!
//! This module provides:
//! - Condition: composable predicate tree compiled to SQL
//! - AssociationQuery / QueryDraft: single-use query orchestration
//! - OrderBy and result transformations: sorting and result shapes
//! - RelatedElementsArgs: typed related-elements lookups
//!
//! Join deduplication, table aliasing and element translation live in
//! private modules and are only reachable through a [`QueryScope`].

mod alias;
pub mod args;
pub mod association_query;
pub mod condition;
mod element_selector;
mod join_manager;
pub mod orderby;
mod schema;
mod scope;
mod sql_builder;
pub mod transformation;
pub mod types;

pub use alias::UniqueAliasGenerator;
pub use args::{ArgsOrderBy, MetaArgs, RelatedElementsArgs, ReturnRole, ReturnShape};
pub use association_query::{AssociationQuery, ExecutedQuery, QueryDraft};
pub use condition::{
    Condition, ElementCondition, HOST_QUERY_ACKNOWLEDGEMENT, PostmetaCondition,
    escape_like_wildcards,
};
pub use element_selector::{LanguageResolution, resolve_translation_language};
pub use orderby::OrderBy;
pub use schema::Schema;
pub use scope::QueryScope;
pub use sql_builder::{QueryPlan, SqlAssembler};
pub use transformation::{
    AssociationInstances, AssociationUids, ElementIds, ElementInstances, QueryOutput,
    ResultShape, ResultTransformation, TransformContext, row_i64,
};
pub use types::{MetaCast, MetaCompare, SortDirection};
