//! Result transformations.
//!
//! A transformation decides which columns a query projects and turns each
//! returned row into one result value. Rows a transformation cannot
//! represent (a missing column, a relationship definition that vanished, an
//! element that failed to load) are dropped with a warning instead of
//! failing the whole query.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::QueryResult;
use crate::host::{DefinitionRepository, ElementRepository, Row};
use crate::models::{Association, Domain, Element, RelationshipDefinition, Role};

use super::schema::{ASSOCIATIONS_ALIAS, col, element_id_column};
use super::scope::QueryScope;

// ---------------------------------------------------------------------------
// Output values
// ---------------------------------------------------------------------------

/// Result shape a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultShape {
    AssociationUids,
    AssociationInstances,
    ElementIds(Role),
    ElementInstances(Role),
}

/// One transformed result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutput {
    AssociationUid(i64),
    Association(Box<Association>),
    ElementId(i64),
    Element(Element),
}

impl QueryOutput {
    /// Numeric id carried by id-shaped outputs.
    pub fn as_id(&self) -> Option<i64> {
        match self {
            QueryOutput::AssociationUid(id) | QueryOutput::ElementId(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_association(&self) -> Option<&Association> {
        match self {
            QueryOutput::Association(association) => Some(association),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            QueryOutput::Element(element) => Some(element),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Collaborators and per-execution caches available while transforming rows.
pub struct TransformContext<'a> {
    definitions: &'a dyn DefinitionRepository,
    elements: &'a dyn ElementRepository,
    definition_cache: HashMap<i64, Option<RelationshipDefinition>>,
}

impl<'a> TransformContext<'a> {
    pub fn new(
        definitions: &'a dyn DefinitionRepository,
        elements: &'a dyn ElementRepository,
    ) -> Self {
        Self {
            definitions,
            elements,
            definition_cache: HashMap::new(),
        }
    }

    /// Definition by id, looked up at most once per execution.
    pub fn definition(&mut self, id: i64) -> QueryResult<Option<RelationshipDefinition>> {
        if let Some(cached) = self.definition_cache.get(&id) {
            return Ok(cached.clone());
        }
        let definition = self.definitions.get_definition_by_id(id)?;
        self.definition_cache.insert(id, definition.clone());
        Ok(definition)
    }

    pub fn load_element(&self, domain: Domain, id: i64) -> QueryResult<Option<Element>> {
        Ok(self.elements.load_element(domain, id)?)
    }
}

// ---------------------------------------------------------------------------
// Strategy trait
// ---------------------------------------------------------------------------

/// Turns result rows into one of the query's result shapes.
pub trait ResultTransformation: Send + Sync + fmt::Debug {
    fn shape(&self) -> ResultShape;

    /// Ask the scope for every column [`transform`](Self::transform) reads.
    fn request_columns(&self, scope: &mut QueryScope<'_>);

    /// Transform one row; `None` drops it.
    fn transform(&self, row: &Row, ctx: &mut TransformContext<'_>)
    -> QueryResult<Option<QueryOutput>>;
}

const ASSOCIATION_UID: &str = "association_uid";
const RELATIONSHIP_ID: &str = "relationship_id";

/// Association row ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssociationUids;

impl ResultTransformation for AssociationUids {
    fn shape(&self) -> ResultShape {
        ResultShape::AssociationUids
    }

    fn request_columns(&self, scope: &mut QueryScope<'_>) {
        scope.select(col(ASSOCIATIONS_ALIAS, "id").into(), ASSOCIATION_UID);
    }

    fn transform(
        &self,
        row: &Row,
        _ctx: &mut TransformContext<'_>,
    ) -> QueryResult<Option<QueryOutput>> {
        Ok(required_id(row, ASSOCIATION_UID).map(QueryOutput::AssociationUid))
    }
}

/// Full associations with their definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssociationInstances;

impl ResultTransformation for AssociationInstances {
    fn shape(&self) -> ResultShape {
        ResultShape::AssociationInstances
    }

    fn request_columns(&self, scope: &mut QueryScope<'_>) {
        scope.select(col(ASSOCIATIONS_ALIAS, "id").into(), ASSOCIATION_UID);
        scope.select(col(ASSOCIATIONS_ALIAS, RELATIONSHIP_ID).into(), RELATIONSHIP_ID);
        for role in Role::ALL {
            scope.request_element_id(role);
        }
    }

    fn transform(
        &self,
        row: &Row,
        ctx: &mut TransformContext<'_>,
    ) -> QueryResult<Option<QueryOutput>> {
        let (Some(uid), Some(relationship_id), Some(parent_id), Some(child_id)) = (
            required_id(row, ASSOCIATION_UID),
            required_id(row, RELATIONSHIP_ID),
            required_id(row, &element_id_column(Role::Parent)),
            required_id(row, &element_id_column(Role::Child)),
        ) else {
            return Ok(None);
        };
        let Some(relationship) = ctx.definition(relationship_id)? else {
            tracing::warn!(
                association_uid = uid,
                relationship_id,
                "dropping association with unknown relationship definition"
            );
            return Ok(None);
        };
        let intermediary_id =
            row_i64(row, &element_id_column(Role::Intermediary)).filter(|id| *id > 0);
        Ok(Some(QueryOutput::Association(Box::new(Association {
            uid,
            relationship,
            parent_id,
            child_id,
            intermediary_id,
        }))))
    }
}

/// Ids of the elements in one role.
#[derive(Debug, Clone, Copy)]
pub struct ElementIds(pub Role);

impl ResultTransformation for ElementIds {
    fn shape(&self) -> ResultShape {
        ResultShape::ElementIds(self.0)
    }

    fn request_columns(&self, scope: &mut QueryScope<'_>) {
        scope.request_element_id(self.0);
    }

    fn transform(
        &self,
        row: &Row,
        _ctx: &mut TransformContext<'_>,
    ) -> QueryResult<Option<QueryOutput>> {
        let column = element_id_column(self.0);
        Ok(required_id(row, &column)
            .filter(|id| *id > 0)
            .map(QueryOutput::ElementId))
    }
}

/// Loaded elements in one role.
#[derive(Debug, Clone, Copy)]
pub struct ElementInstances(pub Role);

impl ResultTransformation for ElementInstances {
    fn shape(&self) -> ResultShape {
        ResultShape::ElementInstances(self.0)
    }

    fn request_columns(&self, scope: &mut QueryScope<'_>) {
        scope.request_element_id(self.0);
        scope.request_element_domain(self.0);
    }

    fn transform(
        &self,
        row: &Row,
        ctx: &mut TransformContext<'_>,
    ) -> QueryResult<Option<QueryOutput>> {
        let role = self.0;
        let Some(id) = required_id(row, &element_id_column(role)).filter(|id| *id > 0) else {
            return Ok(None);
        };
        let domain_column = format!("{role}_domain");
        let domain = match row.get(&domain_column).and_then(Value::as_str) {
            Some(name) => name.parse::<Domain>()?,
            None => {
                tracing::warn!(column = %domain_column, "dropping row without element domain");
                return Ok(None);
            }
        };
        match ctx.load_element(domain, id)? {
            Some(element) => Ok(Some(QueryOutput::Element(element))),
            None => {
                tracing::warn!(
                    element_id = id,
                    domain = %domain,
                    "dropping element that failed to load"
                );
                Ok(None)
            }
        }
    }
}

/// Integer column value; drivers may hand numbers back as strings.
pub fn row_i64(row: &Row, column: &str) -> Option<i64> {
    match row.get(column)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Like [`row_i64`], warning when the column is missing or not an integer.
fn required_id(row: &Row, column: &str) -> Option<i64> {
    let id = row_i64(row, column);
    if id.is_none() {
        tracing::warn!(column = %column, "dropping row without an integer id column");
    }
    id
}
