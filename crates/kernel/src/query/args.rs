//! Typed arguments for "elements related to this element" lookups.
//!
//! Front-end callers describe a related-elements lookup as a JSON object.
//! [`RelatedElementsArgs`] parses it once into recognized options and
//! builds the equivalent [`AssociationQuery`].

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};
use crate::host::HostServices;
use crate::models::{Domain, ElementStatus, Role};

use super::association_query::AssociationQuery;
use super::condition::{Condition, ElementCondition};
use super::orderby::OrderBy;
use super::types::{MetaCast, MetaCompare, SortDirection};

fn default_limit() -> i64 {
    100
}

/// Role whose elements are returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnRole {
    Parent,
    Child,
    Intermediary,
    /// The role opposite to `query_by_role`.
    #[default]
    Other,
}

/// Sort options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgsOrderBy {
    Title,
    MetaValue,
    MetaValueNum,
}

/// What each result is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnShape {
    ElementId,
    #[default]
    ElementObject,
    AssociationUid,
    AssociationObject,
}

/// Postmeta filter on the returned elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaArgs {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub compare: MetaCompare,
}

/// Related-elements lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelatedElementsArgs {
    /// Relationship slug.
    pub relationship: String,

    /// Role the known element plays.
    pub query_by_role: Role,

    /// Id of the known element.
    pub query_by_element: i64,

    #[serde(default)]
    pub role_to_return: ReturnRole,

    #[serde(default = "default_limit")]
    pub limit: i64,

    #[serde(default)]
    pub offset: i64,

    #[serde(default)]
    pub orderby: Option<ArgsOrderBy>,

    /// Meta key for `meta_value` / `meta_value_num` ordering.
    #[serde(default)]
    pub orderby_meta_key: Option<String>,

    #[serde(default)]
    pub order: SortDirection,

    #[serde(default)]
    pub need_found_rows: bool,

    #[serde(rename = "return", default)]
    pub return_shape: ReturnShape,

    /// Text search on the returned elements.
    #[serde(default)]
    pub search: Option<String>,

    #[serde(default)]
    pub meta: Option<MetaArgs>,

    #[serde(default)]
    pub element_status: Option<ElementStatus>,
}

impl RelatedElementsArgs {
    /// Parse arguments from JSON.
    pub fn from_json(json: &str) -> QueryResult<Self> {
        serde_json::from_str(json).map_err(|e| QueryError::InvalidArguments(e.to_string()))
    }

    /// Role whose elements are returned.
    pub fn return_role(&self) -> QueryResult<Role> {
        match self.role_to_return {
            ReturnRole::Parent => Ok(Role::Parent),
            ReturnRole::Child => Ok(Role::Child),
            ReturnRole::Intermediary => Ok(Role::Intermediary),
            ReturnRole::Other => self.query_by_role.other().ok_or_else(|| {
                QueryError::InvalidArguments(
                    "role_to_return 'other' needs query_by_role parent or child".to_string(),
                )
            }),
        }
    }

    /// Build the query. Limit and offset are validated here.
    pub fn into_query(self, services: HostServices) -> QueryResult<AssociationQuery> {
        let return_role = self.return_role()?;
        let orderby = self.orderby(return_role)?;

        let definition = services.definitions.get_definition(&self.relationship)?;
        let (relationship, domain) = match &definition {
            Some(definition) => (
                Condition::relationship(definition),
                definition.domain(self.query_by_role),
            ),
            None => {
                tracing::debug!(
                    slug = %self.relationship,
                    "unknown relationship slug, lookup will match nothing"
                );
                (Condition::contradiction(), Domain::Posts)
            }
        };

        let mut query = AssociationQuery::new(services);
        query
            .limit(self.limit)?
            .offset(self.offset)?
            .add(relationship)?
            .add(ElementCondition::new(
                self.query_by_role,
                self.query_by_element,
                domain,
            ))?
            .order(self.order)?
            .order_by(orderby)?;

        if let Some(text) = &self.search {
            query.add(Condition::search(return_role, text, false))?;
        }
        if let Some(meta) = &self.meta {
            query.add(Condition::postmeta(
                return_role,
                &meta.key,
                &meta.value,
                meta.compare,
            )?)?;
        }
        if let Some(status) = self.element_status {
            query.add(Condition::element_status(return_role, status))?;
        }
        if self.need_found_rows {
            query.need_found_rows()?;
        }
        match self.return_shape {
            ReturnShape::ElementId => query.return_element_ids(return_role)?,
            ReturnShape::ElementObject => query.return_element_instances(return_role)?,
            ReturnShape::AssociationUid => query.return_association_uids()?,
            ReturnShape::AssociationObject => query.return_association_instances()?,
        };
        Ok(query)
    }

    fn orderby(&self, role: Role) -> QueryResult<OrderBy> {
        let meta_key = || {
            self.orderby_meta_key
                .as_deref()
                .filter(|key| !key.is_empty())
                .ok_or_else(|| {
                    QueryError::InvalidArguments(
                        "meta value ordering needs orderby_meta_key".to_string(),
                    )
                })
        };
        Ok(match self.orderby {
            None => OrderBy::None,
            Some(ArgsOrderBy::Title) => OrderBy::title(role),
            Some(ArgsOrderBy::MetaValue) => OrderBy::postmeta(role, meta_key()?, MetaCast::None),
            Some(ArgsOrderBy::MetaValueNum) => {
                OrderBy::postmeta(role, meta_key()?, MetaCast::Signed)
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let args = RelatedElementsArgs::from_json(
            r#"{"relationship": "book-author", "query_by_role": "parent", "query_by_element": 42}"#,
        )
        .unwrap();
        assert_eq!(args.limit, 100);
        assert_eq!(args.offset, 0);
        assert_eq!(args.return_shape, ReturnShape::ElementObject);
        assert_eq!(args.return_role().unwrap(), Role::Child);
    }

    #[test]
    fn unknown_options_are_rejected() {
        let err = RelatedElementsArgs::from_json(
            r#"{"relationship": "a", "query_by_role": "parent", "query_by_element": 1, "posts_per_page": 5}"#,
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::InvalidArguments(_)));
    }

    #[test]
    fn other_role_of_intermediary_is_invalid() {
        let args = RelatedElementsArgs::from_json(
            r#"{"relationship": "a", "query_by_role": "intermediary", "query_by_element": 1}"#,
        )
        .unwrap();
        assert!(matches!(
            args.return_role(),
            Err(QueryError::InvalidArguments(_))
        ));
    }

    #[test]
    fn meta_ordering_needs_a_key() {
        let args = RelatedElementsArgs::from_json(
            r#"{"relationship": "a", "query_by_role": "child", "query_by_element": 1, "orderby": "meta_value_num"}"#,
        )
        .unwrap();
        assert!(matches!(
            args.orderby(Role::Parent),
            Err(QueryError::InvalidArguments(_))
        ));
    }
}
