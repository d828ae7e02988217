//! Elements, roles and content domains.
//!
//! An element is one piece of host content (a post, a term or a user)
//! taking part in an association in a given role.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Side of an association a predicate or projection applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Parent,
    Child,
    Intermediary,
}

impl Role {
    /// The two roles every association has.
    pub const PARENT_CHILD: [Role; 2] = [Role::Parent, Role::Child];

    /// All roles, in column order.
    pub const ALL: [Role; 3] = [Role::Parent, Role::Child, Role::Intermediary];

    /// Lowercase name, also used as the column prefix in the associations table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Parent => "parent",
            Role::Child => "child",
            Role::Intermediary => "intermediary",
        }
    }

    /// The opposite primary role. The intermediary has no opposite.
    pub fn other(&self) -> Option<Role> {
        match self {
            Role::Parent => Some(Role::Child),
            Role::Child => Some(Role::Parent),
            Role::Intermediary => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content category an element belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Posts,
    Terms,
    Users,
}

impl Domain {
    /// Name stored in the relationship definition's domain columns.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Posts => "posts",
            Domain::Terms => "terms",
            Domain::Users => "users",
        }
    }

    /// Only posts have language versions.
    pub fn is_translatable(&self) -> bool {
        matches!(self, Domain::Posts)
    }

    /// Shape of the host table holding this domain's content rows.
    pub fn content_table(&self) -> ContentTable {
        match self {
            Domain::Posts => ContentTable {
                table: "posts",
                id_column: "ID",
                type_column: Some("post_type"),
                status_column: Some("post_status"),
                title_column: "post_title",
                search_columns: &["post_title", "post_content", "post_excerpt"],
            },
            Domain::Terms => ContentTable {
                table: "terms",
                id_column: "term_id",
                type_column: None,
                status_column: None,
                title_column: "name",
                search_columns: &["name"],
            },
            Domain::Users => ContentTable {
                table: "users",
                id_column: "ID",
                type_column: None,
                status_column: None,
                title_column: "display_name",
                search_columns: &["display_name"],
            },
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "posts" => Ok(Domain::Posts),
            "terms" => Ok(Domain::Terms),
            "users" => Ok(Domain::Users),
            other => Err(QueryError::UnknownDomain(other.to_string())),
        }
    }
}

/// Column layout of a domain's content table (names without the table prefix).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentTable {
    pub table: &'static str,
    pub id_column: &'static str,
    pub type_column: Option<&'static str>,
    pub status_column: Option<&'static str>,
    pub title_column: &'static str,
    pub search_columns: &'static [&'static str],
}

/// Element status filter.
///
/// The meaning depends on the domain: for posts "available" excludes
/// trashed and auto-draft posts and "public" means published. Terms and
/// users have no status, so every filter matches them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementStatus {
    Any,
    #[default]
    Available,
    Public,
}

/// Post statuses that are never "available".
pub const UNAVAILABLE_POST_STATUSES: &[&str] = &["trash", "auto-draft"];

/// The post status considered public.
pub const PUBLIC_POST_STATUS: &str = "publish";

/// A loaded host element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Element identifier in its domain.
    pub id: i64,

    /// Content domain.
    pub domain: Domain,

    /// Display title.
    pub title: String,

    /// Post type, for posts.
    pub element_type: Option<String>,

    /// Post status, for posts.
    pub status: Option<String>,
}
