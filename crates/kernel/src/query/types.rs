//! Shared query enums.

use sea_query::Order;
use serde::{Deserialize, Serialize};

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl From<SortDirection> for Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        }
    }
}

/// Comparison operators for postmeta conditions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetaCompare {
    /// Exact string match.
    #[default]
    Equal,
    NotEqual,
    /// Numeric comparison (meta value cast to SIGNED).
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    /// Substring match.
    Like,
    /// A meta row with the key exists; the value is ignored.
    Exists,
    /// No meta row with the key exists; the value is ignored.
    NotExists,
}

impl MetaCompare {
    /// Whether the comparison casts the stored value to an integer.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            MetaCompare::Greater
                | MetaCompare::GreaterOrEqual
                | MetaCompare::Less
                | MetaCompare::LessOrEqual
        )
    }
}

/// How a postmeta value is cast before sorting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetaCast {
    /// Sort as text.
    #[default]
    None,
    /// Sort as integer.
    Signed,
    /// Sort as decimal number.
    Decimal,
}

impl MetaCast {
    /// SQL type name for `CAST(.. AS ..)`, if any.
    pub fn sql_type(&self) -> Option<&'static str> {
        match self {
            MetaCast::None => None,
            MetaCast::Signed => Some("SIGNED"),
            MetaCast::Decimal => Some("DECIMAL(20,6)"),
        }
    }
}
