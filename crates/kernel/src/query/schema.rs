//! Host table names and column helpers.

use sea_query::{Alias, Expr, SimpleExpr};

use crate::config::EngineConfig;
use crate::models::Role;

/// Alias of the associations table, the FROM of every query.
pub const ASSOCIATIONS_ALIAS: &str = "associations";

/// Alias of the relationship definitions table. Joined at most once.
pub const RELATIONSHIPS_ALIAS: &str = "relationships";

/// Unprefixed table names.
pub const ASSOCIATIONS_TABLE: &str = "toolset_associations";
pub const RELATIONSHIPS_TABLE: &str = "toolset_relationships";
pub const POSTMETA_TABLE: &str = "postmeta";
pub const TRANSLATIONS_TABLE: &str = "icl_translations";

/// Resolves unprefixed table names against the configured prefix.
#[derive(Debug, Clone)]
pub struct Schema {
    prefix: String,
}

impl Schema {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            prefix: config.table_prefix.clone(),
        }
    }

    /// Prefixed name of a host table.
    pub fn table(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

/// `alias`.`column` as an expression.
pub fn col(alias: &str, column: &str) -> Expr {
    Expr::col((Alias::new(alias), Alias::new(column)))
}

/// Associations column holding the element id for `role`.
pub fn element_id_column(role: Role) -> String {
    format!("{}_id", role.as_str())
}

/// Stored (default-language) element id of `role` on the association row.
pub fn stored_element_id(role: Role) -> SimpleExpr {
    col(ASSOCIATIONS_ALIAS, &element_id_column(role)).into()
}

/// Relationships column holding the domain for `role`. Intermediaries have none.
pub fn domain_column(role: Role) -> Option<String> {
    match role {
        Role::Parent | Role::Child => Some(format!("{}_domain", role.as_str())),
        Role::Intermediary => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_table_names() {
        let schema = Schema::default();
        assert_eq!(schema.table(ASSOCIATIONS_TABLE), "wp_toolset_associations");

        let config = EngineConfig::default().with_table_prefix("").unwrap();
        assert_eq!(Schema::new(&config).table(POSTMETA_TABLE), "postmeta");
    }

    #[test]
    fn role_columns() {
        assert_eq!(element_id_column(Role::Intermediary), "intermediary_id");
        assert_eq!(domain_column(Role::Child).as_deref(), Some("child_domain"));
        assert!(domain_column(Role::Intermediary).is_none());
    }
}
