//! Result ordering strategies.
//!
//! An orderby registers its joins before the WHERE clause is compiled and
//! hands back the expression to sort by. Every query additionally sorts by
//! association id, so rows with equal sort keys come back in insertion
//! order.

use sea_query::{Alias, Func, SimpleExpr};
use serde::{Deserialize, Serialize};

use crate::models::{Domain, Role};

use super::schema::col;
use super::scope::QueryScope;
use super::types::MetaCast;

/// What to sort results by.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "by")]
pub enum OrderBy {
    /// Association id only.
    #[default]
    None,
    /// Title of the element in `role`.
    Title { role: Role },
    /// Value of the element's `meta_key` postmeta row.
    Postmeta {
        role: Role,
        meta_key: String,
        #[serde(default)]
        cast: MetaCast,
    },
}

impl OrderBy {
    pub fn title(role: Role) -> Self {
        OrderBy::Title { role }
    }

    pub fn postmeta(role: Role, meta_key: &str, cast: MetaCast) -> Self {
        OrderBy::Postmeta {
            role,
            meta_key: meta_key.to_string(),
            cast,
        }
    }

    /// Register joins and return the sort expression, if any.
    pub(crate) fn register(&self, scope: &mut QueryScope<'_>) -> Option<SimpleExpr> {
        match self {
            OrderBy::None => None,
            OrderBy::Title { role } => Some(title_expr(*role, scope)),
            OrderBy::Postmeta {
                role,
                meta_key,
                cast,
            } => {
                let alias = scope.postmeta(*role, meta_key);
                Some(match cast.sql_type() {
                    Some(sql_type) => {
                        Func::cast_as(col(&alias, "meta_value"), Alias::new(sql_type)).into()
                    }
                    None => col(&alias, "meta_value").into(),
                })
            }
        }
    }
}

/// Title column of the element in `role`.
///
/// When the role's domain is not pinned by the conditions, the first
/// non-null title across all domains is used.
fn title_expr(role: Role, scope: &mut QueryScope<'_>) -> SimpleExpr {
    match scope.fixed_domain(role) {
        Some(domain) => domain_title(role, domain, scope),
        None => {
            let titles: Vec<SimpleExpr> = [Domain::Posts, Domain::Terms, Domain::Users]
                .into_iter()
                .map(|domain| domain_title(role, domain, scope))
                .collect();
            Func::coalesce(titles).into()
        }
    }
}

fn domain_title(role: Role, domain: Domain, scope: &mut QueryScope<'_>) -> SimpleExpr {
    let alias = scope.content(role, domain);
    col(&alias, domain.content_table().title_column).into()
}
