//! Element selection and translation resolution.
//!
//! Association rows store every element in the site's default language.
//! When results must be shown in another language, the selector joins the
//! translations table for each role that is actually used and projects the
//! translated id instead of the stored one, falling back to the stored id
//! when no translation exists.

use std::collections::{BTreeMap, HashMap};

use sea_query::{Alias, Cond, Expr, Func, SimpleExpr};

use crate::error::QueryResult;
use crate::host::LanguageService;
use crate::models::{Domain, Role};

use super::condition::Condition;
use super::join_manager::{JoinClause, JoinManager};
use super::schema::{
    ASSOCIATIONS_ALIAS, TRANSLATIONS_TABLE, col, domain_column, element_id_column,
    stored_element_id,
};

/// Outcome of translation language resolution for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageResolution {
    /// Whether a multilingual plugin is active.
    pub multilingual: bool,
    /// Language association rows are stored in.
    pub default_language: String,
    /// Language results are shown in.
    pub language: String,
}

impl LanguageResolution {
    /// Monolingual resolution: nothing is ever translated.
    pub fn monolingual(language: &str) -> Self {
        Self {
            multilingual: false,
            default_language: language.to_string(),
            language: language.to_string(),
        }
    }

    /// Language the selector must translate into, if translation joins are needed.
    pub fn translation_target(&self) -> Option<&str> {
        (self.multilingual && self.language != self.default_language)
            .then_some(self.language.as_str())
    }
}

/// Pick the language results are shown in.
///
/// Outside of "all languages" mode the host's current language is used.
/// In that mode, an element predicate that opted in sets the language from
/// its own element; otherwise the caller's override wins; otherwise the
/// default language. Only the declarative opt-in flags matter, never the
/// order in which predicates are compiled.
pub fn resolve_translation_language(
    root: &Condition,
    languages: &dyn LanguageService,
    all_languages_code: &str,
    requested: Option<&str>,
) -> QueryResult<LanguageResolution> {
    let default_language = languages.default_language();
    if !languages.is_multilingual() {
        return Ok(LanguageResolution::monolingual(&default_language));
    }

    let resolved = |language: String| LanguageResolution {
        multilingual: true,
        default_language: default_language.clone(),
        language,
    };

    if !languages.is_all_languages_mode(all_languages_code) {
        return Ok(resolved(languages.current_language()));
    }

    let mut from_elements: Option<String> = None;
    for (id, domain) in root.language_hints() {
        let Some(language) = languages.element_language(id, domain)? else {
            continue;
        };
        match &from_elements {
            None => from_elements = Some(language),
            Some(chosen) if *chosen != language => {
                tracing::warn!(
                    element_id = id,
                    chosen = %chosen,
                    ignored = %language,
                    "element conditions ask for conflicting translation languages"
                );
            }
            Some(_) => {}
        }
    }

    let language = from_elements
        .or_else(|| requested.map(str::to_string))
        .unwrap_or_else(|| default_language.clone());
    Ok(resolved(language))
}

/// Per-role selection state.
#[derive(Debug, Default)]
struct RoleSelection {
    /// Translation joins are possible for this role.
    translatable: bool,
    /// Cached element id expression; set on first use.
    element_id: Option<SimpleExpr>,
    joins: Vec<JoinClause>,
    id_in_results: bool,
    domain_in_results: bool,
}

/// Projects element ids per role, translating them when required.
#[derive(Debug)]
pub struct ElementSelector {
    translation: Option<String>,
    roles: BTreeMap<Role, RoleSelection>,
}

impl ElementSelector {
    pub fn new(translation: Option<String>) -> Self {
        Self {
            translation,
            roles: Role::ALL
                .into_iter()
                .map(|role| (role, RoleSelection::default()))
                .collect(),
        }
    }

    /// Decide, before any condition is compiled, which roles may need translation.
    ///
    /// A role whose domain is statically known to be untranslatable never
    /// gets translation joins.
    pub fn initialize(&mut self, fixed_domains: &HashMap<Role, Domain>) {
        let translating = self.translation.is_some();
        for (role, selection) in self.roles.iter_mut() {
            let domain = match role {
                Role::Intermediary => Some(Domain::Posts),
                _ => fixed_domains.get(role).copied(),
            };
            selection.translatable =
                translating && domain.is_none_or(|domain| domain.is_translatable());
        }
    }

    pub fn translation_language(&self) -> Option<&str> {
        self.translation.as_deref()
    }

    /// Element id of `role` as shown in results: translated when needed.
    pub fn element_id(&mut self, role: Role, joins: &mut JoinManager) -> SimpleExpr {
        let language = self.translation.clone();
        let selection = self.selection(role);
        if let Some(expr) = &selection.element_id {
            return expr.clone();
        }

        let expr = match language {
            Some(language) if selection.translatable => {
                let (clauses, expr) = translation_joins(role, &language, joins);
                selection.joins = clauses;
                expr
            }
            _ => stored_element_id(role),
        };
        selection.element_id = Some(expr.clone());
        expr
    }

    /// Include `role`'s element id in the projection.
    pub fn request_id(&mut self, role: Role) {
        self.selection(role).id_in_results = true;
    }

    /// Include `role`'s domain in the projection.
    pub fn request_domain(&mut self, role: Role) {
        self.selection(role).domain_in_results = true;
    }

    /// Final SELECT fragments, as (expression, column alias) pairs.
    pub fn select_fragments(&mut self, joins: &mut JoinManager) -> Vec<(SimpleExpr, String)> {
        let mut fragments = Vec::new();
        for role in Role::ALL {
            let (want_id, want_domain) = {
                let selection = self.selection(role);
                (selection.id_in_results, selection.domain_in_results)
            };
            if want_id {
                fragments.push((self.element_id(role, joins), element_id_column(role)));
            }
            if want_domain {
                let expr = match domain_column(role) {
                    Some(column) => col(joins.relationships(), &column).into(),
                    None => Expr::val(Domain::Posts.as_str()).into(),
                };
                fragments.push((expr, format!("{}_domain", role.as_str())));
            }
        }
        fragments
    }

    /// Translation joins of every role that used them, in role order.
    pub fn into_joins(self) -> Vec<JoinClause> {
        self.roles
            .into_values()
            .flat_map(|selection| selection.joins)
            .collect()
    }

    fn selection(&mut self, role: Role) -> &mut RoleSelection {
        self.roles.entry(role).or_default()
    }
}

/// Joins resolving `role`'s stored element to its translation in `language`.
fn translation_joins(
    role: Role,
    language: &str,
    joins: &mut JoinManager,
) -> (Vec<JoinClause>, SimpleExpr) {
    let table = joins.schema().table(TRANSLATIONS_TABLE);
    let source = joins.allocate_alias(&format!("{role}_translation_source"));
    let target = joins.allocate_alias(&format!("{role}_translation"));
    let stored = element_id_column(role);

    let mut source_on = Cond::all()
        .add(
            Expr::col((Alias::new(&source), Alias::new("element_id")))
                .equals((Alias::new(ASSOCIATIONS_ALIAS), Alias::new(&stored))),
        )
        .add(col(&source, "element_type").like("post_%"));
    if let Some(column) = domain_column(role) {
        source_on = source_on.add(col(joins.relationships(), &column).eq(Domain::Posts.as_str()));
    }

    let target_on = Cond::all()
        .add(
            Expr::col((Alias::new(&target), Alias::new("trid")))
                .equals((Alias::new(&source), Alias::new("trid"))),
        )
        .add(
            Expr::col((Alias::new(&target), Alias::new("element_type")))
                .equals((Alias::new(&source), Alias::new("element_type"))),
        )
        .add(col(&target, "language_code").eq(language));

    let expr: SimpleExpr = Func::coalesce([
        col(&target, "element_id").into(),
        stored_element_id(role),
    ])
    .into();

    (
        vec![
            JoinClause::left(table.clone(), source, source_on),
            JoinClause::left(table, target, target_on),
        ],
        expr,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::query::schema::Schema;

    #[test]
    fn untranslated_selector_uses_stored_ids() {
        let mut joins = JoinManager::new(Schema::default());
        let mut selector = ElementSelector::new(None);
        selector.initialize(&HashMap::new());

        selector.element_id(Role::Parent, &mut joins);
        assert!(selector.into_joins().is_empty());
        assert!(joins.into_ordered(Vec::new()).is_empty());
    }

    #[test]
    fn translated_selector_joins_once_per_role() {
        let mut joins = JoinManager::new(Schema::default());
        let mut selector = ElementSelector::new(Some("de".to_string()));
        selector.initialize(&HashMap::new());

        selector.element_id(Role::Child, &mut joins);
        selector.element_id(Role::Child, &mut joins);
        let clauses = selector.into_joins();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].alias, "child_translation_source");
        assert_eq!(clauses[1].alias, "child_translation");
        let ordered = joins.into_ordered(Vec::new());
        assert!(ordered.iter().any(|join| join.alias == "relationships"));
    }

    #[test]
    fn statically_untranslatable_role_skips_joins() {
        let mut joins = JoinManager::new(Schema::default());
        let mut selector = ElementSelector::new(Some("de".to_string()));
        selector.initialize(&HashMap::from([(Role::Parent, Domain::Users)]));

        selector.element_id(Role::Parent, &mut joins);
        assert!(selector.into_joins().is_empty());
    }

    #[test]
    fn unused_roles_get_no_joins() {
        let mut joins = JoinManager::new(Schema::default());
        let mut selector = ElementSelector::new(Some("de".to_string()));
        selector.initialize(&HashMap::new());
        selector.request_id(Role::Parent);

        let fragments = selector.select_fragments(&mut joins);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].1, "parent_id");
        let aliases: Vec<String> = selector.into_joins().into_iter().map(|j| j.alias).collect();
        assert_eq!(aliases, vec!["parent_translation_source", "parent_translation"]);
    }

    #[test]
    fn translation_target_only_when_language_differs() {
        let mut resolution = LanguageResolution::monolingual("en");
        assert_eq!(resolution.translation_target(), None);

        resolution.multilingual = true;
        assert_eq!(resolution.translation_target(), None);

        resolution.language = "fr".to_string();
        assert_eq!(resolution.translation_target(), Some("fr"));
    }
}
