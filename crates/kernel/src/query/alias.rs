//! Collision-free table aliases for one query.

use std::collections::{HashMap, HashSet};

use super::schema::{ASSOCIATIONS_ALIAS, RELATIONSHIPS_ALIAS};

/// Issues unique SQL table aliases within one query's lifetime.
///
/// The first alias for a base name is the base name itself; later ones get
/// a numeric suffix (`parent_posts`, `parent_posts_2`, ...). The fixed
/// aliases of the associations and relationships tables are reserved.
#[derive(Debug, Clone)]
pub struct UniqueAliasGenerator {
    issued: HashSet<String>,
    counters: HashMap<String, usize>,
}

impl UniqueAliasGenerator {
    pub fn new() -> Self {
        let issued = [ASSOCIATIONS_ALIAS, RELATIONSHIPS_ALIAS]
            .into_iter()
            .map(str::to_string)
            .collect();
        Self {
            issued,
            counters: HashMap::new(),
        }
    }

    /// Return an alias derived from `base` that has not been issued before.
    pub fn generate(&mut self, base: &str) -> String {
        let base = sanitize(base);
        let counter = self.counters.entry(base.clone()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = if *counter == 1 {
                base.clone()
            } else {
                format!("{base}_{counter}")
            };
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

impl Default for UniqueAliasGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep only identifier-safe characters.
fn sanitize(base: &str) -> String {
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "t".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn first_alias_is_the_base_name() {
        let mut aliases = UniqueAliasGenerator::new();
        assert_eq!(aliases.generate("parent_posts"), "parent_posts");
        assert_eq!(aliases.generate("parent_posts"), "parent_posts_2");
        assert_eq!(aliases.generate("parent_posts"), "parent_posts_3");
    }

    #[test]
    fn reserved_aliases_are_never_issued() {
        let mut aliases = UniqueAliasGenerator::new();
        assert_eq!(aliases.generate("associations"), "associations_2");
        assert_eq!(aliases.generate("relationships"), "relationships_2");
    }

    #[test]
    fn suffixed_alias_does_not_clash_with_literal_base() {
        let mut aliases = UniqueAliasGenerator::new();
        assert_eq!(aliases.generate("meta_2"), "meta_2");
        assert_eq!(aliases.generate("meta"), "meta");
        assert_eq!(aliases.generate("meta"), "meta_3");
    }

    #[test]
    fn many_aliases_are_unique() {
        let mut aliases = UniqueAliasGenerator::new();
        let mut seen = HashSet::new();
        for base in ["a", "a_2", "a", "b", "a", "a_3", "b"].iter().cycle().take(50) {
            assert!(seen.insert(aliases.generate(base)));
        }
    }

    #[test]
    fn unsafe_characters_are_replaced() {
        let mut aliases = UniqueAliasGenerator::new();
        assert_eq!(aliases.generate("Parent-Meta key"), "parent_meta_key");
    }
}
