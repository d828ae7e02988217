//! Language service contract and language code validation.
//!
//! Monolingual sites use [`Monolingual`]; a multilingual plugin supplies
//! its own [`LanguageService`] implementation.

use anyhow::Result;

use crate::models::Domain;

/// Translation and language metadata provided by the host.
pub trait LanguageService: Send + Sync {
    /// Whether a multilingual plugin is active.
    fn is_multilingual(&self) -> bool;

    /// Language the host is currently displaying. May be the "all languages" sentinel.
    fn current_language(&self) -> String;

    /// Site default language. Association rows store elements in this language.
    fn default_language(&self) -> String;

    /// Whether the host is multilingual and currently showing all languages.
    ///
    /// `all_languages_code` is the sentinel [`current_language`](Self::current_language)
    /// reports in that mode.
    fn is_all_languages_mode(&self, all_languages_code: &str) -> bool {
        self.is_multilingual() && self.current_language() == all_languages_code
    }

    /// Id of the translation of an element into `language`, if one exists.
    fn translate_element_id(&self, id: i64, domain: Domain, language: &str)
    -> Result<Option<i64>>;

    /// Language of an element, if the host knows it.
    fn element_language(&self, id: i64, domain: Domain) -> Result<Option<String>>;
}

/// Language service for sites without a multilingual plugin.
#[derive(Debug, Clone)]
pub struct Monolingual {
    language: String,
}

impl Monolingual {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
        }
    }
}

impl Default for Monolingual {
    fn default() -> Self {
        Self::new("en")
    }
}

impl LanguageService for Monolingual {
    fn is_multilingual(&self) -> bool {
        false
    }

    fn current_language(&self) -> String {
        self.language.clone()
    }

    fn default_language(&self) -> String {
        self.language.clone()
    }

    fn translate_element_id(
        &self,
        id: i64,
        _domain: Domain,
        _language: &str,
    ) -> Result<Option<i64>> {
        Ok(Some(id))
    }

    fn element_language(&self, _id: i64, _domain: Domain) -> Result<Option<String>> {
        Ok(Some(self.language.clone()))
    }
}

/// Validate that a language code follows the BCP 47 primary subtag format.
///
/// Accepts lowercase alpha 2-3 chars, optionally followed by hyphen-separated
/// alphanumeric subtags (e.g., "en", "fr", "pt-br", "zh-hans").
pub fn validate_language_code(code: &str) -> Result<()> {
    if code.is_empty() || code.len() > 12 {
        anyhow::bail!("language code must be 1-12 characters, got '{code}'");
    }

    let mut parts = code.split('-');

    match parts.next() {
        Some(primary) if (2..=3).contains(&primary.len()) => {
            if !primary.bytes().all(|b| b.is_ascii_lowercase()) {
                anyhow::bail!("language code primary subtag must be lowercase letters, got '{code}'");
            }
        }
        _ => {
            anyhow::bail!("language code must start with a 2-3 letter primary subtag, got '{code}'");
        }
    }

    for subtag in parts {
        if subtag.is_empty()
            || subtag.len() > 8
            || !subtag.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            anyhow::bail!(
                "language code subtag must be 1-8 alphanumeric characters, got '{subtag}' in '{code}'"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn monolingual_is_never_in_all_languages_mode() {
        let service = Monolingual::new("de");
        assert!(!service.is_multilingual());
        assert!(!service.is_all_languages_mode("all"));
        assert_eq!(service.default_language(), "de");
        assert_eq!(
            service.translate_element_id(5, Domain::Posts, "fr").unwrap(),
            Some(5)
        );
    }

    #[test]
    fn valid_language_codes() {
        assert!(validate_language_code("en").is_ok());
        assert!(validate_language_code("pt-br").is_ok());
        assert!(validate_language_code("zh-hans").is_ok());
    }

    #[test]
    fn invalid_language_codes() {
        assert!(validate_language_code("").is_err());
        assert!(validate_language_code("EN").is_err());
        assert!(validate_language_code("e").is_err());
        assert!(validate_language_code("en-").is_err());
        assert!(validate_language_code("en'; --").is_err());
    }
}
