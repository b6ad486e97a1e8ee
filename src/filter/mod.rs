//! Content filter applied to upstream records
//!
//! A record passes when both tests pass:
//!
//! - **keyword**: the lower-cased text contains the keyword (skipped when empty)
//! - **language**: any record language is in the configured set (skipped when empty)

use std::collections::HashSet;

/// Immutable filter settings, fixed at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    /// Lowercase keyword, empty = no keyword filter
    keyword: String,
    /// Lowercase language codes, empty = no language filter
    languages: HashSet<String>,
}

impl FilterConfig {
    /// Create a filter. Inputs are trimmed and lower-cased, blank languages dropped.
    pub fn new<I, S>(keyword: impl AsRef<str>, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keyword: keyword.as_ref().trim().to_lowercase(),
            languages: languages
                .into_iter()
                .map(|l| l.as_ref().trim().to_lowercase())
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }

    /// Build from command line style input, e.g. `("cat", "en, de")`
    pub fn from_args(keyword: &str, languages: &str) -> Self {
        Self::new(keyword, languages.split(','))
    }

    /// Filter that forwards everything
    pub fn pass_through() -> Self {
        Self::default()
    }

    /// Whether neither test is active
    pub fn is_pass_through(&self) -> bool {
        self.keyword.is_empty() && self.languages.is_empty()
    }

    /// Configured keyword
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Configured language set
    pub fn languages(&self) -> &HashSet<String> {
        &self.languages
    }

    /// Decide whether a record should be forwarded
    pub fn matches<S: AsRef<str>>(&self, text: &str, languages: &[S]) -> bool {
        self.keyword_matches(text) && self.language_matches(languages)
    }

    fn keyword_matches(&self, text: &str) -> bool {
        self.keyword.is_empty() || text.to_lowercase().contains(&self.keyword)
    }

    fn language_matches<S: AsRef<str>>(&self, languages: &[S]) -> bool {
        self.languages.is_empty()
            || languages
                .iter()
                .any(|l| self.languages.contains(&l.as_ref().to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_LANGS: &[&str] = &[];

    #[test]
    fn test_keyword_and_language() {
        let filter = FilterConfig::new("cat", ["en"]);

        assert!(filter.matches("I love my Cat", &["en", "fr"]));
        assert!(!filter.matches("I love my Cat", &["fr"]));
        assert!(!filter.matches("I love my dog", &["en"]));
    }

    #[test]
    fn test_pass_through() {
        let filter = FilterConfig::pass_through();
        assert!(filter.is_pass_through());
        assert!(filter.matches("anything", NO_LANGS));
        assert!(filter.matches("", &["xx"]));
    }

    #[test]
    fn test_keyword_only() {
        let filter = FilterConfig::new("Rust", NO_LANGS);
        assert_eq!(filter.keyword(), "rust");
        assert!(filter.matches("TRUSTED", NO_LANGS));
        assert!(!filter.matches("golang", &["en"]));
    }

    #[test]
    fn test_language_only() {
        let filter = FilterConfig::from_args("", "EN, de ,,");
        assert_eq!(filter.languages().len(), 2);

        assert!(filter.matches("hallo", &["DE"]));
        assert!(filter.matches("hi", &["ja", "en"]));
        assert!(!filter.matches("salut", &["fr"]));
        // a language filter rejects records without languages
        assert!(!filter.matches("no langs", NO_LANGS));
    }

    #[test]
    fn test_from_args_empty() {
        let filter = FilterConfig::from_args("", "");
        assert!(filter.is_pass_through());
        assert_eq!(filter, FilterConfig::default());
    }

    #[test]
    fn test_owned_languages() {
        let filter = FilterConfig::new("", ["pt"]);
        let langs = vec!["pt".to_string()];
        assert!(filter.matches("ola", langs.as_slice()));
    }
}
