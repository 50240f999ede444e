//! Single-field search forms shown above the list pages.

use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchForm {
    /// Query-string parameter name
    pub name: &'static str,
    pub placeholder: &'static str,
    pub max_length: usize,
    /// Submitted value, redisplayed as typed
    pub value: String,
}

impl SearchForm {
    fn build(name: &'static str, placeholder: &'static str, max_length: usize) -> Self {
        Self {
            name,
            placeholder,
            max_length,
            value: String::new(),
        }
    }

    pub fn topics() -> Self {
        Self::build("name", "Search by name", 100)
    }

    pub fn newspapers() -> Self {
        Self::build("topic", "Search by topic", 255)
    }

    pub fn redactors() -> Self {
        Self::build("username", "Search by username", 100)
    }

    /// Fill the form from the request query.
    pub fn bind(mut self, query: &HashMap<String, String>) -> Self {
        self.value = query.get(self.name).cloned().unwrap_or_default();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn is_valid(&self) -> bool {
        self.value.trim().chars().count() <= self.max_length
    }

    /// Trimmed search term, or `None` when the input is invalid.
    pub fn cleaned(&self) -> Option<String> {
        self.is_valid().then(|| self.value.trim().to_string())
    }

    /// Substring to filter by. Invalid input filters nothing.
    pub fn needle(&self) -> String {
        self.cleaned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(key: &str, value: &str) -> HashMap<String, String> {
        HashMap::from([(key.to_string(), value.to_string())])
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(SearchForm::topics().placeholder, "Search by name");
        assert_eq!(SearchForm::newspapers().placeholder, "Search by topic");
        assert_eq!(SearchForm::redactors().placeholder, "Search by username");
    }

    #[test]
    fn test_absent_value_is_empty_and_valid() {
        let form = SearchForm::redactors().bind(&HashMap::new());
        assert!(form.is_valid());
        assert_eq!(form.needle(), "");
    }

    #[test]
    fn test_bind_reads_own_field_only() {
        let form = SearchForm::topics().bind(&query("username", "x"));
        assert_eq!(form.value, "");
        let form = SearchForm::topics().bind(&query("name", "  Sport "));
        assert_eq!(form.value, "  Sport ");
        assert_eq!(form.needle(), "Sport");
    }

    #[test]
    fn test_too_long_falls_back_to_no_filter() {
        let form = SearchForm::topics().with_value("x".repeat(101));
        assert!(!form.is_valid());
        assert_eq!(form.cleaned(), None);
        assert_eq!(form.needle(), "");

        let form = SearchForm::newspapers().with_value("x".repeat(255));
        assert!(form.is_valid());
    }
}
