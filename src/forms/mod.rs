//! HTML form handling
//!
//! Forms are parsed from `application/x-www-form-urlencoded` bodies (or the
//! query string for searches) into a [`FormData`] multi-map, then cleaned
//! into model inputs. Cleaning never fails hard: field problems are collected
//! in [`FormErrors`] so the page can be re-rendered with the submitted values.

mod auth;
mod newspaper;
mod redactor;
mod search;
mod topic;

pub use auth::LoginForm;
pub use newspaper::{NewspaperForm, DATE_INPUT_FORMATS};
pub use redactor::{validate_password, RedactorCreationForm, RedactorUpdateForm};
pub use search::SearchForm;
pub use topic::TopicForm;

use serde::Serialize;
use std::collections::BTreeMap;

/// Key used for errors that do not belong to a single field
pub const NON_FIELD_ERRORS: &str = "__all__";

pub const MSG_REQUIRED: &str = "This field is required.";

/// Ordered form fields; a key may repeat (checkbox groups).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// First value submitted for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value submitted for `key`, in submission order
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Raw value for `key`, empty when absent
    pub fn value(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.add(NON_FIELD_ERRORS, message);
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has(&self, field: &str) -> bool {
        !self.get(field).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Iterate `(field, message)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .flat_map(|(field, messages)| messages.iter().map(move |m| (field.as_str(), m.as_str())))
    }
}

fn max_length_message(max: usize, actual: usize) -> String {
    format!(
        "Ensure this value has at most {} characters (it has {}).",
        max, actual
    )
}

/// Trimmed required text no longer than `max` characters.
pub(crate) fn clean_required(
    errors: &mut FormErrors,
    field: &str,
    raw: &str,
    max: Option<usize>,
) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, MSG_REQUIRED);
        return None;
    }
    clean_max_length(errors, field, value, max)
}

/// Trimmed optional text no longer than `max` characters.
pub(crate) fn clean_optional(
    errors: &mut FormErrors,
    field: &str,
    raw: &str,
    max: Option<usize>,
) -> Option<String> {
    clean_max_length(errors, field, raw.trim(), max)
}

fn clean_max_length(
    errors: &mut FormErrors,
    field: &str,
    value: &str,
    max: Option<usize>,
) -> Option<String> {
    if let Some(max) = max {
        let count = value.chars().count();
        if count > max {
            errors.add(field, max_length_message(max, count));
            return None;
        }
    }
    Some(value.to_string())
}

/// Required whole number, at least `min`.
pub(crate) fn clean_integer(
    errors: &mut FormErrors,
    field: &str,
    raw: &str,
    min: i32,
) -> Option<i32> {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, MSG_REQUIRED);
        return None;
    }
    match value.parse::<i32>() {
        Ok(n) if n < min => {
            errors.add(
                field,
                format!("Ensure this value is greater than or equal to {}.", min),
            );
            None
        }
        Ok(n) => Some(n),
        Err(_) => {
            errors.add(field, "Enter a whole number.");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_data_repeated_keys() {
        let data: FormData = vec![("publishers", "1"), ("title", "T"), ("publishers", "2")]
            .into_iter()
            .collect();
        assert_eq!(data.get("publishers"), Some("1"));
        assert_eq!(data.get_all("publishers"), vec!["1", "2"]);
        assert_eq!(data.value("missing"), "");
    }

    #[test]
    fn test_form_errors_collects_per_field() {
        let mut errors = FormErrors::new();
        assert!(errors.is_empty());
        errors.add("name", "first");
        errors.add("name", "second");
        errors.add_non_field("broken");
        assert_eq!(errors.get("name").len(), 2);
        assert!(errors.has(NON_FIELD_ERRORS));
        assert!(errors.get("other").is_empty());
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_clean_required_trims_and_limits() {
        let mut errors = FormErrors::new();
        assert_eq!(
            clean_required(&mut errors, "f", "  hi  ", Some(5)),
            Some("hi".to_string())
        );
        assert_eq!(clean_required(&mut errors, "f", "   ", Some(5)), None);
        assert_eq!(errors.get("f"), [MSG_REQUIRED.to_string()]);

        let mut errors = FormErrors::new();
        assert_eq!(clean_required(&mut errors, "f", "toolong", Some(5)), None);
        assert_eq!(
            errors.get("f")[0],
            "Ensure this value has at most 5 characters (it has 7)."
        );
    }

    #[test]
    fn test_clean_integer() {
        let mut errors = FormErrors::new();
        assert_eq!(clean_integer(&mut errors, "n", " 7 ", 0), Some(7));
        assert!(errors.is_empty());
        assert_eq!(clean_integer(&mut errors, "n", "-1", 0), None);
        assert_eq!(clean_integer(&mut errors, "x", "1.5", 0), None);
        assert_eq!(errors.get("x")[0], "Enter a whole number.");
        assert!(errors.has("n"));
    }

    #[test]
    fn test_form_errors_serialize_as_map() {
        let mut errors = FormErrors::new();
        errors.add("name", "bad");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["name"][0], "bad");
    }
}
