use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

use super::{clean_required, FormData, FormErrors, MSG_REQUIRED};
use crate::models::{NewspaperDetail, NewspaperInput, TITLE_MAX_LENGTH};

/// Accepted `published_date` formats, tried in order.
pub const DATE_INPUT_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];

pub const MSG_INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewspaperForm {
    pub title: String,
    pub content: String,
    pub published_date: String,
    pub topic: String,
    pub publishers: Vec<String>,
    pub errors: FormErrors,
}

impl NewspaperForm {
    pub fn from_data(data: &FormData) -> Self {
        Self {
            title: data.value("title"),
            content: data.value("content"),
            published_date: data.value("published_date"),
            topic: data.value("topic"),
            publishers: data
                .get_all("publishers")
                .into_iter()
                .map(str::to_string)
                .collect(),
            errors: FormErrors::new(),
        }
    }

    pub fn from_detail(detail: &NewspaperDetail) -> Self {
        let newspaper = &detail.newspaper;
        Self {
            title: newspaper.title.clone(),
            content: newspaper.content.clone(),
            published_date: newspaper.published_date.format("%Y-%m-%d").to_string(),
            topic: newspaper
                .topic_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            publishers: detail
                .publishers
                .iter()
                .map(|r| r.id.to_string())
                .collect(),
            errors: FormErrors::new(),
        }
    }

    /// Topic id as selected in the form, for redisplay
    pub fn selected_topic(&self) -> Option<i64> {
        self.topic.trim().parse().ok()
    }

    /// Publisher ids as checked in the form, for redisplay
    pub fn selected_publishers(&self) -> Vec<i64> {
        self.publishers
            .iter()
            .filter_map(|p| p.trim().parse().ok())
            .collect()
    }

    /// Validate and collect errors on the form; `None` when invalid.
    ///
    /// Whether the topic and publishers exist is checked by the service.
    pub fn clean(&mut self) -> Option<NewspaperInput> {
        let errors = &mut self.errors;
        let title = clean_required(errors, "title", &self.title, Some(TITLE_MAX_LENGTH));
        let content = clean_required(errors, "content", &self.content, None);
        let published_date = parse_date(errors, &self.published_date);

        let topic_id = match self.topic.trim() {
            "" => Some(None),
            raw => match raw.parse::<i64>() {
                Ok(id) => Some(Some(id)),
                Err(_) => {
                    errors.add("topic", MSG_INVALID_CHOICE);
                    None
                }
            },
        };

        let mut publisher_ids = BTreeSet::new();
        let mut publishers_ok = true;
        for raw in &self.publishers {
            match raw.trim().parse::<i64>() {
                Ok(id) => {
                    publisher_ids.insert(id);
                }
                Err(_) => {
                    errors.add("publishers", format!("“{}” is not a valid value.", raw));
                    publishers_ok = false;
                }
            }
        }

        if !errors.is_empty() || !publishers_ok {
            return None;
        }

        Some(NewspaperInput {
            title: title?,
            content: content?,
            published_date: published_date?,
            topic_id: topic_id?,
            publisher_ids: publisher_ids.into_iter().collect(),
        })
    }

    pub fn reject_topic(&mut self) {
        self.errors.add("topic", MSG_INVALID_CHOICE);
    }

    pub fn reject_publisher(&mut self, id: i64) {
        self.errors.add(
            "publishers",
            format!(
                "Select a valid choice. {} is not one of the available choices.",
                id
            ),
        );
    }
}

fn parse_date(errors: &mut FormErrors, raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        errors.add("published_date", MSG_REQUIRED);
        return None;
    }
    let parsed = DATE_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok());
    if parsed.is_none() {
        errors.add("published_date", "Enter a valid date.");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> FormData {
        pairs.iter().copied().collect()
    }

    fn valid_pairs() -> Vec<(&'static str, &'static str)> {
        vec![
            ("title", "Daily"),
            ("content", "News"),
            ("published_date", "2024-03-01"),
            ("topic", "2"),
            ("publishers", "5"),
            ("publishers", "3"),
            ("publishers", "5"),
        ]
    }

    #[test]
    fn test_valid_newspaper() {
        let mut form = NewspaperForm::from_data(&data(&valid_pairs()));
        let input = form.clean().unwrap();
        assert_eq!(input.title, "Daily");
        assert_eq!(input.topic_id, Some(2));
        assert_eq!(input.publisher_ids, vec![3, 5]);
        assert_eq!(
            input.published_date,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn test_empty_topic_and_no_publishers() {
        let mut form = NewspaperForm::from_data(&data(&[
            ("title", "Daily"),
            ("content", "News"),
            ("published_date", "2024-03-01"),
            ("topic", ""),
        ]));
        let input = form.clean().unwrap();
        assert_eq!(input.topic_id, None);
        assert!(input.publisher_ids.is_empty());
    }

    #[test]
    fn test_alternative_date_formats() {
        for raw in ["03/01/2024", "03/01/24"] {
            let mut errors = FormErrors::new();
            assert_eq!(
                parse_date(&mut errors, raw),
                NaiveDate::from_ymd_opt(2024, 3, 1)
            );
        }
    }

    #[test]
    fn test_invalid_fields_reported() {
        let mut form = NewspaperForm::from_data(&data(&[
            ("title", ""),
            ("content", "x"),
            ("published_date", "yesterday"),
            ("topic", "abc"),
            ("publishers", "one"),
        ]));
        assert!(form.clean().is_none());
        for field in ["title", "published_date", "topic", "publishers"] {
            assert!(form.errors.has(field), "missing error for {}", field);
        }
        assert!(!form.errors.has("content"));
    }

    #[test]
    fn test_selected_values_for_redisplay() {
        let form = NewspaperForm::from_data(&data(&valid_pairs()));
        assert_eq!(form.selected_topic(), Some(2));
        assert_eq!(form.selected_publishers(), vec![5, 3, 5]);
    }
}
