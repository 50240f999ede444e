//! Newspaper model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Redactor, Topic};

/// Maximum length of a newspaper title, in characters.
pub const TITLE_MAX_LENGTH: usize = 100;

/// Newspaper entity.
///
/// The topic is optional: removing a topic leaves its newspapers in place
/// with no topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Newspaper {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub published_date: NaiveDate,
    pub topic_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Newspaper {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        published_date: NaiveDate,
        topic_id: Option<i64>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title: title.into(),
            content: content.into(),
            published_date,
            topic_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Path of the newspaper's detail page
    pub fn detail_url(&self) -> String {
        format!("/newspapers/{}/", self.id)
    }
}

impl fmt::Display for Newspaper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Validated input for creating or updating a newspaper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewspaperInput {
    pub title: String,
    pub content: String,
    pub published_date: NaiveDate,
    pub topic_id: Option<i64>,
    /// Publisher redactor IDs, without duplicates
    pub publisher_ids: Vec<i64>,
}

/// A newspaper joined with its topic, as shown in listings.
#[derive(Debug, Clone, Serialize)]
pub struct NewspaperWithTopic {
    #[serde(flatten)]
    pub newspaper: Newspaper,
    pub topic: Option<Topic>,
}

/// A newspaper with its topic and publishers, as shown on its detail page.
#[derive(Debug, Clone, Serialize)]
pub struct NewspaperDetail {
    pub newspaper: Newspaper,
    pub topic: Option<Topic>,
    pub publishers: Vec<Redactor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    #[test]
    fn test_newspaper_new() {
        let paper = Newspaper::new("Morning Post", "text", date(), Some(3));
        assert_eq!(paper.id, 0);
        assert_eq!(paper.topic_id, Some(3));
        assert_eq!(paper.to_string(), "Morning Post");
    }

    #[test]
    fn test_detail_url() {
        let mut paper = Newspaper::new("Morning Post", "text", date(), None);
        paper.id = 9;
        assert_eq!(paper.detail_url(), "/newspapers/9/");
    }

    #[test]
    fn test_with_topic_flattens() {
        let paper = Newspaper::new("Morning Post", "text", date(), None);
        let json = serde_json::to_value(NewspaperWithTopic {
            newspaper: paper,
            topic: None,
        })
        .unwrap();
        assert_eq!(json["title"], "Morning Post");
        assert_eq!(json["published_date"], "2024-05-17");
        assert!(json["topic"].is_null());
    }
}
