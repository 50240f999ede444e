//! Topic model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a topic name, in characters.
pub const TOPIC_NAME_MAX_LENGTH: usize = 100;

/// A named category assigned to newspapers.
///
/// Topic names are unique; listings are ordered by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Topic {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Topic {
    /// Create a new Topic. The ID is assigned by the database.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Validated input for creating or renaming a topic
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TopicInput {
    pub name: String,
}

impl TopicInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_new() {
        let topic = Topic::new("Politics");
        assert_eq!(topic.id, 0);
        assert_eq!(topic.name, "Politics");
    }

    #[test]
    fn test_topic_display_is_name() {
        assert_eq!(Topic::new("Science").to_string(), "Science");
    }
}
