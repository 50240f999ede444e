use serde::Serialize;

use super::{clean_required, FormData, FormErrors};
use crate::models::{Topic, TopicInput, TOPIC_NAME_MAX_LENGTH};

pub const MSG_TOPIC_EXISTS: &str = "Topic with this Name already exists.";

#[derive(Debug, Clone, Default, Serialize)]
pub struct TopicForm {
    pub name: String,
    pub errors: FormErrors,
}

impl TopicForm {
    pub fn from_data(data: &FormData) -> Self {
        Self {
            name: data.value("name"),
            errors: FormErrors::new(),
        }
    }

    pub fn from_topic(topic: &Topic) -> Self {
        Self {
            name: topic.name.clone(),
            errors: FormErrors::new(),
        }
    }

    /// Validate and collect errors on the form; `None` when invalid.
    pub fn clean(&mut self) -> Option<TopicInput> {
        let name = clean_required(
            &mut self.errors,
            "name",
            &self.name,
            Some(TOPIC_NAME_MAX_LENGTH),
        );
        name.map(TopicInput::new)
    }

    pub fn reject_duplicate(&mut self) {
        self.errors.add("name", MSG_TOPIC_EXISTS);
    }
}
