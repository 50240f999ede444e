//! Redactor model
//!
//! A redactor is an editor account: the usual login fields plus the number
//! of years of editorial experience.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Newspaper;

/// Maximum length of a username, in characters.
pub const USERNAME_MAX_LENGTH: usize = 150;
/// Maximum length of first and last names, in characters.
pub const NAME_MAX_LENGTH: usize = 150;

/// Redactor entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redactor {
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub years_of_experience: i32,
    /// May use the administrative backend
    pub is_staff: bool,
    pub is_superuser: bool,
    /// Inactive accounts cannot log in
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl Redactor {
    /// Create a new Redactor.
    ///
    /// The password must already be hashed with
    /// `services::password::hash_password()`.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: 0,
            username: username.into(),
            password_hash: password_hash.into(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            years_of_experience: 0,
            is_staff: false,
            is_superuser: false,
            is_active: true,
            date_joined: Utc::now(),
            last_login: None,
        }
    }

    /// First and last name separated by a space, trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Path of the redactor's detail page
    pub fn detail_url(&self) -> String {
        format!("/redactors/{}/", self.id)
    }
}

impl fmt::Display for Redactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: ({} {})",
            self.username, self.first_name, self.last_name
        )
    }
}

/// Input for registering a redactor
#[derive(Debug, Clone, Default)]
pub struct CreateRedactorInput {
    pub username: String,
    /// Plain-text password; hashed by the service
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub years_of_experience: i32,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl CreateRedactorInput {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn with_names(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    pub fn with_experience(mut self, years: i32) -> Self {
        self.years_of_experience = years;
        self
    }
}

/// Input for editing a redactor's profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRedactorInput {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub years_of_experience: i32,
}

/// A redactor together with the newspapers they publish.
#[derive(Debug, Clone, Serialize)]
pub struct RedactorDetail {
    pub redactor: Redactor,
    pub newspapers: Vec<Newspaper>,
}
