//! Redactor registration and profile forms, plus password rules.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

use super::{clean_integer, clean_optional, clean_required, FormData, FormErrors, MSG_REQUIRED};
use crate::models::{
    CreateRedactorInput, Redactor, UpdateRedactorInput, NAME_MAX_LENGTH, USERNAME_MAX_LENGTH,
};

pub const PASSWORD_MIN_LENGTH: usize = 8;

pub const MSG_USERNAME_EXISTS: &str = "A user with that username already exists.";

const MSG_INVALID_USERNAME: &str = "Enter a valid username. This value may contain only \
     letters, numbers, and @/./+/-/_ characters.";

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern is valid"));

static COMMON_PASSWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "password", "password1", "password12", "password123", "passw0rd", "12345678",
        "123456789", "1234567890", "qwertyuiop", "qwerty123", "1q2w3e4r", "1qaz2wsx",
        "iloveyou", "sunshine", "princess", "football", "baseball", "welcome1", "admin123",
        "letmein1", "trustno1", "superman", "starwars", "whatever", "michelle", "computer",
        "corvette", "mercedes", "internet", "jennifer", "jordan23", "liverpool", "chelsea1",
        "abcd1234", "abc12345", "aa123456", "qwertyui", "asdfghjk", "zxcvbnm1", "11111111",
        "00000000", "87654321", "88888888", "changeme", "administrator", "dragon12",
        "monkey123", "shadow12", "master12", "football1",
    ]
    .into_iter()
    .collect()
});

/// Password strength checks; returns every failed rule's message.
pub fn validate_password(password: &str, username: &str) -> Vec<String> {
    let mut problems = Vec::new();
    let lowered = password.to_lowercase();

    let username = username.trim().to_lowercase();
    if !username.is_empty() && lowered.contains(&username) {
        problems.push("The password is too similar to the username.".to_string());
    }
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {} characters.",
            PASSWORD_MIN_LENGTH
        ));
    }
    if COMMON_PASSWORDS.contains(lowered.trim()) {
        problems.push("This password is too common.".to_string());
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }
    problems
}

fn clean_username(errors: &mut FormErrors, raw: &str) -> Option<String> {
    let username = clean_required(errors, "username", raw, Some(USERNAME_MAX_LENGTH))?;
    if !USERNAME_RE.is_match(&username) {
        errors.add("username", MSG_INVALID_USERNAME);
        return None;
    }
    Some(username)
}

struct Profile {
    username: String,
    first_name: String,
    last_name: String,
    years_of_experience: i32,
}

fn clean_profile(
    errors: &mut FormErrors,
    username: &str,
    first_name: &str,
    last_name: &str,
    years: &str,
) -> Option<Profile> {
    let username = clean_username(errors, username);
    let first_name = clean_optional(errors, "first_name", first_name, Some(NAME_MAX_LENGTH));
    let last_name = clean_optional(errors, "last_name", last_name, Some(NAME_MAX_LENGTH));
    let years_of_experience = clean_integer(errors, "years_of_experience", years, 0);

    Some(Profile {
        username: username?,
        first_name: first_name?,
        last_name: last_name?,
        years_of_experience: years_of_experience?,
    })
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RedactorCreationForm {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub years_of_experience: String,
    #[serde(skip_serializing)]
    pub password1: String,
    #[serde(skip_serializing)]
    pub password2: String,
    pub errors: FormErrors,
}

impl RedactorCreationForm {
    pub fn new() -> Self {
        Self {
            years_of_experience: "0".to_string(),
            ..Default::default()
        }
    }

    pub fn from_data(data: &FormData) -> Self {
        Self {
            username: data.value("username"),
            first_name: data.value("first_name"),
            last_name: data.value("last_name"),
            years_of_experience: data.value("years_of_experience"),
            password1: data.value("password1"),
            password2: data.value("password2"),
            errors: FormErrors::new(),
        }
    }

    /// Validate and collect errors on the form; `None` when invalid.
    pub fn clean(&mut self) -> Option<CreateRedactorInput> {
        let profile = clean_profile(
            &mut self.errors,
            &self.username,
            &self.first_name,
            &self.last_name,
            &self.years_of_experience,
        );

        if self.password1.is_empty() {
            self.errors.add("password1", MSG_REQUIRED);
        }
        if self.password2.is_empty() {
            self.errors.add("password2", MSG_REQUIRED);
        } else if !self.password1.is_empty() {
            if self.password1 != self.password2 {
                self.errors
                    .add("password2", "The two password fields didn't match.");
            } else {
                for problem in validate_password(&self.password2, &self.username) {
                    self.errors.add("password2", problem);
                }
            }
        }

        let profile = profile?;
        if !self.errors.is_empty() {
            return None;
        }

        Some(
            CreateRedactorInput::new(profile.username, self.password1.clone())
                .with_names(profile.first_name, profile.last_name)
                .with_experience(profile.years_of_experience),
        )
    }

    pub fn reject_duplicate(&mut self) {
        self.errors.add("username", MSG_USERNAME_EXISTS);
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RedactorUpdateForm {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub years_of_experience: String,
    pub errors: FormErrors,
}

impl RedactorUpdateForm {
    pub fn from_data(data: &FormData) -> Self {
        Self {
            username: data.value("username"),
            first_name: data.value("first_name"),
            last_name: data.value("last_name"),
            years_of_experience: data.value("years_of_experience"),
            errors: FormErrors::new(),
        }
    }

    pub fn from_redactor(redactor: &Redactor) -> Self {
        Self {
            username: redactor.username.clone(),
            first_name: redactor.first_name.clone(),
            last_name: redactor.last_name.clone(),
            years_of_experience: redactor.years_of_experience.to_string(),
            errors: FormErrors::new(),
        }
    }

    pub fn clean(&mut self) -> Option<UpdateRedactorInput> {
        let profile = clean_profile(
            &mut self.errors,
            &self.username,
            &self.first_name,
            &self.last_name,
            &self.years_of_experience,
        )?;
        Some(UpdateRedactorInput {
            username: profile.username,
            first_name: profile.first_name,
            last_name: profile.last_name,
            years_of_experience: profile.years_of_experience,
        })
    }

    pub fn reject_duplicate(&mut self) {
        self.errors.add("username", MSG_USERNAME_EXISTS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creation_data(password1: &str, password2: &str) -> FormData {
        vec![
            ("username", "new_user"),
            ("first_name", "Test first name"),
            ("last_name", "Test last name"),
            ("years_of_experience", "5"),
            ("password1", password1),
            ("password2", password2),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_creation_form_valid() {
        let mut form = RedactorCreationForm::from_data(&creation_data("user12test", "user12test"));
        let input = form.clean().expect("form should be valid");
        assert_eq!(input.username, "new_user");
        assert_eq!(input.first_name, "Test first name");
        assert_eq!(input.last_name, "Test last name");
        assert_eq!(input.years_of_experience, 5);
        assert_eq!(input.password, "user12test");
    }

    #[test]
    fn test_creation_form_password_mismatch() {
        let mut form = RedactorCreationForm::from_data(&creation_data("user12test", "other12test"));
        assert!(form.clean().is_none());
        assert_eq!(form.errors.get("password2").len(), 1);
    }

    #[test]
    fn test_creation_form_weak_password() {
        let mut form = RedactorCreationForm::from_data(&creation_data("1234567", "1234567"));
        assert!(form.clean().is_none());
        let messages = form.errors.get("password2");
        assert!(messages.iter().any(|m| m.contains("too short")));
        assert!(messages.iter().any(|m| m.contains("entirely numeric")));
    }

    #[test]
    fn test_invalid_username_characters() {
        let data: FormData = vec![
            ("username", "bad name!"),
            ("years_of_experience", "1"),
        ]
        .into_iter()
        .collect();
        let mut form = RedactorUpdateForm::from_data(&data);
        assert!(form.clean().is_none());
        assert_eq!(form.errors.get("username")[0], MSG_INVALID_USERNAME);
    }

    #[test]
    fn test_negative_experience_rejected() {
        let data: FormData = vec![("username", "ann"), ("years_of_experience", "-3")]
            .into_iter()
            .collect();
        let mut form = RedactorUpdateForm::from_data(&data);
        assert!(form.clean().is_none());
        assert!(form.errors.has("years_of_experience"));
    }

    #[test]
    fn test_update_form_round_trips_redactor() {
        let mut redactor = Redactor::new("ann.b@x", "hash");
        redactor.years_of_experience = 4;
        let mut form = RedactorUpdateForm::from_redactor(&redactor);
        let input = form.clean().unwrap();
        assert_eq!(input.username, "ann.b@x");
        assert_eq!(input.years_of_experience, 4);
    }

    #[test]
    fn test_validate_password_rules() {
        assert!(validate_password("user12test", "new_user").is_empty());
        assert_eq!(validate_password("password", "x").len(), 1);
        assert_eq!(
            validate_password("xxjdoe2024xx", "JDoe"),
            vec!["The password is too similar to the username.".to_string()]
        );
    }

    #[test]
    fn test_password_not_serialized() {
        let form = RedactorCreationForm::from_data(&creation_data("secret123", "secret123"));
        let json = serde_json::to_string(&form).unwrap();
        assert!(!json.contains("secret123"));
    }
}
