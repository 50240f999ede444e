use serde::Serialize;

use super::{FormData, FormErrors, MSG_REQUIRED};

pub const MSG_INVALID_LOGIN: &str = "Please enter a correct username and password. \
     Note that both fields may be case-sensitive.";

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoginForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub errors: FormErrors,
}

impl LoginForm {
    pub fn from_data(data: &FormData) -> Self {
        Self {
            username: data.value("username"),
            password: data.value("password"),
            errors: FormErrors::new(),
        }
    }

    /// Username and password, when both were given.
    pub fn clean(&mut self) -> Option<(String, String)> {
        let username = self.username.trim().to_string();
        if username.is_empty() {
            self.errors.add("username", MSG_REQUIRED);
        }
        if self.password.is_empty() {
            self.errors.add("password", MSG_REQUIRED);
        }
        self.errors
            .is_empty()
            .then(|| (username, self.password.clone()))
    }

    pub fn reject_credentials(&mut self) {
        self.errors.add_non_field(MSG_INVALID_LOGIN);
    }
}
