use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use validator::{Validate, ValidationErrors};

use crate::session::Session;

/// Title and description, shared by the upload and edit forms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
pub struct VideoForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
}

impl VideoForm {
    pub fn trimmed(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
pub struct SearchQuery {
    #[serde(default)]
    #[validate(length(min = 1, message = "Please enter a keyword to search for"))]
    pub keywords: String,
}

impl SearchQuery {
    pub fn trimmed(self) -> Self {
        Self {
            keywords: self.keywords.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct JoinForm {
    #[serde(default)]
    #[validate(length(min = 3, max = 32, message = "Username must be between 3 and 32 characters"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[serde(default)]
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub password2: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Validates `form`, returning the messages to flash when it is rejected.
pub fn check(form: &impl Validate) -> Result<(), Vec<String>> {
    form.validate().map_err(|errors| messages(&errors))
}

/// Flashes the validation messages and sends the user back to the form.
pub fn reject(session: &Session, messages: Vec<String>, form_page: &str) -> Response {
    tracing::debug!(?messages, form_page, "rejected form input");
    for message in messages {
        session.error(message);
    }

    Redirect::to(form_page).into_response()
}

fn messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));

    fields
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| match &error.message {
                Some(message) => message.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_rejected_after_trimming() {
        let form = VideoForm {
            title: "   ".into(),
            description: "\n".into(),
        }
        .trimmed();

        assert_eq!(
            check(&form),
            Err(vec![
                "Description is required".to_string(),
                "Title is required".to_string(),
            ])
        );
    }

    #[test]
    fn filled_video_form_passes() {
        let form = VideoForm {
            title: " Cats ".into(),
            description: "Cats doing things".into(),
        }
        .trimmed();

        assert_eq!(form.title, "Cats");
        assert_eq!(check(&form), Ok(()));
    }

    #[test]
    fn missing_keywords_are_rejected() {
        let query = SearchQuery::default().trimmed();
        assert_eq!(
            check(&query),
            Err(vec!["Please enter a keyword to search for".to_string()])
        );
    }

    #[test]
    fn join_form_requires_matching_passwords() {
        let form = JoinForm {
            username: "alice".into(),
            password: "correct horse".into(),
            password2: "battery staple".into(),
        };
        assert_eq!(check(&form), Err(vec!["Passwords do not match".to_string()]));
    }
}
