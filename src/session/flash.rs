use derive_new::new;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Error,
    Success,
}

/// A message shown once, on the next page rendered for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, new)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

impl FlashMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Error, message.into())
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Success, message.into())
    }
}
