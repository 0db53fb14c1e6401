// src/models/command.rs
use crate::models::status::{disclosure, Source};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub succeeded: bool,
    pub response_text: Option<String>,
    pub source: Source,
    pub error: Option<String>,
}

impl CommandResult {
    pub fn real(response: String) -> Self {
        Self {
            succeeded: true,
            response_text: Some(response),
            source: Source::Real,
            error: None,
        }
    }

    pub fn real_failure(error: String) -> Self {
        Self {
            succeeded: false,
            response_text: None,
            source: Source::Real,
            error: Some(error),
        }
    }

    pub fn simulated(response: String, reason: String) -> Self {
        Self {
            succeeded: true,
            response_text: Some(response),
            source: Source::Simulated,
            error: Some(reason),
        }
    }

    pub fn disclosure(&self) -> Option<String> {
        disclosure(self.source, self.error.as_deref())
    }

    /// Response text if the server said anything at all.
    pub fn response(&self) -> Option<&str> {
        self.response_text.as_deref().filter(|text| !text.trim().is_empty())
    }
}
