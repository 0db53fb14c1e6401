// src/dispatch/reply.rs
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Vec<Vec<Button>>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), keyboard: Vec::new() }
    }

    /// One button per row.
    pub fn with_buttons(mut self, buttons: &[(&str, &str)]) -> Self {
        self.keyboard = buttons
            .iter()
            .map(|(label, token)| {
                vec![Button {
                    label: label.to_string(),
                    token: token.to_string(),
                }]
            })
            .collect();
        self
    }

    pub fn markup(&self) -> Option<InlineKeyboardMarkup> {
        if self.keyboard.is_empty() {
            return None;
        }
        Some(InlineKeyboardMarkup::new(self.keyboard.iter().map(|row| {
            row.iter()
                .map(|button| InlineKeyboardButton::callback(button.label.clone(), button.token.clone()))
                .collect::<Vec<_>>()
        })))
    }
}
