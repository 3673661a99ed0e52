use serde::Deserialize;

use crate::{error::AppError, validation::Violations};

/// Body of the public contact form.
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub message: String,
}

impl ContactRequest {
    pub fn into_message(self) -> Result<ContactMessage, AppError> {
        let name = self.name.trim().to_string();
        let message = self.message.trim().to_string();

        Violations::new()
            .check(!name.is_empty(), "name", "Name is required")
            .check(!message.is_empty(), "message", "Message is required")
            .finish()?;

        Ok(ContactMessage { name, message })
    }
}
