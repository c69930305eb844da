//! Validation utilities.

use courier_database::FileRef;

use crate::types::{ChatError, ChatResult, OutgoingContent};

pub const MAX_IDENTITY_LEN: usize = 128;
pub const MAX_DISPLAY_NAME_LEN: usize = 128;
pub const MAX_TEXT_LEN: usize = 4_000;
pub const MAX_FILE_NAME_LEN: usize = 255;

/// Validation utilities
pub struct Validator;

impl Validator {
    /// `field` names the offending input in the error message.
    pub fn identity(field: &str, identity: &str) -> ChatResult<()> {
        if identity.trim().is_empty() {
            return Err(ChatError::validation(format!("{field} is required")));
        }

        // Identities are compared byte-for-byte when building pair keys.
        if identity.trim() != identity {
            return Err(ChatError::validation(format!(
                "{field} must not start or end with whitespace"
            )));
        }

        if identity.chars().count() > MAX_IDENTITY_LEN {
            return Err(ChatError::validation(format!(
                "{field} too long (max {MAX_IDENTITY_LEN} characters)"
            )));
        }

        Ok(())
    }

    pub fn display_name(field: &str, name: &str) -> ChatResult<()> {
        if name.trim().is_empty() {
            return Err(ChatError::validation(format!("{field} is required")));
        }

        if name.chars().count() > MAX_DISPLAY_NAME_LEN {
            return Err(ChatError::validation(format!(
                "{field} too long (max {MAX_DISPLAY_NAME_LEN} characters)"
            )));
        }

        Ok(())
    }

    pub fn message_text(text: &str) -> ChatResult<()> {
        if text.trim().is_empty() {
            return Err(ChatError::validation("Message text cannot be empty"));
        }

        if text.chars().count() > MAX_TEXT_LEN {
            return Err(ChatError::validation(format!(
                "Message text too long (max {MAX_TEXT_LEN} characters)"
            )));
        }

        Ok(())
    }

    pub fn file_ref(file: &FileRef) -> ChatResult<()> {
        if file.name.trim().is_empty() {
            return Err(ChatError::validation("File name cannot be empty"));
        }

        if file.name.chars().count() > MAX_FILE_NAME_LEN {
            return Err(ChatError::validation(format!(
                "File name too long (max {MAX_FILE_NAME_LEN} characters)"
            )));
        }

        if file.url.trim().is_empty() {
            return Err(ChatError::validation("File URL cannot be empty"));
        }

        Ok(())
    }

    /// A send needs text, a file, or both.
    pub fn content(content: &OutgoingContent) -> ChatResult<()> {
        if content.text.is_none() && content.file.is_none() {
            return Err(ChatError::validation(
                "A message needs text or a file attachment",
            ));
        }

        if let Some(text) = &content.text {
            Self::message_text(text)?;
        }

        if let Some(file) = &content.file {
            Self::file_ref(file)?;
        }

        Ok(())
    }
}
