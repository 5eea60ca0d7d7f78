use thiserror::Error;

use crate::types::{ActionPayload, Flag, NewAction, NewProject, ProjectPayload};

/// Longest action description accepted, counted in characters.
pub const MAX_ACTION_DESCRIPTION_CHARS: usize = 128;

/// Shape failures reported back to clients. The display text is the exact
/// message placed in the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please provide a name and description for the project.")]
    MissingProjectFields,
    #[error("missing action data")]
    MissingActionData,
    #[error("missing required description field")]
    MissingDescription,
    #[error("Description must be 128 characters or less.")]
    DescriptionTooLong,
    #[error("missing required project_id field")]
    MissingProjectId,
    #[error("missing required notes field")]
    MissingNotes,
    #[error("completed must be true or false")]
    InvalidCompleted,
}

impl ValidationError {
    /// Short label used for metrics and structured logs.
    pub fn reason(self) -> &'static str {
        match self {
            Self::MissingProjectFields => "missing_project_fields",
            Self::MissingActionData => "missing_action_data",
            Self::MissingDescription => "missing_description",
            Self::DescriptionTooLong => "description_too_long",
            Self::MissingProjectId => "missing_project_id",
            Self::MissingNotes => "missing_notes",
            Self::InvalidCompleted => "invalid_completed",
        }
    }
}

impl ProjectPayload {
    /// Requires a non-empty `name` and `description`.
    pub fn validate(self) -> Result<NewProject, ValidationError> {
        let (Some(name), Some(description)) = (present(self.name), present(self.description))
        else {
            return Err(ValidationError::MissingProjectFields);
        };

        Ok(NewProject {
            name,
            description,
            completed: self.completed.value()?,
        })
    }
}

impl ActionPayload {
    /// Runs the action checks in order; the first failure wins.
    pub fn validate(self) -> Result<NewAction, ValidationError> {
        let description = present(self.description).ok_or(ValidationError::MissingDescription)?;
        if description.chars().count() > MAX_ACTION_DESCRIPTION_CHARS {
            return Err(ValidationError::DescriptionTooLong);
        }
        let project_id = self.project_id.ok_or(ValidationError::MissingProjectId)?;
        let notes = present(self.notes).ok_or(ValidationError::MissingNotes)?;

        Ok(NewAction {
            project_id,
            description,
            notes,
            completed: self.completed.value()?,
        })
    }
}

impl Flag {
    /// The supplied value, if any. Anything other than a boolean is rejected.
    pub fn value(self) -> Result<Option<bool>, ValidationError> {
        match self {
            Flag::Unset => Ok(None),
            Flag::Set(value) => Ok(Some(value)),
            Flag::NotABoolean => Err(ValidationError::InvalidCompleted),
        }
    }
}

/// Validates an optional action body; an absent body is its own failure.
pub fn validate_action(payload: Option<ActionPayload>) -> Result<NewAction, ValidationError> {
    payload.ok_or(ValidationError::MissingActionData)?.validate()
}

// Empty strings count as missing.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|inner| !inner.is_empty())
}
