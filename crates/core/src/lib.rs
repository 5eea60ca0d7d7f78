//! Domain layer shared by the storage crate and the HTTP application.
//!
//! Holds the project and action records along with the shape checks that run
//! before a request body reaches the database.

pub mod types;
pub mod validation;

pub use types::{
    Action, ActionPayload, Flag, NewAction, NewProject, Project, ProjectPayload, ProjectWithActions,
};
pub use validation::{validate_action, ValidationError, MAX_ACTION_DESCRIPTION_CHARS};
