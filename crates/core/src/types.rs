use serde::{Deserialize, Serialize};

/// Top-level project record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub completed: bool,
}

/// Project together with every action that references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectWithActions {
    #[serde(flatten)]
    pub project: Project,
    pub actions: Vec<Action>,
}

/// Task belonging to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: i64,
    pub project_id: i64,
    pub description: String,
    pub notes: String,
    pub completed: bool,
}

/// Validated project fields ready to be written.
///
/// `completed` is only overwritten on update when the client supplied it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub completed: Option<bool>,
}

/// Validated action fields ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAction {
    pub project_id: i64,
    pub description: String,
    pub notes: String,
    pub completed: Option<bool>,
}

/// `completed` as sent by a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Flag {
    #[default]
    Unset,
    Set(bool),
    NotABoolean,
}

/// Project body as received from clients. Every field may be absent, and a
/// field of the wrong JSON type reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProjectPayload {
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub completed: Flag,
}

/// Action body as received from clients. Same leniency as [`ProjectPayload`];
/// `project_id` also accepts a numeric string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActionPayload {
    #[serde(default, deserialize_with = "lenient::id")]
    pub project_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub completed: Flag,
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::Flag;

    pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(text) => Some(text),
            _ => None,
        })
    }

    pub fn id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn flag<'de, D>(deserializer: D) -> Result<Flag, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => Flag::Unset,
            Value::Bool(value) => Flag::Set(value),
            _ => Flag::NotABoolean,
        })
    }
}
