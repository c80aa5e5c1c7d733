//! Document types stored in the backend collections.
//!
//! Field names follow the stored documents (`user_id`, `completed_at`, ...);
//! the service's own metadata fields (`$id`) are renamed on the way in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// How often a habit is meant to be performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub const ALL: [Frequency; 3] = [Frequency::Daily, Frequency::Weekly, Frequency::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }

    /// Capitalised form used in listings ("Daily").
    pub fn label(&self) -> &'static str {
        match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(ValidationError::InvalidValue {
                field: "frequency".into(),
                message: format!("expected daily, weekly or monthly, got '{other}'"),
            }),
        }
    }
}

impl TryFrom<String> for Frequency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A signed-in account as returned by the account API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

/// A user-defined recurring task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    #[serde(rename = "$id")]
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub frequency: Frequency,
    #[serde(default)]
    pub streak_count: u32,
    #[serde(default)]
    pub last_completed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A timestamped record that a habit was performed once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitCompletion {
    #[serde(rename = "$id")]
    pub id: String,
    pub habit_id: String,
    pub user_id: String,
    pub completed_at: DateTime<Utc>,
}

/// User input for a habit that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHabit {
    pub title: String,
    pub description: String,
    pub frequency: Frequency,
}

impl NewHabit {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        frequency: Frequency,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            frequency,
        }
    }

    /// Title and description are both required.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::Required { field: "Title" });
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::Required { field: "Description" });
        }
        Ok(())
    }
}
