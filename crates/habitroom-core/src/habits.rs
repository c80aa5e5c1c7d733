//! Habit and completion operations against the document API.

use chrono::Utc;
use serde_json::{json, Value};

use crate::backend::{unique_id, DocumentApi, Query};
use crate::config::BackendConfig;
use crate::error::{BackendError, CoreError};
use crate::models::{Habit, HabitCompletion, NewHabit};
use crate::session::Session;

/// Largest page the service returns; lists are fetched in one page.
const LIST_LIMIT: u32 = 5000;

/// Reads and writes the habits and completions collections for a user.
pub struct HabitService<D> {
    api: D,
    habits_collection: String,
    completions_collection: String,
}

/// Decode every document that parses; the rest are logged and skipped.
fn decode_all<T: serde::de::DeserializeOwned>(collection: &str, documents: Vec<Value>) -> Vec<T> {
    documents
        .into_iter()
        .filter_map(|doc| {
            let id = doc.get("$id").and_then(Value::as_str).unwrap_or("?").to_string();
            match serde_json::from_value(doc) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(
                        collection,
                        document = %id,
                        error = %e,
                        "skipping malformed document"
                    );
                    None
                }
            }
        })
        .collect()
}

impl<D: DocumentApi> HabitService<D> {
    pub fn new(api: D, config: &BackendConfig) -> Self {
        Self {
            api,
            habits_collection: config.habits_collection.clone(),
            completions_collection: config.completions_collection.clone(),
        }
    }

    /// The user's habits, newest first.
    pub async fn list_habits(&self, session: &Session) -> Result<Vec<Habit>, CoreError> {
        let queries = [
            Query::equal("user_id", session.user_id()),
            Query::order_desc("created_at"),
            Query::limit(LIST_LIMIT),
        ];
        let docs = self
            .api
            .list_documents(session.secret(), &self.habits_collection, &queries)
            .await?;
        Ok(decode_all(&self.habits_collection, docs))
    }

    /// Every completion the user has recorded, across all habits.
    pub async fn list_completions(
        &self,
        session: &Session,
    ) -> Result<Vec<HabitCompletion>, CoreError> {
        let queries = [
            Query::equal("user_id", session.user_id()),
            Query::limit(LIST_LIMIT),
        ];
        let docs = self
            .api
            .list_documents(session.secret(), &self.completions_collection, &queries)
            .await?;
        Ok(decode_all(&self.completions_collection, docs))
    }

    pub async fn create_habit(&self, session: &Session, new: NewHabit) -> Result<Habit, CoreError> {
        new.validate()?;

        let now = Utc::now().to_rfc3339();
        let data = json!({
            "user_id": session.user_id(),
            "title": new.title.trim(),
            "description": new.description.trim(),
            "frequency": new.frequency,
            "streak_count": 0,
            "last_completed": now,
            "created_at": now,
        });

        let doc = self
            .api
            .create_document(session.secret(), &self.habits_collection, &unique_id(), data)
            .await?;
        Ok(serde_json::from_value(doc).map_err(BackendError::Decode)?)
    }

    /// Record that `habit_id` was performed now.
    pub async fn complete_habit(
        &self,
        session: &Session,
        habit_id: &str,
    ) -> Result<HabitCompletion, CoreError> {
        let data = json!({
            "habit_id": habit_id,
            "user_id": session.user_id(),
            "completed_at": Utc::now().to_rfc3339(),
        });

        let doc = self
            .api
            .create_document(session.secret(), &self.completions_collection, &unique_id(), data)
            .await?;
        Ok(serde_json::from_value(doc).map_err(BackendError::Decode)?)
    }

    pub async fn delete_habit(&self, session: &Session, habit_id: &str) -> Result<(), CoreError> {
        self.api
            .delete_document(session.secret(), &self.habits_collection, habit_id)
            .await?;
        Ok(())
    }
}
