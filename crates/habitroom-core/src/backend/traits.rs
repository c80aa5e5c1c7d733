use async_trait::async_trait;

use super::query::Query;
use crate::error::BackendError;
use crate::models::User;

/// Account and session operations.
///
/// The session secret is opaque to callers; it is handed back by
/// `create_session` and passed to every call that needs a signed-in user.
#[async_trait]
pub trait AccountApi: Send + Sync {
    /// Register a new account. Does not sign in.
    async fn create_account(&self, email: &str, password: &str) -> Result<User, BackendError>;

    /// Start an email/password session and return its secret.
    async fn create_session(&self, email: &str, password: &str) -> Result<String, BackendError>;

    /// The account owning `secret`.
    async fn current_user(&self, secret: &str) -> Result<User, BackendError>;

    /// End the session owning `secret`.
    async fn delete_session(&self, secret: &str) -> Result<(), BackendError>;
}

/// Document collection operations, scoped to the configured database.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    async fn list_documents(
        &self,
        secret: &str,
        collection: &str,
        queries: &[Query],
    ) -> Result<Vec<serde_json::Value>, BackendError>;

    async fn create_document(
        &self,
        secret: &str,
        collection: &str,
        document_id: &str,
        data: serde_json::Value,
    ) -> Result<serde_json::Value, BackendError>;

    async fn delete_document(
        &self,
        secret: &str,
        collection: &str,
        document_id: &str,
    ) -> Result<(), BackendError>;
}
