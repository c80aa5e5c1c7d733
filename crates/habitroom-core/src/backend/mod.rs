//! Client for the external document-store service.
//!
//! The service provides accounts and sessions, document collections, and a
//! realtime channel that pushes document change events. Everything the app
//! stores goes through the [`AccountApi`] and [`DocumentApi`] traits so the
//! higher layers can run against a fake in tests.

pub mod client;
pub mod query;
pub mod realtime;
pub mod traits;

pub use client::AppwriteClient;
pub use query::Query;
pub use realtime::{ChangeEvent, ChangeKind, RealtimeClient, Subscription};
pub use traits::{AccountApi, DocumentApi};

/// Generate a document or account identifier accepted by the service
/// (at most 36 chars of `[a-z0-9]`).
pub fn unique_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
