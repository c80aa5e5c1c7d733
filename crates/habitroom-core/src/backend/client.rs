//! HTTP client for the account and document APIs.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, SET_COOKIE};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};

use super::query::Query;
use super::traits::{AccountApi, DocumentApi};
use super::unique_id;
use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::models::User;

/// Client for the backend service's REST API.
#[derive(Debug, Clone)]
pub struct AppwriteClient {
    config: BackendConfig,
    http_client: Client,
}

impl AppwriteClient {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            http_client: Client::new(),
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.as_str().trim_end_matches('/'), path)
    }

    fn documents_url(&self, collection: &str) -> String {
        self.url(&format!(
            "/databases/{}/collections/{}/documents",
            urlencoding::encode(&self.config.database_id),
            urlencoding::encode(collection)
        ))
    }

    /// Attach the project headers, and the session header when signed in.
    fn with_headers(&self, request: RequestBuilder, secret: Option<&str>) -> RequestBuilder {
        let request = request
            .header("X-Appwrite-Project", &self.config.project_id)
            .header("X-Appwrite-Platform", &self.config.platform);
        match secret {
            Some(secret) if !secret.is_empty() => request.header("X-Appwrite-Session", secret),
            _ => request,
        }
    }

    fn session_cookie_name(&self) -> String {
        format!("a_session_{}", self.config.project_id)
    }

    /// Send and map non-success statuses to [`BackendError::Api`].
    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(api_error(status.as_u16(), &body))
    }
}

/// Build an API error from a failed response body.
fn api_error(status: u16, body: &str) -> BackendError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let message = parsed["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| {
            if body.is_empty() {
                format!("request failed with status {status}")
            } else {
                body.to_string()
            }
        });
    BackendError::Api {
        code: parsed["code"]
            .as_u64()
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or(status),
        kind: parsed["type"].as_str().unwrap_or("unknown").to_string(),
        message,
    }
}

/// Pull the session secret out of a create-session response.
///
/// The body's `secret` is only filled for server keys; client sessions carry
/// it in the session cookie, or in `X-Fallback-Cookies` when cookies are
/// unavailable.
fn extract_session_secret(headers: &HeaderMap, body: &Value, cookie_name: &str) -> Option<String> {
    if let Some(secret) = body["secret"].as_str().filter(|s| !s.is_empty()) {
        return Some(secret.to_string());
    }

    for value in headers.get_all(SET_COOKIE) {
        let Ok(cookie) = value.to_str() else {
            continue;
        };
        let pair = cookie.split(';').next().unwrap_or_default();
        if let Some((name, secret)) = pair.split_once('=') {
            if name.trim() == cookie_name && !secret.trim().is_empty() {
                return Some(secret.trim().to_string());
            }
        }
    }

    headers
        .get("X-Fallback-Cookies")
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
        .and_then(|cookies| cookies[cookie_name].as_str().map(str::to_string))
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl AccountApi for AppwriteClient {
    async fn create_account(&self, email: &str, password: &str) -> Result<User, BackendError> {
        let request = self.http_client.post(self.url("/account")).json(&json!({
            "userId": unique_id(),
            "email": email,
            "password": password,
        }));
        let response = self.send(self.with_headers(request, None)).await?;
        Ok(response.json::<User>().await?)
    }

    async fn create_session(&self, email: &str, password: &str) -> Result<String, BackendError> {
        let request = self
            .http_client
            .post(self.url("/account/sessions/email"))
            .json(&json!({ "email": email, "password": password }));
        let response = self.send(self.with_headers(request, None)).await?;

        let headers = response.headers().clone();
        let body: Value = response.json().await?;
        extract_session_secret(&headers, &body, &self.session_cookie_name()).ok_or_else(|| {
            BackendError::Api {
                code: 500,
                kind: "session_secret_missing".into(),
                message: "Session was created but no session secret was returned".into(),
            }
        })
    }

    async fn current_user(&self, secret: &str) -> Result<User, BackendError> {
        if secret.is_empty() {
            return Err(BackendError::NotAuthenticated);
        }
        let request = self.http_client.get(self.url("/account"));
        let response = self.send(self.with_headers(request, Some(secret))).await?;
        Ok(response.json::<User>().await?)
    }

    async fn delete_session(&self, secret: &str) -> Result<(), BackendError> {
        if secret.is_empty() {
            return Err(BackendError::NotAuthenticated);
        }
        let request = self.http_client.delete(self.url("/account/sessions/current"));
        self.send(self.with_headers(request, Some(secret))).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentApi for AppwriteClient {
    async fn list_documents(
        &self,
        secret: &str,
        collection: &str,
        queries: &[Query],
    ) -> Result<Vec<Value>, BackendError> {
        let params: Vec<(&str, String)> =
            queries.iter().map(|q| ("queries[]", q.encode())).collect();
        let request = self
            .http_client
            .get(self.documents_url(collection))
            .query(&params);

        tracing::debug!(collection, queries = queries.len(), "listing documents");
        let response = self.send(self.with_headers(request, Some(secret))).await?;
        let mut body: Value = response.json().await?;

        match body.get_mut("documents").map(Value::take) {
            Some(Value::Array(documents)) => Ok(documents),
            _ => Err(BackendError::Api {
                code: 500,
                kind: "invalid_response".into(),
                message: "List response has no documents array".into(),
            }),
        }
    }

    async fn create_document(
        &self,
        secret: &str,
        collection: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Value, BackendError> {
        let request = self
            .http_client
            .post(self.documents_url(collection))
            .json(&json!({ "documentId": document_id, "data": data }));

        tracing::debug!(collection, document_id, "creating document");
        let response = self.send(self.with_headers(request, Some(secret))).await?;
        Ok(response.json().await?)
    }

    async fn delete_document(
        &self,
        secret: &str,
        collection: &str,
        document_id: &str,
    ) -> Result<(), BackendError> {
        let url = format!(
            "{}/{}",
            self.documents_url(collection),
            urlencoding::encode(document_id)
        );
        let request = self.http_client.delete(url);

        tracing::debug!(collection, document_id, "deleting document");
        self.send(self.with_headers(request, Some(secret))).await?;
        Ok(())
    }
}
