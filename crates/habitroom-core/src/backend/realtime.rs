//! Realtime change notifications over WebSocket.
//!
//! The service pushes one `event` frame per document change on the
//! subscribed channels. Frames are classified into [`ChangeEvent`]s and
//! forwarded on an mpsc channel; the payload itself is not used because every
//! change triggers a full refetch.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::config::BackendConfig;
use crate::error::BackendError;

/// Keep-alive interval expected by the service.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);

/// Kind of document change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

impl ChangeKind {
    fn from_action(action: &str) -> Option<Self> {
        match action {
            "create" => Some(ChangeKind::Create),
            "update" => Some(ChangeKind::Update),
            "delete" => Some(ChangeKind::Delete),
            _ => None,
        }
    }

    /// Classify a frame's event list.
    ///
    /// Only document events (`databases.*.collections.*.documents.*.<action>`,
    /// wildcard or concrete ids) count. When several kinds are present,
    /// create wins over update, and update over delete.
    pub fn classify(events: &[String]) -> Option<Self> {
        let kinds: Vec<ChangeKind> = events
            .iter()
            .filter_map(|event| {
                let parts: Vec<&str> = event.split('.').collect();
                match parts.as_slice() {
                    ["databases", _, "collections", _, "documents", _, action] => {
                        ChangeKind::from_action(action)
                    }
                    _ => None,
                }
            })
            .collect();

        [ChangeKind::Create, ChangeKind::Update, ChangeKind::Delete]
            .into_iter()
            .find(|k| kinds.contains(k))
    }
}

/// A document change pushed by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub channels: Vec<String>,
    pub document_id: Option<String>,
}

/// Decoded server frame.
#[derive(Debug, Clone, PartialEq)]
enum Frame {
    Connected,
    Event(ChangeEvent),
    Error { code: i64, message: String },
    Other,
}

fn decode_frame(text: &str) -> Result<Frame, BackendError> {
    let frame: Value = serde_json::from_str(text)?;
    let data = &frame["data"];

    let decoded = match frame["type"].as_str() {
        Some("connected") => Frame::Connected,
        Some("error") => Frame::Error {
            code: data["code"].as_i64().unwrap_or_default(),
            message: data["message"].as_str().unwrap_or_default().to_string(),
        },
        Some("event") => {
            let events: Vec<String> = data["events"]
                .as_array()
                .map(|list| {
                    list.iter()
                        .filter_map(|e| e.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();

            match ChangeKind::classify(&events) {
                Some(kind) => Frame::Event(ChangeEvent {
                    kind,
                    channels: data["channels"]
                        .as_array()
                        .map(|list| {
                            list.iter()
                                .filter_map(|c| c.as_str().map(str::to_string))
                                .collect()
                        })
                        .unwrap_or_default(),
                    document_id: data["payload"]["$id"].as_str().map(str::to_string),
                }),
                None => Frame::Other,
            }
        }
        _ => Frame::Other,
    };

    Ok(decoded)
}

/// Opens realtime subscriptions against the configured service.
#[derive(Debug, Clone)]
pub struct RealtimeClient {
    config: BackendConfig,
}

impl RealtimeClient {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }

    /// WebSocket URL for `channels`.
    pub fn url(&self, channels: &[String]) -> Result<url::Url, BackendError> {
        let mut url = self.config.endpoint.clone();
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|_| {
            BackendError::Realtime(format!(
                "cannot derive socket URL from {}",
                self.config.endpoint
            ))
        })?;

        let path = format!("{}/realtime", url.path().trim_end_matches('/'));
        url.set_path(&path);
        {
            let mut query = url.query_pairs_mut();
            query.clear();
            query.append_pair("project", &self.config.project_id);
            for channel in channels {
                query.append_pair("channels[]", channel);
            }
        }
        Ok(url)
    }

    /// Connect and start forwarding change events on `channels` to `sink`.
    ///
    /// Returns once the socket is open. Events arrive until the returned
    /// [`Subscription`] is torn down, the socket closes, or `sink` is dropped.
    pub async fn subscribe(
        &self,
        channels: Vec<String>,
        secret: Option<&str>,
        sink: mpsc::Sender<ChangeEvent>,
    ) -> Result<Subscription, BackendError> {
        let url = self.url(&channels)?;
        let (socket, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
        tracing::debug!(?channels, "realtime connected");

        let secret = secret.map(str::to_string);
        let task_channels = channels.clone();
        let task = tokio::spawn(async move {
            let (mut writer, mut reader) = socket.split();
            let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
            heartbeat.tick().await;

            loop {
                tokio::select! {
                    _ = heartbeat.tick() => {
                        let ping = json!({ "type": "ping" }).to_string();
                        if let Err(e) = writer.send(Message::Text(ping)).await {
                            tracing::warn!(error = %e, "realtime heartbeat failed");
                            break;
                        }
                    }
                    message = reader.next() => {
                        let text = match message {
                            Some(Ok(Message::Text(text))) => text,
                            Some(Ok(Message::Close(_))) | None => {
                                tracing::debug!(channels = ?task_channels, "realtime closed");
                                break;
                            }
                            Some(Ok(_)) => continue,
                            Some(Err(e)) => {
                                tracing::warn!(error = %e, "realtime read failed");
                                break;
                            }
                        };

                        match decode_frame(&text) {
                            Ok(Frame::Connected) => {
                                if let Some(secret) = secret.as_deref() {
                                    let auth = json!({
                                        "type": "authentication",
                                        "data": { "session": secret }
                                    })
                                    .to_string();
                                    if let Err(e) = writer.send(Message::Text(auth)).await {
                                        tracing::warn!(
                                            error = %e,
                                            "realtime authentication failed"
                                        );
                                        break;
                                    }
                                }
                            }
                            Ok(Frame::Event(event)) => {
                                tracing::debug!(
                                    kind = ?event.kind,
                                    document = ?event.document_id,
                                    "realtime event"
                                );
                                if sink.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Ok(Frame::Error { code, message }) => {
                                tracing::warn!(code, %message, "realtime error frame");
                            }
                            Ok(Frame::Other) => {}
                            Err(e) => tracing::warn!(error = %e, "undecodable realtime frame"),
                        }
                    }
                }
            }
        });

        Ok(Subscription {
            channels,
            task: Some(task),
        })
    }
}

/// Live realtime subscription. Dropping it also tears it down.
#[derive(Debug)]
pub struct Subscription {
    channels: Vec<String>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Whether the socket task is still running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop receiving events and close the socket.
    pub fn unsubscribe(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(channels = ?self.channels, "realtime unsubscribed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn events(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn config(endpoint: &str) -> BackendConfig {
        BackendConfig {
            endpoint: url::Url::parse(endpoint).unwrap(),
            project_id: "proj".into(),
            platform: "io.habitroom.test".into(),
            database_id: "db".into(),
            habits_collection: "habits".into(),
            completions_collection: "habit_completions".into(),
        }
    }

    #[test]
    fn classify_recognises_wildcard_and_concrete_events() {
        assert_eq!(
            ChangeKind::classify(&events(&["databases.*.collections.*.documents.*.create"])),
            Some(ChangeKind::Create)
        );
        assert_eq!(
            ChangeKind::classify(&events(&["databases.db.collections.habits.documents.h1.update"])),
            Some(ChangeKind::Update)
        );
        assert_eq!(
            ChangeKind::classify(&events(&["databases.*.collections.*.documents.*.delete"])),
            Some(ChangeKind::Delete)
        );
    }

    #[test]
    fn classify_ignores_non_document_events() {
        assert_eq!(ChangeKind::classify(&events(&["users.*.sessions.*.create"])), None);
        assert_eq!(ChangeKind::classify(&events(&["databases.*.collections.*.update"])), None);
        assert_eq!(ChangeKind::classify(&[]), None);
    }

    #[test]
    fn classify_prefers_create_over_update_over_delete() {
        let mixed = events(&[
            "databases.*.collections.*.documents.*.delete",
            "databases.*.collections.*.documents.*.update",
            "databases.*.collections.*.documents.*.create",
        ]);
        assert_eq!(ChangeKind::classify(&mixed), Some(ChangeKind::Create));
    }

    #[test]
    fn decode_event_frame() {
        let text = r#"{
            "type": "event",
            "data": {
                "events": [
                    "databases.db.collections.habits.documents.h9.create",
                    "databases.*.collections.*.documents.*.create"
                ],
                "channels": ["databases.db.collections.habits.documents"],
                "timestamp": "2025-03-01 10:00:00.000",
                "payload": { "$id": "h9", "title": "Stretch" }
            }
        }"#;
        assert_eq!(
            decode_frame(text).unwrap(),
            Frame::Event(ChangeEvent {
                kind: ChangeKind::Create,
                channels: vec!["databases.db.collections.habits.documents".into()],
                document_id: Some("h9".into()),
            })
        );
    }

    #[test]
    fn decode_control_frames() {
        assert_eq!(
            decode_frame(r#"{"type":"connected","data":{"channels":[],"user":null}}"#).unwrap(),
            Frame::Connected
        );
        assert_eq!(
            decode_frame(r#"{"type":"error","data":{"code":1008,"message":"Missing channels"}}"#)
                .unwrap(),
            Frame::Error {
                code: 1008,
                message: "Missing channels".into()
            }
        );
        assert_eq!(decode_frame(r#"{"type":"pong"}"#).unwrap(), Frame::Other);
        assert!(decode_frame("not json").is_err());
    }

    #[test]
    fn url_switches_scheme_and_lists_channels() {
        let client = RealtimeClient::new(config("https://cloud.example.io/v1"));
        let url = client
            .url(&["databases.db.collections.habits.documents".to_string()])
            .unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.path(), "/v1/realtime");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            [
                ("project".to_string(), "proj".to_string()),
                (
                    "channels[]".to_string(),
                    "databases.db.collections.habits.documents".to_string()
                ),
            ]
        );

        let plain = RealtimeClient::new(config("http://localhost/v1/"));
        assert_eq!(plain.url(&[]).unwrap().as_str(), "ws://localhost/v1/realtime?project=proj");
    }

    #[tokio::test]
    async fn subscribe_authenticates_and_forwards_events() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Text(r#"{"type":"connected","data":{}}"#.into()))
                .await
                .unwrap();

            let auth = loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => break text,
                    Some(Ok(_)) => continue,
                    other => panic!("expected auth frame, got {other:?}"),
                }
            };

            ws.send(Message::Text(
                r#"{"type":"event","data":{"events":["databases.*.collections.*.documents.*.delete"],"channels":["c"],"payload":{"$id":"h1"}}}"#.into(),
            ))
            .await
            .unwrap();
            auth
        });

        let client = RealtimeClient::new(config(&format!("http://{addr}/v1")));
        let (tx, mut rx) = mpsc::channel(8);
        let subscription = client
            .subscribe(vec!["c".into()], Some("s3cret"), tx)
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Delete);
        assert_eq!(event.document_id.as_deref(), Some("h1"));

        let auth: Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(auth["type"], "authentication");
        assert_eq!(auth["data"]["session"], "s3cret");

        assert_eq!(subscription.channels(), ["c".to_string()]);
        subscription.unsubscribe();
    }
}
