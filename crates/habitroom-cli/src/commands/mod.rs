pub mod auth;
pub mod config;
pub mod habit;
pub mod streaks;
pub mod watch;

use habitroom_core::session::session_store;
use habitroom_core::{AppwriteClient, AuthService, BackendConfig, Config, Session};

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Runtime for one command invocation.
pub fn runtime() -> CliResult<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

/// Resolved backend settings; fails fast when any key is missing.
pub fn backend_config() -> CliResult<BackendConfig> {
    Ok(Config::load()?.backend()?)
}

/// The stored session, checked against the backend.
pub async fn require_session(client: &AppwriteClient) -> CliResult<Session> {
    let secret = session_store::load()?
        .ok_or("not signed in; run `habitroom-cli auth login`")?;
    AuthService::new(client.clone())
        .restore(&secret)
        .await
        .ok_or_else(|| "session expired; run `habitroom-cli auth login`".into())
}
