//! Authenticated session context.
//!
//! A [`Session`] is acquired by signing in, borrowed by every call that acts
//! on the user's data, and consumed by signing out. There is no global
//! "current user"; whoever needs one is handed a `&Session`.

use std::fmt;

use crate::backend::AccountApi;
use crate::error::{CoreError, ValidationError};
use crate::models::User;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Check sign-in/sign-up input before anything goes over the network.
pub fn validate_credentials(email: &str, password: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ValidationError::MissingCredentials);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// A signed-in user and the secret that authenticates their requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    user: User,
    secret: String,
}

impl Session {
    pub fn new(user: User, secret: impl Into<String>) -> Self {
        Self {
            user,
            secret: secret.into(),
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Sign-up, sign-in, restore and sign-out over an [`AccountApi`].
pub struct AuthService<A> {
    api: A,
}

impl<A: AccountApi> AuthService<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Create an account and sign straight into it.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, CoreError> {
        validate_credentials(email, password)?;
        let user = self.api.create_account(email, password).await?;
        tracing::info!(user_id = %user.id, "account created");
        self.sign_in(email, password).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, CoreError> {
        validate_credentials(email, password)?;
        let secret = self.api.create_session(email, password).await?;
        let user = self.api.current_user(&secret).await?;
        tracing::info!(user_id = %user.id, "signed in");
        Ok(Session::new(user, secret))
    }

    /// Resume a session from a stored secret. `None` when the backend no
    /// longer accepts it or cannot be reached.
    pub async fn restore(&self, secret: &str) -> Option<Session> {
        match self.api.current_user(secret).await {
            Ok(user) => Some(Session::new(user, secret)),
            Err(e) => {
                tracing::warn!(error = %e, "could not restore session");
                None
            }
        }
    }

    /// End the session. Failures are logged; the session is gone either way.
    pub async fn sign_out(&self, session: Session) {
        match self.api.delete_session(session.secret()).await {
            Ok(()) => tracing::info!(user_id = %session.user_id(), "signed out"),
            Err(e) => tracing::warn!(error = %e, "error signing out"),
        }
    }
}

/// Persists the session secret in the OS keyring between runs.
pub mod session_store {
    use crate::error::CoreError;

    const SERVICE: &str = "habitroom";
    const KEY: &str = "session_secret";

    fn entry() -> Result<keyring::Entry, CoreError> {
        Ok(keyring::Entry::new(SERVICE, KEY)?)
    }

    /// A missing entry is not an error: nobody has signed in yet.
    fn found(result: Result<String, keyring::Error>) -> Result<Option<String>, CoreError> {
        match result {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn load() -> Result<Option<String>, CoreError> {
        found(entry()?.get_password())
    }

    pub fn save(secret: &str) -> Result<(), CoreError> {
        Ok(entry()?.set_password(secret)?)
    }

    pub fn clear() -> Result<(), CoreError> {
        match entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn missing_entry_means_signed_out() {
            assert_eq!(found(Err(keyring::Error::NoEntry)).unwrap(), None);
            assert_eq!(found(Ok("s3cret".into())).unwrap().as_deref(), Some("s3cret"));
        }

        #[test]
        fn store_failures_surface_as_keyring_errors() {
            let err = found(Err(keyring::Error::NoStorageAccess("locked".into()))).unwrap_err();
            assert!(matches!(err, CoreError::Keyring(_)));
            assert!(err.to_string().starts_with("Keyring error:"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory accounts: one user per email, secrets are "secret-<email>".
    #[derive(Default)]
    struct FakeAccounts {
        users: Mutex<Vec<(User, String)>>,
        deleted: Mutex<Vec<String>>,
        fail_delete: bool,
    }

    fn rejected(code: u16, kind: &str, message: &str) -> BackendError {
        BackendError::Api {
            code,
            kind: kind.into(),
            message: message.into(),
        }
    }

    #[async_trait]
    impl AccountApi for FakeAccounts {
        async fn create_account(&self, email: &str, password: &str) -> Result<User, BackendError> {
            let mut users = self.users.lock().unwrap();
            if users.iter().any(|(u, _)| u.email == email) {
                return Err(rejected(
                    409,
                    "user_already_exists",
                    "A user with the same email already exists",
                ));
            }
            let user = User {
                id: format!("user-{}", users.len() + 1),
                email: email.into(),
                name: String::new(),
            };
            users.push((user.clone(), password.into()));
            Ok(user)
        }

        async fn create_session(
            &self,
            email: &str,
            password: &str,
        ) -> Result<String, BackendError> {
            let users = self.users.lock().unwrap();
            users
                .iter()
                .find(|(u, pw)| u.email == email && pw == password)
                .map(|(u, _)| format!("secret-{}", u.email))
                .ok_or_else(|| rejected(401, "user_invalid_credentials", "Invalid credentials."))
        }

        async fn current_user(&self, secret: &str) -> Result<User, BackendError> {
            let users = self.users.lock().unwrap();
            users
                .iter()
                .find(|(u, _)| format!("secret-{}", u.email) == secret)
                .map(|(u, _)| u.clone())
                .ok_or_else(|| rejected(401, "user_unauthorized", "Unauthorized"))
        }

        async fn delete_session(&self, secret: &str) -> Result<(), BackendError> {
            if self.fail_delete {
                return Err(rejected(500, "general_unknown", "boom"));
            }
            self.deleted.lock().unwrap().push(secret.into());
            Ok(())
        }
    }

    #[test]
    fn credentials_require_both_fields() {
        assert_eq!(
            validate_credentials("", "secret123"),
            Err(ValidationError::MissingCredentials)
        );
        assert_eq!(
            validate_credentials("a@b.co", ""),
            Err(ValidationError::MissingCredentials)
        );
    }

    #[test]
    fn password_must_reach_minimum_length() {
        assert_eq!(
            validate_credentials("a@b.co", "12345"),
            Err(ValidationError::PasswordTooShort { min: 6 })
        );
        assert!(validate_credentials("a@b.co", "123456").is_ok());
    }

    #[test]
    fn debug_output_hides_secret() {
        let session = Session::new(
            User {
                id: "u1".into(),
                email: "a@b.co".into(),
                name: String::new(),
            },
            "top-secret",
        );
        let printed = format!("{session:?}");
        assert!(!printed.contains("top-secret"));
        assert!(printed.contains("u1"));
    }

    #[tokio::test]
    async fn sign_up_creates_account_and_signs_in() {
        let auth = AuthService::new(FakeAccounts::default());
        let session = auth.sign_up("a@b.co", "hunter22").await.unwrap();
        assert_eq!(session.user().email, "a@b.co");
        assert_eq!(session.secret(), "secret-a@b.co");
    }

    #[tokio::test]
    async fn sign_up_twice_surfaces_backend_message() {
        let auth = AuthService::new(FakeAccounts::default());
        auth.sign_up("a@b.co", "hunter22").await.unwrap();
        let err = auth.sign_up("a@b.co", "hunter22").await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn validation_runs_before_network() {
        let auth = AuthService::new(FakeAccounts::default());
        let err = auth.sign_in("a@b.co", "short").await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::PasswordTooShort { .. })));
        assert!(auth.api.users.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let auth = AuthService::new(FakeAccounts::default());
        auth.sign_up("a@b.co", "hunter22").await.unwrap();
        let err = auth.sign_in("a@b.co", "hunter23").await.unwrap_err();
        assert!(matches!(err, CoreError::Backend(ref b) if b.is_unauthorized()));
    }

    #[tokio::test]
    async fn restore_accepts_live_secret_only() {
        let auth = AuthService::new(FakeAccounts::default());
        let session = auth.sign_up("a@b.co", "hunter22").await.unwrap();

        let restored = auth.restore(session.secret()).await.unwrap();
        assert_eq!(restored, session);
        assert!(auth.restore("stale").await.is_none());
    }

    #[tokio::test]
    async fn sign_out_deletes_session_and_tolerates_failure() {
        let auth = AuthService::new(FakeAccounts::default());
        let session = auth.sign_up("a@b.co", "hunter22").await.unwrap();
        auth.sign_out(session).await;
        assert_eq!(*auth.api.deleted.lock().unwrap(), ["secret-a@b.co".to_string()]);

        let failing = AuthService::new(FakeAccounts {
            fail_delete: true,
            ..Default::default()
        });
        let session = failing.sign_up("c@d.co", "hunter22").await.unwrap();
        failing.sign_out(session).await;
        assert!(failing.api.deleted.lock().unwrap().is_empty());
    }
}
