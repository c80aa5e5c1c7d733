use clap::Subcommand;
use habitroom_core::session::session_store;
use habitroom_core::{AppwriteClient, AuthService};

use super::{backend_config, runtime, CliResult};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Create an account and sign in
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign in to an existing account
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// End the current session
    Logout,
    /// Show who is signed in
    Status,
}

pub fn run(action: AuthAction) -> CliResult {
    let client = AppwriteClient::new(backend_config()?);
    let auth = AuthService::new(client);

    runtime()?.block_on(async move {
        match action {
            AuthAction::Signup { email, password } => {
                let session = auth.sign_up(&email, &password).await?;
                session_store::save(session.secret())?;
                println!("Account created, signed in as {}", session.user().email);
            }
            AuthAction::Login { email, password } => {
                let session = auth.sign_in(&email, &password).await?;
                session_store::save(session.secret())?;
                println!("Signed in as {}", session.user().email);
            }
            AuthAction::Logout => {
                if let Some(secret) = session_store::load()? {
                    if let Some(session) = auth.restore(&secret).await {
                        auth.sign_out(session).await;
                    }
                    session_store::clear()?;
                }
                println!("Signed out");
            }
            AuthAction::Status => {
                let session = match session_store::load()? {
                    Some(secret) => auth.restore(&secret).await,
                    None => None,
                };
                match session {
                    Some(session) => println!("signed in as {}", session.user().email),
                    None => println!("not signed in"),
                }
            }
        }
        Ok(())
    })
}
