use crate::{
    api,
    auth::{AuthConfig, AuthState},
    cli::telemetry,
    storage::{MemoryStore, PgStore, ThingStore, UserStore},
};
use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

pub const MEMORY_SCHEME: &str = "memory";

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub allowed_origins: Vec<String>,
    pub secret_key: SecretString,
    pub algorithm: String,
    pub token_ttl_minutes: u64,
}

/// Strip credentials so the DSN can be logged.
fn redacted_dsn(dsn: &Url) -> String {
    let mut dsn = dsn.clone();
    if !dsn.username().is_empty() {
        let _ = dsn.set_username("***");
    }
    if dsn.password().is_some() {
        let _ = dsn.set_password(Some("***"));
    }
    dsn.to_string()
}

/// Open the backend named by the DSN scheme.
async fn open_stores(dsn: &Url) -> Result<(Arc<dyn UserStore>, Arc<dyn ThingStore>)> {
    match dsn.scheme() {
        MEMORY_SCHEME => {
            warn!("using the in-memory store, data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            let users: Arc<dyn UserStore> = store.clone();
            let things: Arc<dyn ThingStore> = store;
            Ok((users, things))
        }
        "postgres" | "postgresql" => {
            let store = Arc::new(PgStore::connect(dsn.as_str()).await?);
            let users: Arc<dyn UserStore> = store.clone();
            let things: Arc<dyn ThingStore> = store;
            Ok((users, things))
        }
        other => bail!("unsupported DSN scheme: {other}"),
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the signing configuration is invalid, the store cannot
/// be opened, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = AuthConfig::new(args.secret_key, &args.algorithm)
        .context("invalid token signing configuration")?
        .with_token_ttl_minutes(args.token_ttl_minutes)
        .context("invalid token lifetime")?;

    let dsn = Url::parse(&args.dsn).context("invalid DSN")?;

    info!(
        port = args.port,
        dsn = %redacted_dsn(&dsn),
        algorithm = ?auth_config.algorithm(),
        token_ttl_seconds = auth_config.token_ttl().as_secs(),
        "starting doorman"
    );

    let (users, things) = open_stores(&dsn).await?;
    let auth_state = Arc::new(AuthState::new(auth_config, users.clone()));

    let result = api::new(args.port, users, things, auth_state, &args.allowed_origins).await;

    telemetry::shutdown_tracer();

    result
}
