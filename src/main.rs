//! userd - User Account Management Service
//! Mission: CRUD over HTTP with Basic auth and an admin/non-admin split

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use userd::{
    api::{self, AppState},
    auth::CredentialVerifier,
    config::{Config, StorageBackend},
    models,
    store::{MemoryStore, SqliteStore, UserStore},
    validation::ValidationPolicy,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env()?;
    init_tracing();

    info!("🚀 userd starting");

    // Hash the bootstrap admin credential up front, outside any store lock.
    let admin_hash = bcrypt::hash(&cfg.admin_password, cfg.bcrypt_cost)
        .context("Failed to hash bootstrap admin password")?;
    let admin = models::bootstrap_admin(&cfg.admin_username, &cfg.admin_email, &admin_hash);

    let store: Arc<dyn UserStore> = match cfg.backend {
        StorageBackend::Memory => {
            info!("💾 Using in-memory user store");
            Arc::new(MemoryStore::new(admin, cfg.unique_email))
        }
        StorageBackend::Sqlite => {
            info!("💾 Using SQLite user store at: {}", cfg.db_path);
            Arc::new(SqliteStore::new(&cfg.db_path, admin, cfg.unique_email)?)
        }
    };

    let verifier = Arc::new(CredentialVerifier::new(store.clone()));
    let state = AppState {
        store,
        verifier,
        policy: ValidationPolicy {
            ascii_usernames: cfg.ascii_usernames,
        },
        bcrypt_cost: cfg.bcrypt_cost,
    };

    let app = api::router(state);

    let addr = format!("{}:{}", cfg.host, cfg.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("🎯 API server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Initialize tracing with an env-filterable subscriber.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "userd=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
