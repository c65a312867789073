//! Redis session storage for Tideway
//!
//! Persists per-user session state in Redis on behalf of a host framework that
//! owns cookies and request wiring. Each session is one Redis key,
//! `{key_prefix}:{session_id}`, holding a versioned JSON payload with an
//! optional expiry.
//!
//! # Availability
//!
//! A Redis outage never fails a request. Loads fall back to an empty session
//! ([`LoadStatus::Degraded`]), saves return [`SaveOutcome::Unavailable`], and
//! destroys become no-ops, each logging a warning through `tracing`. Corrupt
//! stored data is different: it is returned as
//! [`SessionError::Deserialization`] and never read as an empty session.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tideway_session_redis::{
//!     RedisSessionConfig, RedisSessionStore, SessionOptions, SessionStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> tideway_session_redis::Result<()> {
//!     tideway_session_redis::init_tracing();
//!
//!     let config = RedisSessionConfig::builder().from_env().build()?;
//!     let store = RedisSessionStore::new(config)?;
//!
//!     let mut session = store.load(None).await?;
//!     session.payload.insert("user_id", 42);
//!     let _ = store
//!         .save(session.id, &session.payload, &SessionOptions::expire_after(3600))
//!         .await?;
//!     Ok(())
//! }
//! ```

#![allow(async_fn_in_trait)] // async_trait macro handles Send/Sync bounds properly

mod error;
pub mod session;
pub mod store;
pub mod traits;
mod utils;

pub use error::{Result, SessionError};
pub use session::{RandomIdGenerator, RedisSessionConfig, RedisSessionConfigBuilder, RedisSessionStore};
pub use store::InMemoryStore;
#[cfg(feature = "redis")]
pub use store::RedisStore;
pub use traits::session::{
    LoadStatus, LoadedSession, SaveOutcome, SessionId, SessionIdGenerator, SessionOptions,
    SessionPayload, SessionStore,
};
pub use traits::store::KeyValueStore;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "tideway_session_redis=debug")
/// - `TIDEWAY_LOG_JSON`: Set to "true" for JSON formatted logs
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("TIDEWAY_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    let result = if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
