use crate::error::{Result, SessionError};
use crate::session::RedisSessionConfig;
use crate::traits::store::KeyValueStore;
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use redis::aio::MultiplexedConnection;
use secrecy::ExposeSecret;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// A connection attempt shared by every caller that needs it
type ConnectFuture = Shared<BoxFuture<'static, Result<MultiplexedConnection>>>;

/// The current connection (or attempt), tagged so a failure can only clear
/// the attempt it came from
#[derive(Clone)]
struct PendingConnection {
    generation: u64,
    connect: ConnectFuture,
}

/// Redis key-value store
///
/// Holds one multiplexed connection, established on first use and shared by
/// every caller. Clones of the connection pipeline over the same socket, so
/// concurrent requests never wait on each other. Callers arriving while a
/// connection attempt is in flight await that same attempt instead of starting
/// their own. When an operation fails because Redis can't be reached, the
/// connection is discarded and the next operation reconnects.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    connection: Arc<Mutex<Option<PendingConnection>>>,
    next_generation: Arc<AtomicU64>,
    connect_timeout: Option<Duration>,
    response_timeout: Option<Duration>,
    /// Cached health status (updated by every operation and by `ping`)
    health_status: Arc<AtomicBool>,
}

impl RedisStore {
    /// Create a store from session configuration
    ///
    /// No connection is made here; an unreachable server is only noticed when
    /// an operation runs.
    pub fn new(config: &RedisSessionConfig) -> Result<Self> {
        let info = redis::ConnectionInfo {
            addr: redis::ConnectionAddr::Tcp(config.host.clone(), config.port),
            redis: redis::RedisConnectionInfo {
                db: config.db,
                password: config
                    .password
                    .as_ref()
                    .map(|password| password.expose_secret().to_string()),
                ..Default::default()
            },
        };

        let client = redis::Client::open(info).map_err(|e| {
            SessionError::configuration(format!("Failed to create Redis client: {}", e))
        })?;

        Ok(Self {
            client,
            connection: Arc::new(Mutex::new(None)),
            next_generation: Arc::new(AtomicU64::new(0)),
            connect_timeout: config.connect_timeout(),
            response_timeout: config.response_timeout(),
            health_status: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Ping Redis and update health status
    pub async fn ping(&self) -> bool {
        let result = self
            .run(|mut conn| async move { redis::cmd("PING").query_async::<String>(&mut conn).await })
            .await;

        match result {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Redis session store ping failed");
                false
            }
        }
    }

    /// Get the current connection attempt, starting one if there is none
    ///
    /// The lock is only held to read or replace the slot, never while
    /// connecting.
    async fn pending_connection(&self) -> PendingConnection {
        let mut slot = self.connection.lock().await;
        if let Some(pending) = slot.as_ref() {
            return pending.clone();
        }

        let pending = PendingConnection {
            generation: self.next_generation.fetch_add(1, Ordering::AcqRel) + 1,
            connect: Self::connect(
                self.client.clone(),
                self.connect_timeout,
                self.response_timeout,
            )
            .boxed()
            .shared(),
        };
        *slot = Some(pending.clone());
        pending
    }

    async fn connect(
        client: redis::Client,
        connect_timeout: Option<Duration>,
        response_timeout: Option<Duration>,
    ) -> Result<MultiplexedConnection> {
        let mut config = redis::AsyncConnectionConfig::new();
        if let Some(timeout) = connect_timeout {
            config = config.set_connection_timeout(timeout);
        }
        if let Some(timeout) = response_timeout {
            config = config.set_response_timeout(timeout);
        }

        let conn = client
            .get_multiplexed_async_connection_with_config(&config)
            .await
            .map_err(|e| match SessionError::from(e) {
                SessionError::Unavailable(msg) => {
                    SessionError::unavailable(format!("Failed to get Redis connection: {}", msg))
                }
                other => other,
            })?;

        tracing::info!("Connected to Redis session store");
        Ok(conn)
    }

    /// Forget the connection from `generation`, unless it was already replaced
    async fn discard(&self, generation: u64) {
        let mut slot = self.connection.lock().await;
        if slot
            .as_ref()
            .is_some_and(|pending| pending.generation == generation)
        {
            slot.take();
        }
    }

    /// Run a command on the shared connection, recording the outcome in the
    /// health flag and dropping the connection if Redis became unreachable
    async fn run<T, F, Fut>(&self, command: F) -> Result<T>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = redis::RedisResult<T>>,
    {
        let pending = self.pending_connection().await;
        let result = match pending.connect.await {
            Ok(conn) => command(conn).await.map_err(SessionError::from),
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => self.health_status.store(true, Ordering::Release),
            Err(e) if e.is_unavailable() => {
                self.health_status.store(false, Ordering::Release);
                self.discard(pending.generation).await;
            }
            Err(_) => {}
        }
        result
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.run(|mut conn| async move {
            redis::cmd("GET")
                .arg(key)
                .query_async::<Option<Vec<u8>>>(&mut conn)
                .await
        })
        .await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        self.run(|mut conn| async move {
            if let Some(ttl) = ttl {
                // SETEX takes whole seconds and rejects zero
                let ttl_secs = ttl.as_secs().max(1);
                redis::cmd("SETEX")
                    .arg(key)
                    .arg(ttl_secs)
                    .arg(value)
                    .query_async::<()>(&mut conn)
                    .await
            } else {
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .query_async::<()>(&mut conn)
                    .await
            }
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.run(|mut conn| async move {
            redis::cmd("DEL")
                .arg(key)
                .query_async::<()>(&mut conn)
                .await
        })
        .await
    }

    fn is_healthy(&self) -> bool {
        self.health_status.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_does_not_connect() {
        let config = RedisSessionConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..Default::default()
        };

        let store = RedisStore::new(&config).unwrap();
        assert!(store.is_healthy());
    }

    #[tokio::test]
    async fn test_discard_keeps_newer_connection() {
        let store = RedisStore::new(&RedisSessionConfig::default()).unwrap();

        // Attempts are lazy; nothing connects until awaited
        let first = store.pending_connection().await;
        assert_eq!(store.pending_connection().await.generation, first.generation);

        store.discard(first.generation).await;
        let second = store.pending_connection().await;
        assert_ne!(second.generation, first.generation);

        // A late failure report from the first attempt leaves the second alone
        store.discard(first.generation).await;
        assert_eq!(store.pending_connection().await.generation, second.generation);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        // Nothing listens on port 1
        let config = RedisSessionConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_timeout_ms: Some(500),
            ..Default::default()
        };
        let store = RedisStore::new(&config).unwrap();

        let err = store.get("missing").await.unwrap_err();
        assert!(err.is_unavailable(), "unexpected error: {err}");
        assert!(!store.is_healthy());
        assert!(!store.ping().await);
    }

    // Note: These tests require a running Redis instance

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_redis_store() {
        let store = RedisStore::new(&RedisSessionConfig::default()).unwrap();

        store
            .set("tideway-test:key", b"value".to_vec(), None)
            .await
            .unwrap();
        assert_eq!(
            store.get("tideway-test:key").await.unwrap(),
            Some(b"value".to_vec())
        );

        store.delete("tideway-test:key").await.unwrap();
        assert_eq!(store.get("tideway-test:key").await.unwrap(), None);
        assert!(store.ping().await);
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_redis_store_ttl() {
        let store = RedisStore::new(&RedisSessionConfig::default()).unwrap();

        store
            .set(
                "tideway-test:ttl",
                b"value".to_vec(),
                Some(Duration::from_secs(1)),
            )
            .await
            .unwrap();
        assert!(store.get("tideway-test:ttl").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(store.get("tideway-test:ttl").await.unwrap(), None);
    }
}
