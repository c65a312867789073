use crate::error::Result;
use crate::session::codec;
use crate::session::config::RedisSessionConfig;
use crate::session::id::RandomIdGenerator;
use crate::traits::session::{
    LoadStatus, LoadedSession, SaveOutcome, SessionId, SessionIdGenerator, SessionOptions,
    SessionPayload, SessionStore,
};
use crate::traits::store::KeyValueStore;
use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;

/// Build the storage key for a session: `{prefix}:{session_id}`
///
/// The separator is always present, so an empty prefix yields `:{session_id}`.
pub fn store_key(prefix: &str, session_id: &SessionId) -> String {
    format!("{}:{}", prefix, session_id.as_str())
}

/// Session store persisting payloads in Redis
///
/// One key per session, holding the encoded payload, optionally with a TTL.
/// The store favours availability: if Redis can't be reached, loads return an
/// empty session, saves report [`SaveOutcome::Unavailable`], and destroys do
/// nothing, each logging a warning. Corrupt stored data is always an error.
///
/// # Example
///
/// ```rust,no_run
/// use tideway_session_redis::{
///     RedisSessionConfig, RedisSessionStore, SessionOptions, SessionStore,
/// };
///
/// # async fn run() -> tideway_session_redis::Result<()> {
/// let config = RedisSessionConfig::builder()
///     .with_key_prefix("myapp:session")
///     .with_expire_after(3600)
///     .build()?;
/// let store = RedisSessionStore::new(config)?;
///
/// let mut session = store.load(None).await?;
/// session.payload.insert("user_id", 42);
/// let outcome = store
///     .save(session.id, &session.payload, &SessionOptions::default())
///     .await?;
/// assert!(outcome.is_saved());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisSessionStore {
    store: Arc<dyn KeyValueStore>,
    id_generator: Arc<dyn SessionIdGenerator>,
    key_prefix: String,
    default_expiry: Option<u64>,
    secret: Option<SecretString>,
}

impl RedisSessionStore {
    /// Create a store backed by Redis
    ///
    /// Fails only on invalid configuration. The connection is made on first
    /// use, so an unreachable server doesn't prevent construction.
    #[cfg(feature = "redis")]
    pub fn new(config: RedisSessionConfig) -> Result<Self> {
        config.validate()?;
        let store = crate::store::RedisStore::new(&config)?;
        Self::with_store(config, Arc::new(store))
    }

    /// Create a store on top of any key-value backend
    pub fn with_store(config: RedisSessionConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            store,
            id_generator: Arc::new(RandomIdGenerator),
            key_prefix: config.key_prefix,
            default_expiry: config.expire_after,
            secret: config.secret,
        })
    }

    /// Replace the id generator used for new and rotated sessions
    pub fn with_id_generator(mut self, id_generator: Arc<dyn SessionIdGenerator>) -> Self {
        self.id_generator = id_generator;
        self
    }

    /// Storage key for a session id under this store's prefix
    pub fn store_key(&self, session_id: &SessionId) -> String {
        store_key(&self.key_prefix, session_id)
    }

    /// The configured cookie secret, for the host framework's signing layer
    pub fn secret(&self) -> Option<&SecretString> {
        self.secret.as_ref()
    }

    pub fn is_healthy(&self) -> bool {
        self.store.is_healthy()
    }

    /// Expiry for a save: the request's `expire_after`, else the configured default
    ///
    /// A request expiry of zero is treated as unset.
    fn expiry_for(&self, options: &SessionOptions) -> Option<Duration> {
        options
            .expire_after
            .filter(|seconds| *seconds > 0)
            .or(self.default_expiry)
            .map(Duration::from_secs)
    }

    /// Delete the key, swallowing unavailability
    async fn delete_key(&self, operation: &'static str, key: &str) -> Result<()> {
        match self.store.delete(key).await {
            Ok(()) => {
                tracing::debug!(key, "Session destroyed");
                Ok(())
            }
            Err(e) if e.is_unavailable() => {
                tracing::warn!(operation, key, error = %e, "Session store unavailable, session not deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, session_id: Option<SessionId>) -> Result<LoadedSession> {
        let id = session_id.unwrap_or_else(|| self.id_generator.generate());
        let key = self.store_key(&id);

        let (payload, status) = match self.store.get(&key).await {
            Ok(Some(bytes)) => (codec::decode(&bytes)?, LoadStatus::Hit),
            Ok(None) => (SessionPayload::default(), LoadStatus::Miss),
            Err(e) if e.is_unavailable() => {
                tracing::warn!(operation = "load", key = %key, error = %e, "Session store unavailable, starting empty session");
                (SessionPayload::default(), LoadStatus::Degraded)
            }
            Err(e) => return Err(e),
        };

        tracing::debug!(key = %key, ?status, "Session loaded");
        Ok(LoadedSession {
            id,
            payload,
            status,
        })
    }

    async fn save(
        &self,
        session_id: SessionId,
        payload: &SessionPayload,
        options: &SessionOptions,
    ) -> Result<SaveOutcome> {
        let key = self.store_key(&session_id);
        let bytes = codec::encode(payload)?;
        let ttl = self.expiry_for(options);

        match self.store.set(&key, bytes, ttl).await {
            Ok(()) => {
                tracing::debug!(key = %key, ttl_secs = ttl.map(|d| d.as_secs()), "Session saved");
                Ok(SaveOutcome::Saved(session_id))
            }
            Err(e) if e.is_unavailable() => {
                tracing::warn!(operation = "save", key = %key, error = %e, "Session store unavailable, session not saved");
                Ok(SaveOutcome::Unavailable)
            }
            Err(e) => Err(e),
        }
    }

    async fn destroy(&self, session_id: &SessionId) -> Result<()> {
        self.delete_key("destroy", &self.store_key(session_id))
            .await
    }

    async fn destroy_and_rotate(
        &self,
        session_id: &SessionId,
        options: &SessionOptions,
    ) -> Result<Option<SessionId>> {
        self.delete_key("destroy_and_rotate", &self.store_key(session_id))
            .await?;

        if options.drop {
            return Ok(None);
        }

        Ok(Some(self.id_generator.generate()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::store::InMemoryStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hands out `sid-1`, `sid-2`, ...
    struct SequentialIds(AtomicUsize);

    impl SessionIdGenerator for SequentialIds {
        fn generate(&self) -> SessionId {
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            SessionId::new(format!("sid-{}", n))
        }
    }

    fn config(prefix: &str) -> RedisSessionConfig {
        RedisSessionConfig {
            key_prefix: prefix.to_string(),
            ..Default::default()
        }
    }

    fn create_store(prefix: &str) -> (RedisSessionStore, InMemoryStore) {
        let backend = InMemoryStore::new();
        let store = RedisSessionStore::with_store(config(prefix), Arc::new(backend.clone()))
            .unwrap()
            .with_id_generator(Arc::new(SequentialIds(AtomicUsize::new(0))));
        (store, backend)
    }

    fn user_payload() -> SessionPayload {
        [("user_id", json!(42))].into_iter().collect()
    }

    #[test]
    fn test_store_key() {
        let id = SessionId::from("abc");
        assert_eq!(store_key("myapp", &id), "myapp:abc");
        assert_eq!(store_key("", &id), ":abc");
        assert_eq!(store_key("myapp", &id), store_key("myapp", &id));
        assert_ne!(
            store_key("myapp", &SessionId::from("abc")),
            store_key("myapp", &SessionId::from("abd"))
        );
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let config = RedisSessionConfig {
            port: 0,
            ..Default::default()
        };
        let result = RedisSessionStore::with_store(config, Arc::new(InMemoryStore::new()));
        assert!(matches!(result, Err(SessionError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_load_generates_id_when_absent() {
        let (store, _) = create_store("app");

        let loaded = store.load(None).await.unwrap();
        assert_eq!(loaded.id.as_str(), "sid-1");
        assert!(loaded.payload.is_empty());
        assert_eq!(loaded.status, LoadStatus::Miss);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_then_load() {
        let (store, backend) = create_store("app");
        let id = SessionId::from("abc");

        let outcome = store
            .save(id.clone(), &user_payload(), &SessionOptions::expire_after(60))
            .await
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Saved(id.clone()));
        assert_eq!(backend.ttl("app:abc").await, Some(Duration::from_secs(60)));

        let loaded = store.load(Some(id.clone())).await.unwrap();
        assert_eq!(loaded.status, LoadStatus::Hit);
        assert_eq!(loaded.into_parts(), (id, user_payload()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_expiry_overrides_default() {
        let backend = InMemoryStore::new();
        let config = RedisSessionConfig {
            key_prefix: "app".to_string(),
            expire_after: Some(3600),
            ..Default::default()
        };
        let store = RedisSessionStore::with_store(config, Arc::new(backend.clone())).unwrap();
        let id = SessionId::from("abc");

        let _ = store
            .save(id.clone(), &user_payload(), &SessionOptions::default())
            .await
            .unwrap();
        assert_eq!(backend.ttl("app:abc").await, Some(Duration::from_secs(3600)));

        let _ = store
            .save(id.clone(), &user_payload(), &SessionOptions::expire_after(30))
            .await
            .unwrap();
        assert_eq!(backend.ttl("app:abc").await, Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_load_corrupt_payload_is_error() {
        let (store, backend) = create_store("app");
        backend.insert_raw("app:abc", b"not a session".to_vec()).await;

        let err = store.load(Some(SessionId::from("abc"))).await.unwrap_err();
        assert!(matches!(err, SessionError::Deserialization(_)));
    }

    #[tokio::test]
    async fn test_unavailable_store_degrades() {
        let (store, backend) = create_store("app");
        let id = SessionId::from("abc");
        let _ = store
            .save(id.clone(), &user_payload(), &SessionOptions::default())
            .await
            .unwrap();

        backend.set_available(false);
        assert!(!store.is_healthy());

        let loaded = store.load(Some(id.clone())).await.unwrap();
        assert!(loaded.is_degraded());
        assert_eq!(loaded.id, id);
        assert!(loaded.payload.is_empty());

        let outcome = store
            .save(id.clone(), &user_payload(), &SessionOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Unavailable);

        store.destroy(&id).await.unwrap();
        let rotated = store
            .destroy_and_rotate(&id, &SessionOptions::default())
            .await
            .unwrap();
        assert!(rotated.is_some());

        // Nothing was deleted while the store was down
        backend.set_available(true);
        let loaded = store.load(Some(id)).await.unwrap();
        assert_eq!(loaded.payload, user_payload());
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let (store, backend) = create_store("app");
        let id = SessionId::from("abc");
        let _ = store
            .save(id.clone(), &user_payload(), &SessionOptions::default())
            .await
            .unwrap();

        store.destroy(&id).await.unwrap();
        store.destroy(&id).await.unwrap();
        store.destroy(&SessionId::from("never-existed")).await.unwrap();
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_destroy_and_rotate() {
        let (store, backend) = create_store("app");
        let id = SessionId::from("abc");
        let _ = store
            .save(id.clone(), &user_payload(), &SessionOptions::default())
            .await
            .unwrap();

        let rotated = store
            .destroy_and_rotate(&id, &SessionOptions::default())
            .await
            .unwrap();
        assert_eq!(rotated, Some(SessionId::from("sid-1")));
        assert!(backend.is_empty().await);

        let dropped = store
            .destroy_and_rotate(&id, &SessionOptions::drop_session())
            .await
            .unwrap();
        assert_eq!(dropped, None);
    }

    #[test]
    fn test_secret_passthrough() {
        use secrecy::ExposeSecret;

        let config = RedisSessionConfig {
            secret: Some("signing-secret".into()),
            ..Default::default()
        };
        let store = RedisSessionStore::with_store(config, Arc::new(InMemoryStore::new())).unwrap();
        assert_eq!(
            store.secret().map(|s| s.expose_secret()),
            Some("signing-secret")
        );
    }
}
