//! Session storage trait
//!
//! This is the contract a host framework drives once per request: load the
//! session, then at most one of save, destroy, or destroy-and-rotate.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque session identifier
///
/// Never inspected by the store; it is only used to build the storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Application data attached to a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionPayload(BTreeMap<String, serde_json::Value>);

impl SessionPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Deserialize a single value into a concrete type
    ///
    /// Returns `None` when the key is missing or holds a value of another shape.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Option<serde_json::Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl From<BTreeMap<String, serde_json::Value>> for SessionPayload {
    fn from(map: BTreeMap<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<serde_json::Value>> FromIterator<(K, V)> for SessionPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Request-scoped options passed with save and destroy calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Expiry in seconds; overrides the store's configured default
    #[serde(default)]
    pub expire_after: Option<u64>,

    /// On destroy, end the session without issuing a replacement id
    #[serde(default)]
    pub drop: bool,
}

impl SessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expire_after(seconds: u64) -> Self {
        Self {
            expire_after: Some(seconds),
            drop: false,
        }
    }

    pub fn drop_session() -> Self {
        Self {
            expire_after: None,
            drop: true,
        }
    }

    pub fn with_expire_after(mut self, seconds: u64) -> Self {
        self.expire_after = Some(seconds);
        self
    }

    pub fn with_drop(mut self, drop: bool) -> Self {
        self.drop = drop;
        self
    }
}

/// How a load was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// A stored session was found and decoded
    Hit,
    /// Nothing stored under the key (never written, deleted, or expired)
    Miss,
    /// The store was unreachable; the session was treated as new
    Degraded,
}

/// Result of [`SessionStore::load`]
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSession {
    pub id: SessionId,
    pub payload: SessionPayload,
    pub status: LoadStatus,
}

impl LoadedSession {
    pub fn into_parts(self) -> (SessionId, SessionPayload) {
        (self.id, self.payload)
    }

    /// Whether the store could not be reached for this load
    pub fn is_degraded(&self) -> bool {
        self.status == LoadStatus::Degraded
    }
}

/// Result of [`SessionStore::save`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum SaveOutcome {
    /// Persisted under this id, which is always the id that was passed in
    Saved(SessionId),
    /// The store was unreachable and nothing was written
    Unavailable,
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved(_))
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Self::Saved(id) => Some(id),
            Self::Unavailable => None,
        }
    }

    pub fn into_session_id(self) -> Option<SessionId> {
        match self {
            Self::Saved(id) => Some(id),
            Self::Unavailable => None,
        }
    }
}

/// Source of fresh session identifiers
pub trait SessionIdGenerator: Send + Sync {
    fn generate(&self) -> SessionId;
}

/// Session storage trait
///
/// Store unavailability never surfaces as an `Err` from these methods: loads
/// degrade to an empty session, saves return [`SaveOutcome::Unavailable`], and
/// destroys complete silently. `Err` is reserved for hard failures such as a
/// corrupt stored payload.
#[async_trait]
#[allow(async_fn_in_trait)] // async_trait macro handles Send/Sync bounds
pub trait SessionStore: Send + Sync {
    /// Load a session, generating a new id when none is given
    async fn load(&self, session_id: Option<SessionId>) -> Result<LoadedSession>;

    /// Persist the payload under the session id
    async fn save(
        &self,
        session_id: SessionId,
        payload: &SessionPayload,
        options: &SessionOptions,
    ) -> Result<SaveOutcome>;

    /// Delete a session. Deleting a missing session is not an error.
    async fn destroy(&self, session_id: &SessionId) -> Result<()>;

    /// Delete a session and, unless `options.drop` is set, return a fresh id
    async fn destroy_and_rotate(
        &self,
        session_id: &SessionId,
        options: &SessionOptions,
    ) -> Result<Option<SessionId>>;
}
