//! Key-value store trait
//!
//! The outbound side of the session store: single-key byte operations with an
//! optional per-write TTL. Implemented for Redis and for an in-memory map.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
#[allow(async_fn_in_trait)] // async_trait macro handles Send/Sync bounds
pub trait KeyValueStore: Send + Sync {
    /// Get the raw bytes stored under `key`
    ///
    /// Returns `Ok(None)` if the key doesn't exist or has expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store bytes under `key`
    ///
    /// With `Some(ttl)` the entry expires after `ttl`, set in the same write.
    /// With `None` the entry never expires, and any TTL left over from an
    /// earlier write is cleared.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;

    /// Delete `key`. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if the store is healthy
    fn is_healthy(&self) -> bool;
}
