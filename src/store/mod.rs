//! Key-value store backends for session data.
//!
//! Redis is the production backend (the default `redis` feature); the
//! in-memory store is for development and tests.

mod in_memory;

#[cfg(feature = "redis")]
mod redis;

pub use in_memory::InMemoryStore;

#[cfg(feature = "redis")]
pub use self::redis::RedisStore;
