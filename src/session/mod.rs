//! Redis-backed session persistence.
//!
//! [`RedisSessionStore`] implements [`SessionStore`](crate::SessionStore) on
//! top of any [`KeyValueStore`](crate::KeyValueStore), with Redis as the
//! default backend.

pub mod codec;
mod config;
mod id;
mod store;

pub use config::{RedisSessionConfig, RedisSessionConfigBuilder};
pub use id::RandomIdGenerator;
pub use store::{RedisSessionStore, store_key};
