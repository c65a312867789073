//! Trait abstractions at the seams of the session store.
//!
//! - [`SessionStore`](session::SessionStore): what a host framework calls
//! - [`KeyValueStore`](store::KeyValueStore): what the session store calls
//! - [`SessionIdGenerator`](session::SessionIdGenerator): where fresh ids come from

pub mod session;
pub mod store;
