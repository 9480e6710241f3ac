//! Session token storage with optional durable persistence.
//!
//! The store owns the single active session for one client instance. Sessions
//! are replaced whole (never partially updated), writes are serialized, and
//! reads are snapshot clones. When a session file is configured, durable
//! writes complete before change listeners are notified.

mod error;
mod persist;
mod store;

pub use error::SessionStoreError;
pub use store::{Session, SessionChange, SessionStore};
