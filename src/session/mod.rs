//! Session state and the in-memory session store.

pub mod store;
pub mod types;

pub use store::{InMemorySessionStore, SessionStore};
pub use types::{Language, MenuState, Session, SessionStatus};
