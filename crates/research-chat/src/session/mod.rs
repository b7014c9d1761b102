//! Per-browser sessions and their conversation transcripts

mod store;

pub use store::{ResolvedSession, SessionId, SessionStore};
