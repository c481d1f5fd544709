use std::sync::atomic::{AtomicU64, Ordering};

use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};

use crate::{
    identity::{Identity, NormalizedId, RawId},
    Result,
};

/// Per-request input for resolution: a session and, once known, a user.
///
/// Variants are bucketed by the user id when present and by the session id otherwise. This lets
/// an anonymous session pin features and later re-resolve the rest against the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    session_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<RawId>,
}

impl Context {
    /// Create a context for `session_id`, optionally with a user.
    pub fn new(session_id: u64, user_id: Option<RawId>) -> Context {
        Context {
            session_id,
            user_id,
        }
    }

    /// Session identifier.
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// User identifier, if one is known.
    pub fn user_id(&self) -> Option<&RawId> {
        self.user_id.as_ref()
    }

    /// Return the same session with a user attached.
    pub fn with_user(self, user_id: impl Into<RawId>) -> Context {
        Context {
            user_id: Some(user_id.into()),
            ..self
        }
    }
}

impl Identity for Context {
    fn normalized_id(&self) -> Result<NormalizedId> {
        match &self.user_id {
            Some(user_id) => user_id.normalized_id(),
            None => Ok(NormalizedId::from(self.session_id)),
        }
    }
}

/// Monotonic generator of session ids.
///
/// The counter starts from a random offset, so separate processes (or restarts) do not hand out
/// the same sequence.
#[derive(Debug)]
pub struct SessionIds {
    next: AtomicU64,
}

impl SessionIds {
    /// Create a generator starting from a random offset.
    pub fn new() -> SessionIds {
        SessionIds::starting_at(thread_rng().gen_range(1..=u64::from(u32::MAX)))
    }

    /// Create a generator whose first id is `first`.
    pub fn starting_at(first: u64) -> SessionIds {
        SessionIds {
            next: AtomicU64::new(first),
        }
    }

    /// Return a fresh session id, strictly greater than all previously returned ones.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for SessionIds {
    fn default() -> Self {
        SessionIds::new()
    }
}
