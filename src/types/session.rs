//! Session Types
//!
//! Renewal chain carried by access tokens.

use crate::builders::SessionBuilder;
use crate::core::Clock;
use crate::error::ValidationError;

/// An OAuth session.
///
/// While a session is valid an old access token can be swapped for a new one
/// without repeating the authorization dance. Validity is measured from the
/// last renewal, not from creation.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub(crate) handle: String,
    pub(crate) creation_time: i64,
    pub(crate) last_renewal_time: i64,
    pub(crate) time_to_live: i64,
}

impl Session {
    /// Start building a session with the given handle.
    pub fn builder(handle: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(handle.into())
    }

    /// Handle used when swapping access tokens.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// When the first access token of the chain was created.
    pub fn creation_time(&self) -> i64 {
        self.creation_time
    }

    /// Last time an old access token was swapped for a new one.
    pub fn last_renewal_time(&self) -> i64 {
        self.last_renewal_time
    }

    /// Validity, in milliseconds from the last renewal.
    pub fn time_to_live(&self) -> i64 {
        self.time_to_live
    }

    pub fn has_expired(&self, clock: &dyn Clock) -> bool {
        clock.now_millis().saturating_sub(self.last_renewal_time) > self.time_to_live
    }

    /// Next session in the chain, renewed now under a fresh handle. Creation
    /// time and TTL carry over.
    pub fn renew(
        &self,
        handle: impl Into<String>,
        clock: &dyn Clock,
    ) -> Result<Session, ValidationError> {
        Session::builder(handle)
            .creation_time(self.creation_time)
            .last_renewal_time(clock.now_millis())
            .time_to_live(self.time_to_live)
            .build_with_clock(clock)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("handle", &"[REDACTED]")
            .field("creation_time", &self.creation_time)
            .field("last_renewal_time", &self.last_renewal_time)
            .field("time_to_live", &self.time_to_live)
            .finish()
    }
}
