//! Per-session logging context.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{Span, info_span};

/// Identity and tracing span of one collection session.
///
/// Passed explicitly to the components that log on behalf of a session,
/// so concurrent sessions in one process never share log state.
///
/// # Example
///
/// ```
/// use calib_rig::SessionContext;
///
/// let ctx = SessionContext::new("24_05_01__10_00_00");
/// assert_eq!(ctx.id(), "24_05_01__10_00_00");
/// let _guard = ctx.span().enter();
/// ```
#[derive(Debug, Clone)]
pub struct SessionContext {
    id: String,
    span: Span,
}

impl SessionContext {
    /// Creates a context with an explicit session id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let span = info_span!("session", id = %id);
        Self { id, span }
    }

    /// Creates a context whose id is the current Unix time in seconds.
    #[must_use]
    pub fn from_clock() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self::new(format!("session-{secs}"))
    }

    /// Session id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Session span; enter it around session work.
    #[must_use]
    pub const fn span(&self) -> &Span {
        &self.span
    }

    /// Child span for one trajectory of `object`.
    #[must_use]
    pub fn trajectory_span(&self, object: &str, trajectory: &str) -> Span {
        info_span!(parent: &self.span, "trajectory", object, trajectory)
    }
}
