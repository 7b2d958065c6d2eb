//! Signals exchanged by the generation states.

/// Starts a pipeline run.
pub const START: &str = "start";
/// The state finished its step; move on.
pub const ADVANCE: &str = "advance";
/// The model reply was rejected and the request is prepared again.
pub const RETRY: &str = "retry";
