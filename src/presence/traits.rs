use crate::error::Result;

use super::snapshot::{PresencePayload, PresenceSnapshot};

/// Rich presence activity API (Discord, or a test double).
///
/// Implementations are driven from a single scheduler task and need not be thread-safe
/// beyond being movable into it.
pub trait ActivityClient: Send {
    /// Returns the name of this client (for logging)
    fn name(&self) -> &'static str;

    /// One-time setup before the update loop starts
    fn initialize(&mut self) -> Result<()>;

    /// Begin publishing on behalf of the given application
    fn start(&mut self, application_id: i64) -> Result<()>;

    /// Stop publishing and clear any visible activity. Must be harmless when not started.
    fn stop(&mut self) -> Result<()>;

    /// Publish an activity for the currently started application
    fn update(&mut self, activity: &PresenceSnapshot) -> Result<()>;

    /// Pump queued events and callbacks
    fn run_callbacks(&mut self) -> Result<()>;
}

/// User preferences consulted by the update loop
pub trait ActivitySettings: Send + Sync {
    /// Whether real server activity may be shown, or only the anonymous default
    fn share_server_activity(&self) -> bool;
}

/// Provider of the anonymous payload used when activity sharing is disabled
pub trait DefaultPayloadSource: Send + Sync {
    fn load_default_payload(&self) -> Result<PresencePayload>;
}
