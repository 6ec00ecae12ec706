mod clock;
mod scheduler;
mod snapshot;
mod store;
mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, SystemClock};
pub use scheduler::{SchedulerConfig, TickOutcome, UpdateScheduler, TIMEOUT, UPDATE_INTERVAL};
pub use snapshot::{application_id, PresencePayload, PresenceSnapshot};
pub use store::PresenceStore;
pub use traits::{ActivityClient, ActivitySettings, DefaultPayloadSource};
