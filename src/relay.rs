//! Host-facing service that wires the presence store to the update loop

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::error::{RelayError, Result};
use crate::presence::{
    ActivityClient, ActivitySettings, Clock, DefaultPayloadSource, PresencePayload,
    PresenceStore, SchedulerConfig, SystemClock, UpdateScheduler,
};

/// Rich presence relay.
///
/// Construct once at startup and share by reference with whatever receives presence
/// payloads. Must be created from within a tokio runtime.
pub struct PresenceRelay {
    store: Arc<PresenceStore>,
    update_task: JoinHandle<()>,
}

impl PresenceRelay {
    /// Initialize the activity client and start the update loop
    pub fn init<C>(
        client: C,
        settings: Arc<dyn ActivitySettings>,
        defaults: Arc<dyn DefaultPayloadSource>,
    ) -> Result<Self>
    where
        C: ActivityClient + 'static,
    {
        Self::init_with(
            client,
            settings,
            defaults,
            Arc::new(SystemClock),
            SchedulerConfig::default(),
        )
    }

    pub fn init_with<C>(
        mut client: C,
        settings: Arc<dyn ActivitySettings>,
        defaults: Arc<dyn DefaultPayloadSource>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Result<Self>
    where
        C: ActivityClient + 'static,
    {
        tracing::info!("Initializing {} activity client", client.name());
        client.initialize().map_err(|e| match e {
            RelayError::Initialization(msg) => RelayError::Initialization(msg),
            other => RelayError::Initialization(other.to_string()),
        })?;

        let store = Arc::new(PresenceStore::with_clock(clock.clone()));
        let scheduler =
            UpdateScheduler::new(client, store.clone(), settings, defaults, clock, config);

        tracing::info!("Starting API task...");
        let update_task = tokio::spawn(scheduler.run());

        Ok(Self { store, update_task })
    }

    /// Record a newly received presence payload
    pub fn set_last_received(&self, payload: PresencePayload) {
        self.store.set_last_received(payload);
    }

    /// Shared handle for producers living on other threads
    pub fn store(&self) -> Arc<PresenceStore> {
        Arc::clone(&self.store)
    }

    /// Stop the update loop. The activity client is dropped with it.
    pub fn shutdown(self) {
        tracing::info!("Shutting down rich presence relay");
        self.update_task.abort();
    }
}
