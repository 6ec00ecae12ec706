//! Staleness-aware update loop that drives an activity client from the presence store

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use crate::error::Result;

use super::clock::Clock;
use super::snapshot::{application_id, PresenceSnapshot};
use super::store::PresenceStore;
use super::traits::{ActivityClient, ActivitySettings, DefaultPayloadSource};

/// Delay between activity updates
pub const UPDATE_INTERVAL: Duration = Duration::from_millis(500);

/// Age after which received data is assumed to belong to a lost server connection
pub const TIMEOUT: Duration = Duration::from_millis(3000);

/// `last_application_id` before the first start
const NEVER_STARTED: i64 = -1;

/// `last_application_id` after going idle, so the next fresh payload restarts the client
const RESTART_REQUIRED: i64 = 0;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub update_interval: Duration,
    pub timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            update_interval: UPDATE_INTERVAL,
            timeout: TIMEOUT,
        }
    }
}

/// What a single tick ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Activity was sent to the client
    Published,
    /// The target application changed and the client was restarted
    Switched,
    /// No fresh data, the client was stopped
    Idle,
    /// The anonymous payload could not be loaded, nothing was sent
    Skipped,
    /// The tick failed part way through
    Failed,
}

pub struct UpdateScheduler<C: ActivityClient> {
    client: C,
    store: Arc<PresenceStore>,
    settings: Arc<dyn ActivitySettings>,
    defaults: Arc<dyn DefaultPayloadSource>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    last_application_id: i64,
}

impl<C: ActivityClient> UpdateScheduler<C> {
    pub fn new(
        client: C,
        store: Arc<PresenceStore>,
        settings: Arc<dyn ActivitySettings>,
        defaults: Arc<dyn DefaultPayloadSource>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            client,
            store,
            settings,
            defaults,
            clock,
            config,
            last_application_id: NEVER_STARTED,
        }
    }

    pub fn last_application_id(&self) -> i64 {
        self.last_application_id
    }

    #[cfg(test)]
    pub(crate) fn client(&self) -> &C {
        &self.client
    }

    /// Run one update. Errors never escape; callbacks are pumped on every path.
    pub fn tick(&mut self) -> TickOutcome {
        let outcome = match self.try_tick() {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    client = self.client.name(),
                    "An error occurred during the rich presence update loop: {}",
                    e
                );
                TickOutcome::Failed
            }
        };

        if let Err(e) = self.client.run_callbacks() {
            tracing::error!(client = self.client.name(), "Failed to run callbacks: {}", e);
        }

        outcome
    }

    fn try_tick(&mut self) -> Result<TickOutcome> {
        let timeout_millis = i64::try_from(self.config.timeout.as_millis()).unwrap_or(i64::MAX);
        let fresh = self
            .store
            .read_snapshot_if_fresh(self.clock.now_millis(), timeout_millis);

        let Some((mut payload, age)) = fresh else {
            if self.last_application_id > RESTART_REQUIRED {
                tracing::debug!("No fresh presence data, stopping activity");
            }
            self.last_application_id = RESTART_REQUIRED;
            self.client.stop()?;
            return Ok(TickOutcome::Idle);
        };

        if !self.settings.share_server_activity() {
            payload = match self.defaults.load_default_payload() {
                Ok(default) => default,
                Err(e) => {
                    tracing::error!("Failed to load default rich presence data: {}", e);
                    return Ok(TickOutcome::Skipped);
                }
            };
        }

        let target = application_id(&payload)?;
        if target != self.last_application_id {
            self.last_application_id = target;
            tracing::info!("Switching application ID to {}...", target);
            self.client.stop()?;
            self.client.start(target)?;
            return Ok(TickOutcome::Switched);
        }

        let activity = PresenceSnapshot::from_payload(&payload)?;
        tracing::trace!(age_ms = age, application_id = target, "Publishing activity");
        self.client.update(&activity)?;
        Ok(TickOutcome::Published)
    }

    /// Tick forever at the configured interval, first tick one interval from now
    pub async fn run(mut self) {
        tracing::info!("Entering rich presence update loop...");

        let period = self.config.update_interval;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            self.tick();
        }
    }
}
