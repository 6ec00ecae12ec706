//! Last known presence payload, shared between producers and the update scheduler

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::clock::{Clock, SystemClock};
use super::snapshot::PresencePayload;

#[derive(Debug, Default)]
struct StoreRecord {
    payload: Option<PresencePayload>,
    received_at_millis: i64,
}

/// Single-slot holder for the most recently received presence payload.
///
/// The payload and its arrival time live behind one mutex, so readers always see
/// both halves of the same write.
pub struct PresenceStore {
    record: Mutex<StoreRecord>,
    clock: Arc<dyn Clock>,
}

impl PresenceStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            record: Mutex::new(StoreRecord::default()),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a freshly received payload, replacing whatever was there
    pub fn set_last_received(&self, payload: PresencePayload) {
        let mut record = self.lock();
        record.received_at_millis = self.clock.now_millis();
        record.payload = Some(payload);
    }

    /// Copy out the stored payload along with its age, if it is younger than `timeout_millis`
    pub fn read_snapshot_if_fresh(
        &self,
        now_millis: i64,
        timeout_millis: i64,
    ) -> Option<(PresencePayload, i64)> {
        let (payload, received_at) = {
            let record = self.lock();
            (record.payload.clone()?, record.received_at_millis)
        };

        let age = now_millis - received_at;
        if age < timeout_millis {
            Some((payload, age))
        } else {
            None
        }
    }
}

impl Default for PresenceStore {
    fn default() -> Self {
        Self::new()
    }
}
