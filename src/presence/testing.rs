//! Test doubles for the presence collaborators

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::error::{RelayError, Result};

use super::clock::Clock;
use super::snapshot::{PresencePayload, PresenceSnapshot};
use super::traits::{ActivityClient, ActivitySettings, DefaultPayloadSource};

pub fn payload_for(application_id: i64, details: &str) -> PresencePayload {
    match json!({
        "applicationId": application_id,
        "details": details,
        "state": "Playing",
        "activityStart": 1700000000,
        "activityEnd": 0,
        "smallImageId": "small",
        "smallImageText": "Small",
        "largeImageId": "large",
        "largeImageText": "Large",
    }) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    }
}

pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self(AtomicI64::new(start))
    }

    pub fn set(&self, millis: i64) {
        self.0.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Initialize,
    Start(i64),
    Stop,
    Update(PresenceSnapshot),
    RunCallbacks,
}

#[derive(Default)]
pub struct RecordingClient {
    calls: Arc<Mutex<Vec<Call>>>,
    fail_start: AtomicBool,
    fail_initialize: bool,
}

impl RecordingClient {
    pub fn failing_initialize() -> Self {
        Self {
            fail_initialize: true,
            ..Self::default()
        }
    }

    pub fn calls_handle(&self) -> Arc<Mutex<Vec<Call>>> {
        Arc::clone(&self.calls)
    }

    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    pub fn fail_next_start(&self) {
        self.fail_start.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ActivityClient for RecordingClient {
    fn name(&self) -> &'static str {
        "Recording"
    }

    fn initialize(&mut self) -> Result<()> {
        self.record(Call::Initialize);
        if self.fail_initialize {
            return Err(RelayError::Initialization("library missing".to_string()));
        }
        Ok(())
    }

    fn start(&mut self, application_id: i64) -> Result<()> {
        self.record(Call::Start(application_id));
        if self.fail_start.swap(false, Ordering::SeqCst) {
            return Err(RelayError::Activity("start refused".to_string()));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.record(Call::Stop);
        Ok(())
    }

    fn update(&mut self, activity: &PresenceSnapshot) -> Result<()> {
        self.record(Call::Update(activity.clone()));
        Ok(())
    }

    fn run_callbacks(&mut self) -> Result<()> {
        self.record(Call::RunCallbacks);
        Ok(())
    }
}

pub struct StaticSettings(AtomicBool);

impl StaticSettings {
    pub fn new(share: bool) -> Self {
        Self(AtomicBool::new(share))
    }

    pub fn set(&self, share: bool) {
        self.0.store(share, Ordering::SeqCst);
    }
}

impl ActivitySettings for StaticSettings {
    fn share_server_activity(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct StaticDefaults(pub PresencePayload);

impl DefaultPayloadSource for StaticDefaults {
    fn load_default_payload(&self) -> Result<PresencePayload> {
        Ok(self.0.clone())
    }
}

pub struct FailingDefaults;

impl DefaultPayloadSource for FailingDefaults {
    fn load_default_payload(&self) -> Result<PresencePayload> {
        Err(RelayError::ResourceLoad("anonymous_rich_presence".to_string()))
    }
}
