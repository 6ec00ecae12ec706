//! Typed view over a received presence payload

use serde_json::{Map, Value};

use crate::error::{RelayError, Result};

/// Untyped field map as delivered by the server connection
pub type PresencePayload = Map<String, Value>;

/// Rich presence data for a single activity update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceSnapshot {
    pub application_id: i64,
    pub details: String,
    pub state: String,
    pub activity_start: i64,
    pub activity_end: i64,
    pub small_image_id: String,
    pub small_image_text: String,
    pub large_image_id: String,
    pub large_image_text: String,
}

impl PresenceSnapshot {
    /// Parse every field out of a payload.
    ///
    /// Integer fields accept any JSON number or a string holding one, since 64-bit
    /// application ids are commonly sent as strings. Fractions are truncated toward zero.
    pub fn from_payload(payload: &PresencePayload) -> Result<Self> {
        Ok(Self {
            application_id: application_id(payload)?,
            details: string_field(payload, "details")?,
            state: string_field(payload, "state")?,
            activity_start: long_field(payload, "activityStart")?,
            activity_end: long_field(payload, "activityEnd")?,
            small_image_id: string_field(payload, "smallImageId")?,
            small_image_text: string_field(payload, "smallImageText")?,
            large_image_id: string_field(payload, "largeImageId")?,
            large_image_text: string_field(payload, "largeImageText")?,
        })
    }
}

/// Read only the target application id from a payload
pub fn application_id(payload: &PresencePayload) -> Result<i64> {
    long_field(payload, "applicationId")
}

fn long_field(payload: &PresencePayload, field: &'static str) -> Result<i64> {
    let value = payload.get(field).ok_or(RelayError::MissingField(field))?;

    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => s
            .parse::<i64>()
            .ok()
            .or_else(|| s.parse::<f64>().ok().and_then(truncate)),
        _ => None,
    };

    parsed.ok_or(RelayError::InvalidField {
        field,
        expected: "an integer",
    })
}

/// Drop the fractional part, saturating at the i64 bounds
fn truncate(value: f64) -> Option<i64> {
    value.is_finite().then(|| value.trunc() as i64)
}

fn string_field(payload: &PresencePayload, field: &'static str) -> Result<String> {
    match payload.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(RelayError::InvalidField {
            field,
            expected: "a string",
        }),
        None => Err(RelayError::MissingField(field)),
    }
}
