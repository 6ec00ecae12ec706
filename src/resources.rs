//! Bundled JSON resources, with optional on-disk overrides

use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use crate::error::{RelayError, Result};
use crate::presence::{DefaultPayloadSource, PresencePayload};

/// Logical name of the payload shown when server activity is not shared
pub const ANONYMOUS_RICH_PRESENCE: &str = "anonymous_rich_presence";

const BUNDLED: &[(&str, &str)] = &[(
    ANONYMOUS_RICH_PRESENCE,
    include_str!("../resources/discord/anonymous_rich_presence.json"),
)];

/// Loads `discord/<name>.json` resources.
///
/// When an override directory is configured and contains the file, it takes precedence
/// over the copy compiled into the binary.
#[derive(Debug, Clone, Default)]
pub struct ResourceLoader {
    override_dir: Option<PathBuf>,
}

impl ResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            override_dir: Some(dir.into()),
        }
    }

    fn read_text(&self, name: &str) -> Result<String> {
        if let Some(dir) = &self.override_dir {
            let path = dir.join("discord").join(format!("{}.json", name));
            if path.exists() {
                tracing::debug!("Loading resource {} from {}", name, path.display());
                return fs::read_to_string(&path).map_err(|e| {
                    RelayError::ResourceLoad(format!("{}: {}", path.display(), e))
                });
            }
        }

        BUNDLED
            .iter()
            .find(|(bundled, _)| *bundled == name)
            .map(|(_, text)| text.to_string())
            .ok_or_else(|| RelayError::ResourceLoad(format!("Unknown resource: {}", name)))
    }

    /// Load a resource and parse it as a JSON object
    pub fn load_payload(&self, name: &str) -> Result<PresencePayload> {
        let text = self.read_text(name)?;
        match serde_json::from_str::<Value>(&text)
            .map_err(|e| RelayError::ResourceLoad(format!("{}: {}", name, e)))?
        {
            Value::Object(map) => Ok(map),
            _ => Err(RelayError::ResourceLoad(format!(
                "{}: expected a JSON object",
                name
            ))),
        }
    }
}

impl DefaultPayloadSource for ResourceLoader {
    fn load_default_payload(&self) -> Result<PresencePayload> {
        self.load_payload(ANONYMOUS_RICH_PRESENCE)
    }
}
