//! Relays rich presence data received from a game server into Discord.
//!
//! Producers hand payloads to a [`PresenceRelay`]; a fixed-interval update loop
//! publishes them while they are fresh and clears the activity once they go stale.

pub mod discord;
pub mod error;
pub mod logging;
pub mod presence;
pub mod relay;
pub mod resources;
pub mod settings;

pub use discord::DiscordActivityClient;
pub use error::{RelayError, Result};
pub use presence::{PresencePayload, PresenceSnapshot, PresenceStore};
pub use relay::PresenceRelay;
pub use resources::ResourceLoader;
pub use settings::SettingsStore;
