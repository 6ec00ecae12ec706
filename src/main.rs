use std::process::ExitCode;
use std::sync::Arc;

use rich_presence_relay::{
    logging::{self, LoggingConfig},
    DiscordActivityClient, PresencePayload, PresenceRelay, RelayError, ResourceLoader, Result,
    SettingsStore,
};
use tokio::io::{AsyncBufReadExt, BufReader};

const SHARE_ACTIVITY_FLAG: &str = "--share-activity=";

/// Reads one JSON object per stdin line and hands it to the relay
#[tokio::main]
async fn main() -> ExitCode {
    let _log_guard = match logging::init_logging(&LoggingConfig::from_env()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let settings = SettingsStore::open_default()?;

    for arg in std::env::args().skip(1) {
        let share = match arg.strip_prefix(SHARE_ACTIVITY_FLAG) {
            Some("on") => true,
            Some("off") => false,
            _ => {
                return Err(RelayError::Settings(format!(
                    "Unrecognized argument '{}', expected {}on|off",
                    arg, SHARE_ACTIVITY_FLAG
                )))
            }
        };
        settings.set_share_server_activity(share)?;
    }

    tracing::info!(
        "Sharing server activity: {}",
        settings.get().share_server_activity
    );

    let resources = match std::env::var_os("RICH_PRESENCE_RESOURCES") {
        Some(dir) => ResourceLoader::with_override_dir(dir),
        None => ResourceLoader::new(),
    };

    let relay = PresenceRelay::init(
        DiscordActivityClient::new(),
        Arc::new(settings),
        Arc::new(resources),
    )?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => match serde_json::from_str::<PresencePayload>(&line) {
                Ok(payload) => relay.set_last_received(payload),
                Err(e) => tracing::warn!("Ignoring malformed presence payload: {}", e),
            },
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Failed to read presence input: {}", e);
                break;
            }
        }
    }

    relay.shutdown();
    Ok(())
}
