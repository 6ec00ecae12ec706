//! Discord Rich Presence integration using discord-sdk

use std::time::Duration;

use discord_sdk::{
    activity::{ActivityBuilder, Assets},
    wheel::{UserState, Wheel},
    Discord, Subscriptions,
};
use tokio::sync::{mpsc, watch};

use crate::error::{RelayError, Result};
use crate::presence::{ActivityClient, PresenceSnapshot};

/// Timeout for waiting for Discord handshake
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on waiting for discord-sdk to tear its connection down
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Activity fields in the shape Discord receives them
#[derive(Debug, Clone, PartialEq, Eq)]
struct ActivityContent {
    details: String,
    state: String,
    start: Option<i64>,
    end: Option<i64>,
    large: Option<(String, Option<String>)>,
    small: Option<(String, Option<String>)>,
}

impl ActivityContent {
    /// Non-positive timestamps and empty image ids mean "not set"
    fn from_snapshot(activity: &PresenceSnapshot) -> Self {
        let image = |id: &str, text: &str| {
            (!id.is_empty()).then(|| (id.to_string(), non_empty(text)))
        };

        Self {
            details: activity.details.clone(),
            state: activity.state.clone(),
            start: (activity.activity_start > 0).then_some(activity.activity_start),
            end: (activity.activity_end > 0).then_some(activity.activity_end),
            large: image(&activity.large_image_id, &activity.large_image_text),
            small: image(&activity.small_image_id, &activity.small_image_text),
        }
    }

    fn into_builder(self) -> ActivityBuilder {
        let mut builder = ActivityBuilder::new().details(self.details).state(self.state);

        if let Some(start) = self.start {
            builder = builder.start_timestamp(start);
        }
        if let Some(end) = self.end {
            builder = builder.end_timestamp(end);
        }

        let mut assets = Assets::default();
        if let Some((key, text)) = self.large {
            assets = assets.large(key, text);
        }
        if let Some((key, text)) = self.small {
            assets = assets.small(key, text);
        }

        builder.assets(assets)
    }
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

enum SessionCommand {
    Update(ActivityContent),
    Clear,
}

/// Connection to Discord on behalf of one application id
struct DiscordSession {
    application_id: i64,
    commands: mpsc::UnboundedSender<SessionCommand>,
    user: watch::Receiver<UserState>,
}

impl DiscordSession {
    /// The background task closes the command channel once it gives up
    fn is_alive(&self) -> bool {
        !self.commands.is_closed()
    }
}

/// Wait until the wheel reports a connected user, or give up after `timeout`
async fn wait_for_connection(user: &mut watch::Receiver<UserState>, timeout: Duration) -> bool {
    let handshake = tokio::time::timeout(timeout, async {
        loop {
            let connected = matches!(&*user.borrow_and_update(), UserState::Connected(_));
            if connected {
                return true;
            }
            if user.changed().await.is_err() {
                return false;
            }
        }
    })
    .await;

    match handshake {
        Ok(true) => true,
        Ok(false) => {
            tracing::warn!("Discord connection closed before handshake");
            false
        }
        Err(_) => {
            tracing::warn!("Discord handshake timed out");
            false
        }
    }
}

async fn disconnect(discord: Discord) {
    if tokio::time::timeout(DISCONNECT_TIMEOUT, discord.disconnect())
        .await
        .is_err()
    {
        tracing::debug!("Discord disconnect did not finish in time");
    }
}

/// [`ActivityClient`] backed by the local Discord client
#[derive(Default)]
pub struct DiscordActivityClient {
    session: Option<DiscordSession>,
    runtime: Option<tokio::runtime::Handle>,
}

impl DiscordActivityClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Background task that owns the Discord connection for one session
    async fn run_session(
        discord: Discord,
        mut user: watch::Receiver<UserState>,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    ) {
        if !wait_for_connection(&mut user, HANDSHAKE_TIMEOUT).await {
            drop(commands);
            disconnect(discord).await;
            return;
        }

        while let Some(mut command) = commands.recv().await {
            // Updates queued during the handshake are superseded by the newest one
            while let Ok(next) = commands.try_recv() {
                command = next;
            }

            let result = match command {
                SessionCommand::Update(content) => {
                    discord.update_activity(content.into_builder()).await
                }
                SessionCommand::Clear => discord.clear_activity().await,
            };

            if let Err(e) = result {
                tracing::debug!("Failed to update Discord activity: {:?}", e);
            }
        }

        if let Err(e) = discord.clear_activity().await {
            tracing::debug!("Failed to clear Discord activity: {:?}", e);
        }
        disconnect(discord).await;
        tracing::info!("Discord Rich Presence disconnected");
    }

    fn connect(&mut self, application_id: i64) -> Result<()> {
        let runtime = self
            .runtime
            .clone()
            .ok_or_else(|| RelayError::Activity("Client was not initialized".to_string()))?;

        let (wheel, handler) = Wheel::new(Box::new(|err| {
            tracing::warn!("Discord error: {:?}", err);
        }));
        let user = wheel.user().0;

        // Discord::new spawns its IO tasks on the ambient runtime
        let _guard = runtime.enter();
        let discord = Discord::new(application_id, Subscriptions::ACTIVITY, Box::new(handler))?;

        tracing::info!("Discord connecting for application {}...", application_id);

        let (commands, command_rx) = mpsc::unbounded_channel();
        runtime.spawn(Self::run_session(discord, user.clone(), command_rx));

        self.session = Some(DiscordSession {
            application_id,
            commands,
            user,
        });
        Ok(())
    }

    /// Reconnect for the same application if the session task has given up.
    ///
    /// A failed reconnect keeps the dead session so the next call tries again.
    fn revive_session(&mut self) -> Result<()> {
        let application_id = match &self.session {
            Some(session) if !session.is_alive() => session.application_id,
            _ => return Ok(()),
        };

        tracing::info!("Discord session for {} ended, reconnecting", application_id);
        self.connect(application_id)
    }
}

impl ActivityClient for DiscordActivityClient {
    fn name(&self) -> &'static str {
        "Discord"
    }

    fn initialize(&mut self) -> Result<()> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| RelayError::Initialization(format!("No async runtime: {}", e)))?;
        self.runtime = Some(handle);
        Ok(())
    }

    fn start(&mut self, application_id: i64) -> Result<()> {
        self.connect(application_id)
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            tracing::debug!("Stopping Discord session for {}", session.application_id);
            let _ = session.commands.send(SessionCommand::Clear);
        }
        Ok(())
    }

    fn update(&mut self, activity: &PresenceSnapshot) -> Result<()> {
        self.revive_session()?;

        let session = self
            .session
            .as_ref()
            .ok_or_else(|| RelayError::Activity("Discord session not started".to_string()))?;

        if session.application_id != activity.application_id {
            return Err(RelayError::Activity(format!(
                "Session belongs to application {}, not {}",
                session.application_id, activity.application_id
            )));
        }

        session
            .commands
            .send(SessionCommand::Update(ActivityContent::from_snapshot(activity)))
            .map_err(|_| RelayError::Activity("Discord session has ended".to_string()))
    }

    fn run_callbacks(&mut self) -> Result<()> {
        self.revive_session()?;

        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        if !session.user.has_changed().unwrap_or(false) {
            return Ok(());
        }

        match &*session.user.borrow_and_update() {
            UserState::Connected(user) => tracing::info!(
                "Discord Rich Presence connected as {}#{}",
                user.username,
                user.discriminator.unwrap_or(0)
            ),
            UserState::Disconnected(err) => {
                tracing::warn!("Discord disconnected: {:?}", err)
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::testing::payload_for;

    #[test]
    fn test_initialize_requires_runtime() {
        let mut client = DiscordActivityClient::new();
        assert!(matches!(
            client.initialize(),
            Err(RelayError::Initialization(_))
        ));
    }

    #[tokio::test]
    async fn test_calls_without_session() {
        let mut client = DiscordActivityClient::new();
        client.initialize().unwrap();

        assert!(client.stop().is_ok());
        assert!(client.run_callbacks().is_ok());

        let activity = PresenceSnapshot::from_payload(&payload_for(1, "Lobby")).unwrap();
        assert!(matches!(
            client.update(&activity),
            Err(RelayError::Activity(_))
        ));
    }

    #[test]
    fn test_start_requires_initialize() {
        let mut client = DiscordActivityClient::new();
        assert!(matches!(client.start(1), Err(RelayError::Activity(_))));
    }

    fn snapshot(application_id: i64) -> PresenceSnapshot {
        PresenceSnapshot::from_payload(&payload_for(application_id, "Lobby")).unwrap()
    }

    /// Session wired to a local channel instead of a Discord task
    fn local_session(
        application_id: i64,
    ) -> (DiscordSession, mpsc::UnboundedReceiver<SessionCommand>) {
        let (wheel, _handler) = Wheel::new(Box::new(|_| {}));
        let (commands, command_rx) = mpsc::unbounded_channel();
        let session = DiscordSession {
            application_id,
            commands,
            user: wheel.user().0,
        };
        (session, command_rx)
    }

    #[test]
    fn test_content_sends_only_positive_timestamps() {
        let mut activity = snapshot(1);
        activity.activity_start = 0;
        activity.activity_end = -5;
        let content = ActivityContent::from_snapshot(&activity);
        assert_eq!(content.start, None);
        assert_eq!(content.end, None);

        activity.activity_start = 1700000000;
        activity.activity_end = 1700003600;
        let content = ActivityContent::from_snapshot(&activity);
        assert_eq!(content.start, Some(1700000000));
        assert_eq!(content.end, Some(1700003600));
    }

    #[test]
    fn test_content_skips_assets_without_image_id() {
        let mut activity = snapshot(1);
        activity.small_image_id = String::new();
        activity.large_image_text = String::new();
        let content = ActivityContent::from_snapshot(&activity);

        assert_eq!(content.small, None);
        assert_eq!(content.large, Some(("large".to_string(), None)));
        assert_eq!(content.details, "Lobby");
        assert_eq!(content.state, "Playing");

        let content = ActivityContent::from_snapshot(&snapshot(1));
        assert_eq!(
            content.small,
            Some(("small".to_string(), Some("Small".to_string())))
        );
    }

    #[test]
    fn test_update_rejects_other_application() {
        let (session, mut command_rx) = local_session(42);
        let mut client = DiscordActivityClient {
            session: Some(session),
            runtime: None,
        };

        assert!(matches!(
            client.update(&snapshot(7)),
            Err(RelayError::Activity(_))
        ));
        assert!(command_rx.try_recv().is_err());

        client.update(&snapshot(42)).unwrap();
        match command_rx.try_recv() {
            Ok(SessionCommand::Update(content)) => {
                assert_eq!(content, ActivityContent::from_snapshot(&snapshot(42)))
            }
            _ => panic!("expected an update command"),
        }
    }

    #[test]
    fn test_stop_clears_and_ends_session() {
        let (session, mut command_rx) = local_session(42);
        let mut client = DiscordActivityClient {
            session: Some(session),
            runtime: None,
        };

        client.stop().unwrap();
        assert!(client.session.is_none());
        assert!(matches!(command_rx.try_recv(), Ok(SessionCommand::Clear)));
        assert!(matches!(
            command_rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_gives_up_without_connection() {
        let (wheel, handler) = Wheel::new(Box::new(|_| {}));
        let mut user = wheel.user().0;
        assert!(!wait_for_connection(&mut user, HANDSHAKE_TIMEOUT).await);

        drop(handler);
        assert!(!wait_for_connection(&mut user, HANDSHAKE_TIMEOUT).await);
    }

    #[tokio::test]
    async fn test_dead_session_is_reconnected() {
        let (session, command_rx) = local_session(42);
        drop(command_rx);

        let mut client = DiscordActivityClient::new();
        client.initialize().unwrap();
        client.session = Some(session);

        client.run_callbacks().unwrap();
        let revived = client.session.as_ref().unwrap();
        assert_eq!(revived.application_id, 42);
        assert!(revived.is_alive());

        client.stop().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_handshake_closes_session() {
        let mut client = DiscordActivityClient::new();
        client.initialize().unwrap();
        client.start(42).unwrap();
        assert!(client.session.as_ref().unwrap().is_alive());

        // No Discord client is reachable in tests, so the handshake runs out
        tokio::time::sleep(HANDSHAKE_TIMEOUT + Duration::from_secs(1)).await;
        assert!(!client.session.as_ref().unwrap().is_alive());

        // The next update starts over for the same application
        client.update(&snapshot(42)).unwrap();
        assert!(client.session.as_ref().unwrap().is_alive());

        client.stop().unwrap();
    }
}
