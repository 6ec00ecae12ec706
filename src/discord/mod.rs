mod activity;

pub use activity::DiscordActivityClient;
