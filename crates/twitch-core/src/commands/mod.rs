//! Prefix-routed chat commands.

pub mod builtin;
pub mod cooldown;
pub mod matcher;
pub mod router;

use crate::client::IrcClient;
use crate::error::Result;
use crate::points::PointsStore;
use crate::protocol::MessageEvent;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use builtin::{ModifiedCommand, PingPong, Points, TextCommand};
pub use cooldown::Cooldown;
pub use matcher::CommandMatcher;
pub use router::CommandRouter;

/// Metadata and cooldown state shared by every command.
#[derive(Debug, Default)]
pub struct Command {
    pub description: String,
    pub cooldown: Cooldown,
}

impl Command {
    pub fn new(user_cooldown: Duration, global_cooldown: Duration, description: &str) -> Self {
        Self {
            description: description.to_string(),
            cooldown: Cooldown::new(user_cooldown, global_cooldown),
        }
    }
}

/// Where command replies go.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, channel: &str, text: &str) -> Result<()>;
}

#[async_trait]
impl MessageSender for IrcClient {
    async fn send_message(&self, channel: &str, text: &str) -> Result<()> {
        IrcClient::send_message(self, channel, text).await
    }
}

#[async_trait]
pub trait Invocable: Send + Sync {
    fn command(&self) -> &Command;

    async fn invoke(
        &self,
        args: &[String],
        event: &MessageEvent,
        sender: &dyn MessageSender,
    ) -> Result<()>;
}

pub struct CommandListEntry {
    pub aliases: Vec<String>,
    pub command: Arc<dyn Invocable>,
}

impl CommandListEntry {
    pub fn new(command: Arc<dyn Invocable>, aliases: &[&str]) -> Self {
        Self {
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            command,
        }
    }
}

/// Built-in commands, ready to register with a matcher.
pub fn build_command_list(points: Arc<dyn PointsStore>) -> Vec<CommandListEntry> {
    vec![
        CommandListEntry::new(Arc::new(PingPong::new()), &["ping"]),
        CommandListEntry::new(Arc::new(Points::new(points)), &["points"]),
    ]
}
