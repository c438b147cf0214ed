use super::{Command, Invocable, MessageSender};
use crate::config::TextCommandConfig;
use crate::error::{ClientError, Result};
use crate::points::PointsStore;
use crate::protocol::MessageEvent;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub struct PingPong {
    cmd: Command,
}

impl PingPong {
    pub fn new() -> Self {
        Self {
            cmd: Command::new(Duration::ZERO, Duration::ZERO, "Ping pong!"),
        }
    }
}

impl Default for PingPong {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Invocable for PingPong {
    fn command(&self) -> &Command {
        &self.cmd
    }

    async fn invoke(&self, _args: &[String], event: &MessageEvent, sender: &dyn MessageSender) -> Result<()> {
        sender.send_message(&event.channel, "Pong!").await
    }
}

/// Replies with the author's points in the current channel.
pub struct Points {
    cmd: Command,
    store: Arc<dyn PointsStore>,
}

impl Points {
    pub fn new(store: Arc<dyn PointsStore>) -> Self {
        Self {
            cmd: Command::new(Duration::from_secs(10), Duration::ZERO, "Show your points"),
            store,
        }
    }
}

#[async_trait]
impl Invocable for Points {
    fn command(&self) -> &Command {
        &self.cmd
    }

    async fn invoke(&self, _args: &[String], event: &MessageEvent, sender: &dyn MessageSender) -> Result<()> {
        let existing = self
            .store
            .get_points(&event.author, &event.channel)
            .await
            .map_err(ClientError::Store)?;
        let points = match existing {
            Some(points) => points,
            None => self
                .store
                .create_points(&event.author, &event.channel)
                .await
                .map_err(ClientError::Store)?,
        };
        let reply = format!("{} has {} points", event.author, points.amount);
        sender.send_message(&event.channel, &reply).await
    }
}

/// Fixed-response command defined in the config.
pub struct TextCommand {
    cmd: Command,
    response: String,
}

impl TextCommand {
    pub fn new(response: &str, cmd: Command) -> Self {
        Self {
            cmd,
            response: response.to_string(),
        }
    }

    pub fn from_config(cfg: &TextCommandConfig) -> Self {
        Self::new(
            &cfg.response,
            Command::new(cfg.user_cooldown(), cfg.global_cooldown(), &cfg.description),
        )
    }
}

#[async_trait]
impl Invocable for TextCommand {
    fn command(&self) -> &Command {
        &self.cmd
    }

    async fn invoke(&self, _args: &[String], event: &MessageEvent, sender: &dyn MessageSender) -> Result<()> {
        sender.send_message(&event.channel, &self.response).await
    }
}

/// A built-in command whose reply is replaced by configured text. It shares
/// the wrapped command's cooldowns.
pub struct ModifiedCommand {
    inner: Arc<dyn Invocable>,
    text: String,
}

impl ModifiedCommand {
    pub fn new(inner: Arc<dyn Invocable>, text: &str) -> Self {
        Self {
            inner,
            text: text.to_string(),
        }
    }
}

#[async_trait]
impl Invocable for ModifiedCommand {
    fn command(&self) -> &Command {
        self.inner.command()
    }

    async fn invoke(&self, args: &[String], event: &MessageEvent, sender: &dyn MessageSender) -> Result<()> {
        let rewrite = Rewrite {
            sender,
            text: &self.text,
            user: &event.author,
        };
        self.inner.invoke(args, event, &rewrite).await
    }
}

struct Rewrite<'a> {
    sender: &'a dyn MessageSender,
    text: &'a str,
    user: &'a str,
}

#[async_trait]
impl MessageSender for Rewrite<'_> {
    async fn send_message(&self, channel: &str, text: &str) -> Result<()> {
        let reply = self
            .text
            .replace("{response}", text)
            .replace("{user}", self.user);
        self.sender.send_message(channel, &reply).await
    }
}
