use crate::rate::{RateLimiter, RateWindow, CHAT_ENDPOINT};
use crate::transport::{PLAIN_ADDR, TLS_ADDR};
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub bot: BotSection,
    pub connection: ConnectionConfig,
    pub rate: HashMap<String, RateWindow>,
    pub text_commands: Vec<TextCommandConfig>,
    pub timed_commands: Vec<TimedCommandConfig>,
    pub modified_commands: Vec<ModifiedCommandConfig>,
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct BotSection {
    pub nickname: String,
    pub oauth_token: String,
    pub commands: CommandsSection,
}

impl std::fmt::Debug for BotSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotSection")
            .field("nickname", &self.nickname)
            .field("oauth_token", &"***")
            .field("commands", &self.commands)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommandsSection {
    pub prefix: String,
    pub separator: String,
}

impl Default for CommandsSection {
    fn default() -> Self {
        Self {
            prefix: "!".into(),
            separator: " ".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub tls: bool,
    pub insecure: bool,
    pub ca: Option<PathBuf>,
    pub tls_addr: String,
    pub plain_addr: String,
    pub membership: bool,
    pub channels: Vec<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            tls: true,
            insecure: false,
            ca: None,
            tls_addr: TLS_ADDR.into(),
            plain_addr: PLAIN_ADDR.into(),
            membership: true,
            channels: Vec::new(),
        }
    }
}

/// A command that answers with fixed text. Without a channel it answers
/// everywhere.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TextCommandConfig {
    pub channel: Option<String>,
    pub aliases: Vec<String>,
    pub response: String,
    pub description: String,
    pub user_cooldown_secs: u64,
    pub global_cooldown_secs: u64,
}

impl TextCommandConfig {
    pub fn user_cooldown(&self) -> Duration {
        Duration::from_secs(self.user_cooldown_secs)
    }

    pub fn global_cooldown(&self) -> Duration {
        Duration::from_secs(self.global_cooldown_secs)
    }
}

/// Text posted to a channel every `interval_secs`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimedCommandConfig {
    pub channel: String,
    pub interval_secs: u64,
    pub text: String,
}

impl TimedCommandConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Replaces the reply of a built-in command. `{response}` expands to the
/// built-in reply and `{user}` to the caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModifiedCommandConfig {
    pub channel: Option<String>,
    pub command: String,
    pub text: String,
}

impl BotConfig {
    /// Reads the config file; a missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).context("read config")?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        toml::from_str::<BotConfig>(raw).context("parse config")
    }

    /// Buckets for every configured endpoint, with the chat endpoint always present.
    pub fn rate_limiter(&self) -> RateLimiter {
        let mut windows = self.rate.clone();
        windows
            .entry(CHAT_ENDPOINT.to_string())
            .or_insert_with(RateWindow::default);
        RateLimiter::new(windows)
    }
}
