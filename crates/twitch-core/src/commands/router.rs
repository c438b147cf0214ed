use super::{build_command_list, CommandMatcher, Invocable, ModifiedCommand, TextCommand};
use crate::config::BotConfig;
use crate::points::PointsStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Global commands plus one matcher per channel. A channel command shadows a
/// global command with the same alias.
pub struct CommandRouter {
    global: Arc<CommandMatcher>,
    channels: RwLock<HashMap<String, Arc<CommandMatcher>>>,
}

fn channel_key(channel: &str) -> String {
    channel.trim_start_matches('#').to_lowercase()
}

impl CommandRouter {
    pub fn new(global: CommandMatcher) -> Self {
        Self {
            global: Arc::new(global),
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Built-ins, then configured text commands, then overrides of built-in replies.
    pub fn from_config(cfg: &BotConfig, points: Arc<dyn PointsStore>) -> Self {
        let router = Self::new(CommandMatcher::new(
            &cfg.bot.commands.prefix,
            &cfg.bot.commands.separator,
        ));
        for entry in build_command_list(points) {
            router.global.register(&entry.aliases, entry.command);
        }

        for text in &cfg.text_commands {
            if text.aliases.is_empty() {
                warn!(response = %text.response, "text command without aliases, skipping");
                continue;
            }
            router
                .scope(text.channel.as_deref())
                .register(&text.aliases, Arc::new(TextCommand::from_config(text)));
        }

        for modified in &cfg.modified_commands {
            let Some(builtin) = router.global.get(&modified.command) else {
                warn!(command = %modified.command, "modified command names no built-in, skipping");
                continue;
            };
            let aliases = router.global.aliases_for(&builtin);
            router
                .scope(modified.channel.as_deref())
                .register(&aliases, Arc::new(ModifiedCommand::new(builtin, &modified.text)));
        }
        router
    }

    pub fn global(&self) -> &CommandMatcher {
        &self.global
    }

    /// The matcher for `channel`, created empty on first use.
    pub fn channel(&self, channel: &str) -> Arc<CommandMatcher> {
        let mut channels = self.channels.write();
        channels
            .entry(channel_key(channel))
            .or_insert_with(|| {
                Arc::new(CommandMatcher::new(
                    self.global.prefix(),
                    self.global.separator(),
                ))
            })
            .clone()
    }

    fn scope(&self, channel: Option<&str>) -> Arc<CommandMatcher> {
        match channel {
            Some(channel) => self.channel(channel),
            None => self.global.clone(),
        }
    }

    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn match_text(&self, channel: &str, text: &str) -> Option<(Arc<dyn Invocable>, Vec<String>)> {
        let scoped = self.channels.read().get(&channel_key(channel)).cloned();
        scoped
            .and_then(|matcher| matcher.match_text(text))
            .or_else(|| self.global.match_text(text))
    }
}
