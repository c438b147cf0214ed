use super::Invocable;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps `<prefix><alias>` to a command. Aliases are exact and case-sensitive;
/// registering an existing alias replaces it.
pub struct CommandMatcher {
    prefix: String,
    separator: String,
    commands: RwLock<HashMap<String, Arc<dyn Invocable>>>,
}

impl CommandMatcher {
    pub fn new(prefix: &str, separator: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            separator: separator.to_string(),
            commands: RwLock::new(HashMap::new()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn get(&self, alias: &str) -> Option<Arc<dyn Invocable>> {
        self.commands.read().get(alias).cloned()
    }

    /// Every alias bound to `command`, sorted.
    pub fn aliases_for(&self, command: &Arc<dyn Invocable>) -> Vec<String> {
        let mut aliases: Vec<String> = self
            .commands
            .read()
            .iter()
            .filter(|(_, bound)| Arc::ptr_eq(bound, command))
            .map(|(alias, _)| alias.clone())
            .collect();
        aliases.sort();
        aliases
    }

    pub fn register<S: AsRef<str>>(&self, aliases: &[S], command: Arc<dyn Invocable>) {
        let mut commands = self.commands.write();
        for alias in aliases {
            commands.insert(alias.as_ref().to_string(), command.clone());
        }
    }

    pub fn deregister<S: AsRef<str>>(&self, aliases: &[S]) {
        let mut commands = self.commands.write();
        for alias in aliases {
            commands.remove(alias.as_ref());
        }
    }

    /// Returns the command named by the first token and the remaining tokens.
    pub fn match_text(&self, text: &str) -> Option<(Arc<dyn Invocable>, Vec<String>)> {
        if text.is_empty() || self.separator.is_empty() {
            return None;
        }
        let mut tokens = text.split(self.separator.as_str());
        let alias = tokens.next()?.strip_prefix(self.prefix.as_str())?;
        let command = self.commands.read().get(alias).cloned()?;
        Some((command, tokens.map(str::to_string).collect()))
    }

    pub fn len(&self) -> usize {
        self.commands.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Command, MessageSender, PingPong};
    use crate::error::Result;
    use crate::protocol::MessageEvent;
    use async_trait::async_trait;

    struct Echo {
        cmd: Command,
    }

    #[async_trait]
    impl Invocable for Echo {
        fn command(&self) -> &Command {
            &self.cmd
        }

        async fn invoke(&self, _: &[String], _: &MessageEvent, _: &dyn MessageSender) -> Result<()> {
            Ok(())
        }
    }

    fn echo(description: &str) -> Arc<dyn Invocable> {
        Arc::new(Echo {
            cmd: Command::new(Default::default(), Default::default(), description),
        })
    }

    #[test]
    fn matches_prefixed_alias() {
        let matcher = CommandMatcher::new("!", " ");
        matcher.register(&["ping"], Arc::new(PingPong::new()));

        let (cmd, args) = matcher.match_text("!ping").unwrap();
        assert_eq!(cmd.command().description, "Ping pong!");
        assert!(args.is_empty());

        let (_, args) = matcher.match_text("!ping a b").unwrap();
        assert_eq!(args, vec!["a", "b"]);

        assert!(matcher.match_text("hello").is_none());
        assert!(matcher.match_text("ping").is_none());
        assert!(matcher.match_text("").is_none());
        assert!(matcher.match_text(" !ping").is_none());
    }

    #[test]
    fn no_partial_or_case_insensitive_matches() {
        let matcher = CommandMatcher::new("!", " ");
        matcher.register(&["ping"], echo("ping"));
        assert!(matcher.match_text("!pin").is_none());
        assert!(matcher.match_text("!pingg").is_none());
        assert!(matcher.match_text("!PING").is_none());
    }

    #[test]
    fn deregister_removes_only_named_aliases() {
        let matcher = CommandMatcher::new("!", " ");
        matcher.register(&["ping", "p"], echo("ping"));
        let ping = matcher.get("ping").unwrap();
        assert_eq!(matcher.aliases_for(&ping), vec!["p", "ping"]);
        matcher.deregister(&["p"]);
        assert_eq!(matcher.aliases_for(&ping), vec!["ping"]);
        assert!(matcher.match_text("!ping").is_some());
        assert!(matcher.match_text("!p").is_none());
        assert_eq!(matcher.len(), 1);
    }

    #[test]
    fn last_registration_wins() {
        let matcher = CommandMatcher::new("!", " ");
        matcher.register(&["x"], echo("first"));
        matcher.register(&["x"], echo("second"));
        let (cmd, _) = matcher.match_text("!x").unwrap();
        assert_eq!(cmd.command().description, "second");
    }

    #[test]
    fn custom_separator() {
        let matcher = CommandMatcher::new("?", ",");
        matcher.register(&["roll"], echo("roll"));
        let (_, args) = matcher.match_text("?roll,1,6").unwrap();
        assert_eq!(args, vec!["1", "6"]);
        assert!(matcher.match_text("?roll 1 6").is_none());
    }
}
