use crate::client::IrcClient;
use crate::commands::CommandRouter;
use crate::dispatch::Handler;
use crate::protocol::MessageEvent;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Message handler that routes prefixed messages to the commands of the
/// message's channel, honouring each command's cooldown for the author.
pub fn command_handler(router: Arc<CommandRouter>) -> Handler {
    Handler::on_message(move |client: IrcClient, event: Arc<MessageEvent>| {
        let router = router.clone();
        async move {
            let Some((command, args)) = router.match_text(&event.channel, &event.message) else {
                return;
            };
            let cooldown = &command.command().cooldown;
            if !cooldown.try_start(&event.author) {
                debug!(
                    user = %event.author,
                    text = %event.message,
                    global = ?cooldown.global_duration(),
                    "command on cooldown"
                );
                return;
            }
            if let Err(err) = command.invoke(&args, &event, &client).await {
                warn!(%err, channel = %event.channel, text = %event.message, "command failed");
            }
        }
    })
}

/// Join handler that logs who entered which channel.
pub fn join_logger() -> Handler {
    Handler::on_join(|_client: IrcClient, event| async move {
        info!(user = %event.user, channel = %event.channel, "user joined channel");
    })
}
