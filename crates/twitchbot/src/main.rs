use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use twitch_core::handlers::{command_handler, join_logger};
use twitch_core::{BotConfig, CommandRouter, InMemoryPoints, IrcClient, MessageSender, TimedCommand};

#[derive(Parser, Debug)]
#[command(name = "twitchbot", version, about = "Twitch chat bot")]
struct Cli {
    #[arg(long, default_value = "./config/bot.toml")]
    config: PathBuf,

    /// Overrides `bot.nickname`.
    #[arg(long)]
    nick: Option<String>,

    /// Overrides `bot.oauth_token`.
    #[arg(long)]
    token: Option<String>,

    #[arg(long)]
    plaintext: bool,

    #[arg(long)]
    insecure: bool,

    /// Extra channel to join; may be repeated.
    #[arg(long = "channel")]
    channels: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut cfg = BotConfig::load(&cli.config)?;
    apply_overrides(&mut cfg, &cli);

    if cfg.bot.nickname.is_empty() || cfg.bot.oauth_token.is_empty() {
        anyhow::bail!("must specify nickname and oauth token");
    }

    let router = Arc::new(CommandRouter::from_config(&cfg, Arc::new(InMemoryPoints::new())));
    info!(
        commands = router.global().len(),
        prefix = %router.global().prefix(),
        channels = ?router.channel_names(),
        "commands registered"
    );

    let client = IrcClient::with_limiter(cfg.connection.clone(), cfg.rate_limiter());
    client.add_handler(command_handler(router));
    client.add_handler(join_logger());

    client
        .connect(&cfg.bot.nickname, &cfg.bot.oauth_token)
        .await
        .context("connect")?;

    for channel in &cfg.connection.channels {
        if let Err(err) = client.join_channel(channel).await {
            error!(%err, %channel, "join failed");
        }
    }

    let sender: Arc<dyn MessageSender> = Arc::new(client.clone());
    let mut timers = Vec::new();
    for entry in &cfg.timed_commands {
        let Some(timed) = TimedCommand::from_config(entry) else {
            warn!(channel = %entry.channel, "timed command needs a channel, text and interval, skipping");
            continue;
        };
        info!(channel = %timed.channel(), period = ?timed.period(), "timed command scheduled");
        timers.push(timed.spawn(sender.clone()));
    }

    tokio::signal::ctrl_c().await.context("wait for shutdown signal")?;
    info!("shutting down");
    for timer in timers {
        timer.abort();
    }
    client.close().await;
    Ok(())
}

fn apply_overrides(cfg: &mut BotConfig, cli: &Cli) {
    if let Some(nick) = &cli.nick {
        cfg.bot.nickname = nick.clone();
    }
    if let Some(token) = &cli.token {
        cfg.bot.oauth_token = token.clone();
    }
    if cli.plaintext {
        cfg.connection.tls = false;
    }
    if cli.insecure {
        cfg.connection.insecure = true;
    }
    for channel in &cli.channels {
        if !cfg.connection.channels.contains(channel) {
            cfg.connection.channels.push(channel.clone());
        }
    }
}
