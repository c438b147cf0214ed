use crate::commands::MessageSender;
use crate::config::TimedCommandConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Text posted to one channel on a fixed period. The first post happens one
/// period after the task starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedCommand {
    channel: String,
    period: Duration,
    text: String,
}

impl TimedCommand {
    /// `None` when the entry has no channel, no text or a zero interval.
    pub fn from_config(cfg: &TimedCommandConfig) -> Option<Self> {
        let channel = cfg.channel.trim_start_matches('#');
        if channel.is_empty() || cfg.text.is_empty() || cfg.interval_secs == 0 {
            return None;
        }
        Some(Self {
            channel: channel.to_string(),
            period: cfg.interval(),
            text: cfg.text.clone(),
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Posts until the returned task is aborted. Failed sends are logged and
    /// the schedule continues.
    pub fn spawn(self, sender: Arc<dyn MessageSender>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.period, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match sender.send_message(&self.channel, &self.text).await {
                    Ok(()) => debug!(channel = %self.channel, "timed message sent"),
                    Err(err) => warn!(%err, channel = %self.channel, "timed message failed"),
                }
            }
        })
    }
}
