use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPoints {
    pub username: String,
    pub channel: String,
    pub amount: i64,
}

/// Per-channel points keyed by (username, channel).
#[async_trait]
pub trait PointsStore: Send + Sync {
    async fn get_points(&self, username: &str, channel: &str) -> anyhow::Result<Option<UserPoints>>;
    async fn create_points(&self, username: &str, channel: &str) -> anyhow::Result<UserPoints>;
    async fn update_points(&self, points: &UserPoints, new_amount: i64) -> anyhow::Result<UserPoints>;
}

#[derive(Debug, Default)]
pub struct InMemoryPoints {
    entries: Mutex<HashMap<(String, String), UserPoints>>,
}

impl InMemoryPoints {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(username: &str, channel: &str) -> (String, String) {
    (username.to_lowercase(), channel.to_lowercase())
}

#[async_trait]
impl PointsStore for InMemoryPoints {
    async fn get_points(&self, username: &str, channel: &str) -> anyhow::Result<Option<UserPoints>> {
        let entries = self.entries.lock().await;
        Ok(entries.get(&key(username, channel)).cloned())
    }

    async fn create_points(&self, username: &str, channel: &str) -> anyhow::Result<UserPoints> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .entry(key(username, channel))
            .or_insert_with(|| UserPoints {
                username: username.to_string(),
                channel: channel.to_string(),
                amount: 0,
            });
        Ok(entry.clone())
    }

    async fn update_points(&self, points: &UserPoints, new_amount: i64) -> anyhow::Result<UserPoints> {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get_mut(&key(&points.username, &points.channel)) else {
            anyhow::bail!("no points for {} in #{}", points.username, points.channel);
        };
        entry.amount = new_amount;
        Ok(entry.clone())
    }
}
