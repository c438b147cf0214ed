use crate::error::{ClientError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

/// Endpoint that every outbound chat line is counted against.
pub const CHAT_ENDPOINT: &str = "chat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateWindow {
    pub limit: u32,
    #[serde(rename = "reset_interval_secs", deserialize_with = "secs::deserialize")]
    pub reset_interval: Duration,
}

impl RateWindow {
    pub fn new(limit: u32, reset_interval: Duration) -> Self {
        Self {
            limit,
            reset_interval,
        }
    }
}

impl Default for RateWindow {
    fn default() -> Self {
        Self::new(150, Duration::from_secs(60))
    }
}

mod secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

#[derive(Debug)]
pub struct Bucket {
    window: RateWindow,
    current: u32,
    reset: Option<Instant>,
}

impl Bucket {
    fn new(window: RateWindow) -> Self {
        Self {
            window,
            current: 0,
            reset: None,
        }
    }

    fn increment(&mut self) -> Result<()> {
        let now = Instant::now();
        let interval = self.window.reset_interval;
        match self.reset {
            None => self.reset = Some(now + interval),
            Some(reset) if reset <= now && self.current == 0 => self.reset = Some(now + interval),
            _ => {}
        }
        let reset = self.reset.unwrap_or(now);
        if self.current >= self.window.limit && reset > now {
            return Err(ClientError::RateLimitExceeded);
        }
        if reset <= now {
            self.current = 0;
            self.reset = Some(now + interval);
        }
        self.current += 1;
        Ok(())
    }
}

/// Named token buckets. The map is fixed at construction; each bucket has its
/// own lock held for the whole capture..release sequence.
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    buckets: Arc<HashMap<String, Arc<Mutex<Bucket>>>>,
}

impl RateLimiter {
    pub fn new(input: HashMap<String, RateWindow>) -> Self {
        let buckets = input
            .into_iter()
            .map(|(name, window)| (name, Arc::new(Mutex::new(Bucket::new(window)))))
            .collect();
        Self {
            buckets: Arc::new(buckets),
        }
    }

    /// The limiter the client uses unless configured otherwise.
    pub fn chat_default() -> Self {
        Self::new(HashMap::from([(CHAT_ENDPOINT.to_string(), RateWindow::default())]))
    }

    /// Locks the named bucket until the returned guard is released or dropped.
    /// Waits for other holders rather than failing.
    pub async fn capture_endpoint(&self, endpoint: &str) -> Result<BucketGuard> {
        let bucket = self
            .buckets
            .get(endpoint)
            .ok_or_else(|| ClientError::UnknownEndpoint(endpoint.to_string()))?;
        let guard = bucket.clone().lock_owned().await;
        Ok(BucketGuard { guard })
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }
}

/// Exclusive handle on one bucket. Dropping it releases the bucket.
#[derive(Debug)]
pub struct BucketGuard {
    guard: OwnedMutexGuard<Bucket>,
}

impl BucketGuard {
    pub fn increment(&mut self) -> Result<()> {
        self.guard.increment()
    }

    pub fn current(&self) -> u32 {
        self.guard.current
    }

    pub fn limit(&self) -> u32 {
        self.guard.window.limit
    }

    pub fn release(self) {}
}
