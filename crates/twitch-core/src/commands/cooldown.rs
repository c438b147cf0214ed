use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Global and per-user cooldown state for one command. Expiry is checked
/// lazily on every query, so no timers are involved.
#[derive(Debug)]
pub struct Cooldown {
    user: Duration,
    global: Duration,
    state: Mutex<CooldownState>,
}

#[derive(Debug, Default)]
struct CooldownState {
    global_until: Option<Instant>,
    users: HashMap<String, Instant>,
}

impl CooldownState {
    fn prune(&mut self, now: Instant) {
        if self.global_until.is_some_and(|until| until <= now) {
            self.global_until = None;
        }
        self.users.retain(|_, until| *until > now);
    }

    // "user has an entry and the global cooldown is active, otherwise the
    // global flag" reduces to the global flag; user entries never block alone.
    fn blocks(&self, _user: &str) -> bool {
        self.global_until.is_some()
    }

    fn arm(&mut self, user: &str, user_for: Duration, global_for: Duration, now: Instant) {
        if !global_for.is_zero() {
            self.global_until = Some(now + global_for);
        }
        if !user_for.is_zero() {
            self.users.insert(user.to_string(), now + user_for);
        }
    }
}

impl Cooldown {
    pub fn new(user: Duration, global: Duration) -> Self {
        Self {
            user,
            global,
            state: Mutex::new(CooldownState::default()),
        }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn user_duration(&self) -> Duration {
        self.user
    }

    pub fn global_duration(&self) -> Duration {
        self.global
    }

    pub fn has_cooldown(&self, user: &str) -> bool {
        let mut state = self.state.lock();
        state.prune(Instant::now());
        state.blocks(user)
    }

    pub fn add_cooldown(&self, user: &str) {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.prune(now);
        state.arm(user, self.user, self.global, now);
    }

    /// Checks and arms under one lock. Returns false when the command is on
    /// cooldown for `user`.
    pub fn try_start(&self, user: &str) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.prune(now);
        if state.blocks(user) {
            return false;
        }
        state.arm(user, self.user, self.global, now);
        true
    }

    pub fn has_user_entry(&self, user: &str) -> bool {
        let mut state = self.state.lock();
        state.prune(Instant::now());
        state.users.contains_key(user)
    }

    pub fn is_global_active(&self) -> bool {
        let mut state = self.state.lock();
        state.prune(Instant::now());
        state.global_until.is_some()
    }
}

impl Default for Cooldown {
    fn default() -> Self {
        Self::none()
    }
}
