//! Sliding-window rate limiter with temporary blocking.
//!
//! Attempts are tracked per `(class, identity)` pair. An identity that exceeds a
//! class's policy is blocked for that class for the configured block duration.
//! Manual blocks issued by staff apply to every class.
//!
//! All arithmetic uses the monotonic [`tokio::time::Instant`], so windows are
//! immune to wall-clock jumps and can be driven by `tokio::time::pause` in tests.

use crate::config::RateLimitConfig;
use crate::error::RateLimitError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Upper bound for manual blocks
const MAX_MANUAL_BLOCK: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Kind of request being throttled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LimitClass {
    /// Reservation submissions
    Reservation,
    /// Generic form posts
    FormSubmit,
    /// Outgoing emails
    EmailSend,
    /// Read-style API calls
    ApiCall,
}

impl LimitClass {
    /// Every class
    pub const ALL: [Self; 4] = [
        Self::Reservation,
        Self::FormSubmit,
        Self::EmailSend,
        Self::ApiCall,
    ];

    /// Stable name used in logs and metric labels
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reservation => "reservation",
            Self::FormSubmit => "form-submit",
            Self::EmailSend => "email-send",
            Self::ApiCall => "api-call",
        }
    }

    /// Built-in policy for this class
    #[must_use]
    pub const fn default_policy(self) -> RateLimitPolicy {
        match self {
            Self::Reservation => RateLimitPolicy::new(5, 60),
            Self::FormSubmit => RateLimitPolicy::new(3, 60),
            Self::EmailSend => RateLimitPolicy::new(10, 300),
            Self::ApiCall => RateLimitPolicy::new(30, 60),
        }
    }
}

/// Attempts allowed per rolling window
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Attempts allowed inside one window
    pub max_attempts: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

impl RateLimitPolicy {
    /// Create a policy
    #[must_use]
    pub const fn new(max_attempts: u32, window_secs: u64) -> Self {
        Self {
            max_attempts,
            window_secs,
        }
    }

    /// Window length
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Result of a successful check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitStatus {
    /// Attempts left in the current window after this one
    pub remaining: u32,
    /// Seconds until the oldest recorded attempt leaves the window
    pub reset_in_secs: u64,
}

/// Snapshot of one identity's throttle state for a class
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Attempts inside the current window
    pub attempts: u32,
    /// Attempts left
    pub remaining: u32,
    /// Time left on an active block
    pub blocked_for: Option<Duration>,
}

#[derive(Debug, Default)]
struct Entry {
    attempts: VecDeque<Instant>,
    blocked_until: Option<Instant>,
}

impl Entry {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(oldest) = self.attempts.front() {
            if now.saturating_duration_since(*oldest) < window {
                break;
            }
            self.attempts.pop_front();
        }
    }

    fn active_block(&self, now: Instant) -> Option<Duration> {
        self.blocked_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    fn is_idle(&self, now: Instant) -> bool {
        self.attempts.is_empty() && self.active_block(now).is_none()
    }
}

#[derive(Debug)]
struct State {
    policies: HashMap<LimitClass, RateLimitPolicy>,
    entries: HashMap<(LimitClass, String), Entry>,
}

/// Process-wide sliding-window throttle
///
/// State is ephemeral; a restart forgets every attempt and block.
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<State>,
    block_duration: Duration,
}

impl RateLimiter {
    /// Create a limiter from configuration
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        let policies = LimitClass::ALL
            .iter()
            .map(|class| (*class, config.policy(*class)))
            .collect();
        Self {
            state: Mutex::new(State {
                policies,
                entries: HashMap::new(),
            }),
            block_duration: config.block_duration(),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check an attempt and record it if allowed.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::Blocked`] when the identity is blocked, or when
    /// this attempt exceeds the policy (which starts a new block).
    pub fn check(
        &self,
        identity: &str,
        class: LimitClass,
    ) -> Result<RateLimitStatus, RateLimitError> {
        let now = Instant::now();
        let block_duration = self.block_duration;
        let mut state = self.state();
        let policy = policy_for(&state, class);
        let entry = state
            .entries
            .entry((class, identity.to_owned()))
            .or_default();

        if let Some(until) = entry.blocked_until {
            if until > now {
                let retry_after_secs = ceil_secs(until - now);
                tracing::info!(
                    identity = %identity,
                    class = class.as_str(),
                    retry_after_secs,
                    "Rate limited identity still blocked"
                );
                return Err(RateLimitError::Blocked { retry_after_secs });
            }
            entry.blocked_until = None;
            entry.attempts.clear();
        }

        entry.prune(now, policy.window());

        if entry.attempts.len() >= policy.max_attempts as usize {
            entry.blocked_until = Some(now + block_duration);
            tracing::warn!(
                identity = %identity,
                class = class.as_str(),
                max_attempts = policy.max_attempts,
                block_secs = block_duration.as_secs(),
                "Rate limit exceeded, identity blocked"
            );
            crate::metrics::record_rate_limited(class);
            return Err(RateLimitError::Blocked {
                retry_after_secs: ceil_secs(block_duration),
            });
        }

        entry.attempts.push_back(now);
        let remaining = policy.max_attempts.saturating_sub(count(&entry.attempts));
        let reset_in_secs = entry.attempts.front().map_or(0, |oldest| {
            ceil_secs(policy.window().saturating_sub(now - *oldest))
        });

        tracing::debug!(
            identity = %identity,
            class = class.as_str(),
            remaining,
            reset_in_secs,
            "Rate limit check passed"
        );

        Ok(RateLimitStatus {
            remaining,
            reset_in_secs,
        })
    }

    /// Attempts left without recording one
    #[must_use]
    pub fn remaining(&self, identity: &str, class: LimitClass) -> u32 {
        self.info(identity, class).remaining
    }

    /// Current throttle state for an identity
    #[must_use]
    pub fn info(&self, identity: &str, class: LimitClass) -> RateLimitInfo {
        let now = Instant::now();
        let state = self.state();
        let policy = policy_for(&state, class);
        let Some(entry) = state.entries.get(&(class, identity.to_owned())) else {
            return RateLimitInfo {
                attempts: 0,
                remaining: policy.max_attempts,
                blocked_for: None,
            };
        };

        let window = policy.window();
        let attempts = count(
            entry
                .attempts
                .iter()
                .filter(|at| now.saturating_duration_since(**at) < window),
        );
        let blocked_for = entry.active_block(now);
        RateLimitInfo {
            attempts,
            remaining: if blocked_for.is_some() {
                0
            } else {
                policy.max_attempts.saturating_sub(attempts)
            },
            blocked_for,
        }
    }

    /// Whether the identity is blocked for a class
    #[must_use]
    pub fn is_blocked(&self, identity: &str, class: LimitClass) -> bool {
        self.info(identity, class).blocked_for.is_some()
    }

    /// Block an identity for every class
    pub fn block(&self, identity: &str, duration: Duration) {
        let until = Instant::now() + duration.min(MAX_MANUAL_BLOCK);
        let mut state = self.state();
        for class in LimitClass::ALL {
            state
                .entries
                .entry((class, identity.to_owned()))
                .or_default()
                .blocked_until = Some(until);
        }
        tracing::warn!(
            identity = %identity,
            block_secs = duration.as_secs(),
            "Identity blocked manually"
        );
    }

    /// Lift a block and clear the recorded attempts for every class
    pub fn unblock(&self, identity: &str) {
        let mut state = self.state();
        for class in LimitClass::ALL {
            if let Some(entry) = state.entries.get_mut(&(class, identity.to_owned())) {
                entry.blocked_until = None;
                entry.attempts.clear();
            }
        }
        tracing::info!(identity = %identity, "Identity unblocked");
    }

    /// Forget everything about an identity
    pub fn reset(&self, identity: &str) {
        self.state()
            .entries
            .retain(|(_, tracked), _| tracked != identity);
    }

    /// Replace the policy for a class; existing attempts are re-evaluated lazily
    pub fn set_policy(&self, class: LimitClass, policy: RateLimitPolicy) {
        self.state().policies.insert(class, policy);
        tracing::info!(
            class = class.as_str(),
            max_attempts = policy.max_attempts,
            window_secs = policy.window_secs,
            "Rate limit policy updated"
        );
    }

    /// Drop identities with no attempts in the window and no active block.
    ///
    /// Returns the number of entries removed.
    pub fn collect_garbage(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state();
        let policies = state.policies.clone();
        let before = state.entries.len();
        state.entries.retain(|(class, _), entry| {
            let window = policies
                .get(class)
                .copied()
                .unwrap_or_else(|| class.default_policy())
                .window();
            entry.prune(now, window);
            !entry.is_idle(now)
        });
        let removed = before - state.entries.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = state.entries.len(), "Rate limiter GC");
        }
        removed
    }

    /// Run [`collect_garbage`](Self::collect_garbage) every `interval` until the
    /// limiter is dropped.
    #[must_use]
    pub fn spawn_gc(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let limiter: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(limiter) = limiter.upgrade() else {
                    break;
                };
                limiter.collect_garbage();
            }
        })
    }
}

fn policy_for(state: &State, class: LimitClass) -> RateLimitPolicy {
    state
        .policies
        .get(&class)
        .copied()
        .unwrap_or_else(|| class.default_policy())
}

fn count<I: IntoIterator>(items: I) -> u32 {
    u32::try_from(items.into_iter().count()).unwrap_or(u32::MAX)
}

fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}
