//! Retry and polling policies.
//!
//! Both policies are plain data: the client loops read attempt counts and
//! delays from them instead of encoding the schedule in control flow.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry budget for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt, shared by re-logins and network faults
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first network retry
    #[serde(default = "default_base_delay", with = "millis")]
    #[serde(rename = "base_delay_ms")]
    pub base_delay: Duration,

    /// Upper bound for any single network retry delay
    #[serde(default = "default_max_delay", with = "millis")]
    #[serde(rename = "max_delay_ms")]
    pub max_delay: Duration,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay() -> Duration {
    Duration::from_millis(250)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(2)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before network retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Completion polling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Total time allowed for a simulation to complete
    #[serde(default = "default_max_wait", with = "secs")]
    #[serde(rename = "max_wait_secs")]
    pub max_wait: Duration,

    /// Steady-state delay between status queries
    #[serde(default = "default_poll_interval", with = "millis")]
    #[serde(rename = "poll_interval_ms")]
    pub poll_interval: Duration,

    /// Consecutive failed queries that end the wait
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
}

fn default_max_wait() -> Duration {
    Duration::from_secs(300)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_max_consecutive_failures() -> u32 {
    3
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_wait: default_max_wait(),
            poll_interval: default_poll_interval(),
            max_consecutive_failures: default_max_consecutive_failures(),
        }
    }
}

impl PollPolicy {
    /// Same policy with a different wait bound.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Backoff after the `failures`-th consecutive failed query.
    pub fn backoff_for(&self, failures: u32) -> Duration {
        self.poll_interval
            .saturating_mul(2u32.saturating_pow(failures))
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
