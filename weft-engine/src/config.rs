//! Runtime configuration for networks.

use std::time::Duration;

/// What the scheduler does when the deadlock detector fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeadlockPolicy {
    /// Cancel the network and report the suspended set.
    #[default]
    Abort,
    /// Force-close every connection so suspended receivers drain to
    /// end-of-stream; the run report still names the suspended set.
    Drain,
}

/// Configuration for a network run.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Queue capacity for connections that do not specify one.
    pub default_capacity: usize,
    /// Interval between deadlock scans. `None` disables the detector
    /// (composites run without one; the root network scans the whole tree
    /// through its boundaries).
    pub deadlock_scan_interval: Option<Duration>,
    /// Action taken when a deadlock is confirmed.
    pub deadlock_policy: DeadlockPolicy,
    /// How long components get to observe cancellation before their tasks
    /// are force-aborted.
    pub grace_period: Duration,
    /// Enable the runtime bracket-nesting checker on output ports.
    pub validate_brackets: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            default_capacity: 10,
            deadlock_scan_interval: Some(Duration::from_millis(100)),
            deadlock_policy: DeadlockPolicy::default(),
            grace_period: Duration::from_secs(1),
            validate_brackets: false,
        }
    }
}

impl NetworkConfig {
    /// Create configuration from environment variables.
    ///
    /// Reads the following variables, falling back to defaults:
    /// - `WEFT_DEFAULT_CAPACITY`: default connection capacity
    /// - `WEFT_DEADLOCK_SCAN_MS`: deadlock scan interval (0 disables)
    /// - `WEFT_DEADLOCK_POLICY`: "abort" or "drain"
    /// - `WEFT_GRACE_PERIOD_MS`: cancellation grace period
    /// - `WEFT_VALIDATE_BRACKETS`: enable the bracket checker
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(capacity) = read_env::<usize>("WEFT_DEFAULT_CAPACITY") {
            config.default_capacity = capacity.max(1);
        }
        if let Some(ms) = read_env::<u64>("WEFT_DEADLOCK_SCAN_MS") {
            config.deadlock_scan_interval = if ms == 0 {
                None
            } else {
                Some(Duration::from_millis(ms))
            };
        }
        if let Ok(policy) = std::env::var("WEFT_DEADLOCK_POLICY") {
            match policy.to_lowercase().as_str() {
                "drain" => config.deadlock_policy = DeadlockPolicy::Drain,
                "abort" => config.deadlock_policy = DeadlockPolicy::Abort,
                _ => {}
            }
        }
        if let Some(ms) = read_env::<u64>("WEFT_GRACE_PERIOD_MS") {
            config.grace_period = Duration::from_millis(ms);
        }
        if let Ok(flag) = std::env::var("WEFT_VALIDATE_BRACKETS") {
            config.validate_brackets = matches!(flag.as_str(), "1" | "true" | "yes");
        }

        config
    }

    /// Set the default connection capacity (minimum 1).
    pub fn with_default_capacity(mut self, capacity: usize) -> Self {
        self.default_capacity = capacity.max(1);
        self
    }

    /// Set the deadlock scan interval; `None` disables the detector.
    pub fn with_deadlock_scan_interval(mut self, interval: Option<Duration>) -> Self {
        self.deadlock_scan_interval = interval;
        self
    }

    /// Set the deadlock policy.
    pub fn with_deadlock_policy(mut self, policy: DeadlockPolicy) -> Self {
        self.deadlock_policy = policy;
        self
    }

    /// Set the cancellation grace period.
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    /// Enable the runtime bracket-nesting checker.
    pub fn with_bracket_validation(mut self) -> Self {
        self.validate_brackets = true;
        self
    }
}

fn read_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}
