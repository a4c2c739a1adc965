//! RetryPolicy - configurable exponential backoff
//!
//! `RetryPolicy` is the record a task hands to the runner (and the shape it
//! takes in configuration files). `Backoff` is the same policy after
//! normalization: defaults filled in, the cap clamped, attempts made unsigned.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Base interval used when a policy leaves it unset
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
/// Backoff cap used when a policy leaves it unset
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(30);
/// Absolute upper bound on any single backoff wait
pub const MAX_INTERVAL_CEILING: Duration = Duration::from_secs(150);
/// Growth factor used when a policy leaves it unset
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Retry policy as declared by a task
///
/// Zero durations and non-positive multipliers mean "unset". `max_attempts`
/// of zero or below disables retrying: the task runs exactly once.
///
/// Durations serialize as strings (`"1500ms"`) and deserialize from either a
/// string (`"500ms"`, `"2s"`, `"1m"`, `"1h"`) or a millisecond count. A bare
/// number means milliseconds whether or not it is quoted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    #[serde(with = "duration_serde")]
    pub interval: Duration,
    #[serde(with = "duration_serde")]
    pub max_interval: Duration,
    pub max_attempts: i32,
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Policy allowing `max_attempts` attempts with default timing
    pub fn new(max_attempts: i32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Normalized schedule for this policy
    pub fn backoff(&self) -> Backoff {
        Backoff::from_policy(Some(self))
    }
}

/// Normalized retry schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    interval: Duration,
    max_interval: Duration,
    multiplier: f64,
    max_attempts: u32,
}

impl Backoff {
    /// Normalize an optional policy. `None` means run once, no retry.
    pub fn from_policy(policy: Option<&RetryPolicy>) -> Self {
        let Some(policy) = policy else {
            return Self::once();
        };

        let interval = if policy.interval.is_zero() {
            DEFAULT_INTERVAL
        } else {
            policy.interval
        };
        let max_interval = if policy.max_interval.is_zero() {
            DEFAULT_MAX_INTERVAL
        } else {
            policy.max_interval
        };
        // `> 0.0` is false for NaN as well
        let multiplier = if policy.multiplier > 0.0 && policy.multiplier.is_finite() {
            policy.multiplier
        } else {
            DEFAULT_MULTIPLIER
        };

        Self {
            interval,
            max_interval: max_interval.min(MAX_INTERVAL_CEILING),
            multiplier,
            max_attempts: u32::try_from(policy.max_attempts).unwrap_or(0),
        }
    }

    /// Single attempt, no retry machinery
    pub fn once() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            multiplier: DEFAULT_MULTIPLIER,
            max_attempts: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Configured attempts; 0 when retrying is disabled
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn retries_enabled(&self) -> bool {
        self.max_attempts > 0
    }

    /// Wait after a failed `attempt` (1-based):
    /// `interval * multiplier^(attempt - 1)`, capped at `max_interval`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.interval.as_secs_f64() * self.multiplier.powi(exponent);

        if !secs.is_finite() || secs >= self.max_interval.as_secs_f64() {
            return self.max_interval;
        }
        Duration::from_secs_f64(secs)
    }
}

/// Parse `"500ms"`, `"2s"`, `"1m"`, `"1h"` or a bare number of milliseconds.
/// Returns `None` on malformed or overflowing input.
fn parse_duration(duration_str: &str) -> Option<Duration> {
    let s = duration_str.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(ms) = s.strip_suffix("ms") {
        return ms.trim().parse::<u64>().ok().map(Duration::from_millis);
    }
    if let Some(secs) = s.strip_suffix('s') {
        return secs.trim().parse::<u64>().ok().map(Duration::from_secs);
    }
    if let Some(mins) = s.strip_suffix('m') {
        return mins
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs);
    }
    if let Some(hours) = s.strip_suffix('h') {
        return hours
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(|h| h.checked_mul(3600))
            .map(Duration::from_secs);
    }

    s.parse::<u64>().ok().map(Duration::from_millis)
}

mod duration_serde {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDuration {
        Millis(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{}ms", value.as_millis()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match RawDuration::deserialize(deserializer)? {
            RawDuration::Millis(ms) => Ok(Duration::from_millis(ms)),
            RawDuration::Text(text) => super::parse_duration(&text)
                .ok_or_else(|| D::Error::custom(format!("invalid duration '{}'", text))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_policy_runs_once() {
        let backoff = Backoff::from_policy(None);
        assert!(!backoff.retries_enabled());
        assert_eq!(backoff.max_attempts(), 0);
    }

    #[test]
    fn non_positive_attempts_disable_retry() {
        assert!(!RetryPolicy::new(0).backoff().retries_enabled());
        assert!(!RetryPolicy::new(-1).backoff().retries_enabled());
        assert!(RetryPolicy::new(1).backoff().retries_enabled());
    }

    #[test]
    fn unset_fields_fall_back_to_defaults() {
        let backoff = RetryPolicy::new(3)
            .with_multiplier(-4.0)
            .backoff();
        assert_eq!(backoff.interval(), DEFAULT_INTERVAL);
        assert_eq!(backoff.max_interval(), DEFAULT_MAX_INTERVAL);
        assert!((backoff.multiplier() - DEFAULT_MULTIPLIER).abs() < f64::EPSILON);

        let nan = RetryPolicy::new(3).with_multiplier(f64::NAN).backoff();
        assert!((nan.multiplier() - DEFAULT_MULTIPLIER).abs() < f64::EPSILON);
    }

    #[test]
    fn max_interval_clamped_to_ceiling() {
        let backoff = RetryPolicy::new(3)
            .with_max_interval(Duration::from_secs(600))
            .backoff();
        assert_eq!(backoff.max_interval(), MAX_INTERVAL_CEILING);
    }

    #[test]
    fn delay_grows_exponentially_from_first_attempt() {
        let backoff = RetryPolicy::new(3)
            .with_interval(Duration::from_secs(1))
            .with_multiplier(2.0)
            .with_max_interval(Duration::from_secs(30))
            .backoff();

        assert_eq!(backoff.delay_for(1), Duration::from_secs(1));
        assert_eq!(backoff.delay_for(2), Duration::from_secs(2));
        assert_eq!(backoff.delay_for(3), Duration::from_secs(4));
        assert_eq!(backoff.delay_for(5), Duration::from_secs(16));
        assert_eq!(backoff.delay_for(6), Duration::from_secs(30));
    }

    #[test]
    fn delay_never_exceeds_cap() {
        let backoff = RetryPolicy::new(10)
            .with_interval(Duration::from_secs(1))
            .with_multiplier(10.0)
            .with_max_interval(Duration::from_secs(5))
            .backoff();

        for attempt in 1..=64 {
            assert!(backoff.delay_for(attempt) <= Duration::from_secs(5));
        }
        assert_eq!(backoff.delay_for(1), Duration::from_secs(1));
        assert_eq!(backoff.delay_for(2), Duration::from_secs(5));
        // Huge exponents overflow to infinity and still clamp
        assert_eq!(backoff.delay_for(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn fractional_multiplier() {
        let backoff = RetryPolicy::new(3)
            .with_interval(Duration::from_millis(400))
            .with_multiplier(1.5)
            .backoff();
        assert_eq!(backoff.delay_for(2).as_millis(), 600);
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("2s"), Some(Duration::from_secs(2)));
        assert_eq!(parse_duration("3m"), Some(Duration::from_secs(180)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("7"), Some(Duration::from_millis(7)));
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("fast"), None);
    }

    #[test]
    fn deserializes_from_yaml_record() {
        let yaml = r#"
interval: 500ms
maxInterval: 10s
maxAttempts: 4
multiplier: 1.5
"#;
        let policy: RetryPolicy = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            policy,
            RetryPolicy::new(4)
                .with_interval(Duration::from_millis(500))
                .with_max_interval(Duration::from_secs(10))
                .with_multiplier(1.5)
        );
    }

    #[test]
    fn deserializes_millis_and_missing_fields() {
        let policy: RetryPolicy =
            serde_json::from_str(r#"{"interval": 1500, "maxAttempts": 2}"#).unwrap();
        assert_eq!(policy.interval, Duration::from_millis(1500));
        assert_eq!(policy.max_interval, Duration::ZERO);
        assert_eq!(policy.backoff().max_interval(), DEFAULT_MAX_INTERVAL);
    }

    #[test]
    fn rejects_malformed_duration() {
        let err = serde_json::from_str::<RetryPolicy>(r#"{"interval": "soon"}"#).unwrap_err();
        assert!(err.to_string().contains("invalid duration 'soon'"));
    }

    #[test]
    fn rejects_overflowing_duration() {
        assert_eq!(parse_duration("307445734561825861m"), None);
        assert_eq!(parse_duration("5124095576030432h"), None);

        let err = serde_json::from_str::<RetryPolicy>(r#"{"interval": "307445734561825861m"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("invalid duration"));
    }

    #[test]
    fn unitless_duration_is_millis_quoted_or_not() {
        let bare: RetryPolicy = serde_json::from_str(r#"{"interval": 100}"#).unwrap();
        let quoted: RetryPolicy = serde_json::from_str(r#"{"interval": "100"}"#).unwrap();
        assert_eq!(bare.interval, Duration::from_millis(100));
        assert_eq!(quoted.interval, bare.interval);
    }

    #[test]
    fn serializes_durations_as_millis_strings() {
        let policy = RetryPolicy::new(2).with_interval(Duration::from_secs(2));
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["interval"], "2000ms");
        assert_eq!(json["maxAttempts"], 2);
    }
}
