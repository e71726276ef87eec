//! Retry policy for provider failures.
//!
//! ## Example
//!
//! ```rust,ignore
//! use launchpad_campaign::{BackoffStrategy, RetryClassifier, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(3)
//!     .backoff(BackoffStrategy::exponential(Duration::from_secs(2)))
//!     .classifier(RetryClassifier::with_patterns(["rate limit", "overloaded"]));
//!
//! if policy.should_retry(&error, attempt, 3) {
//!     tokio::time::sleep(policy.wait_for(&error, attempt)).await;
//! }
//! ```

use launchpad_config::LaunchpadConfig;
use launchpad_mail::ProviderError;
use std::time::Duration;

/// Error text fragments that mark a failure as transient.
pub const DEFAULT_RETRY_PATTERNS: [&str; 11] = [
    "rate limit",
    "rate_limit",
    "too many requests",
    "timeout",
    "timed out",
    "temporarily unavailable",
    "service unavailable",
    "bad gateway",
    "gateway timeout",
    "5xx",
    "internal server error",
];

/// Backoff strategy for retries.
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// No delay between retries.
    None,
    /// Constant delay between retries.
    Constant(Duration),
    /// Exponential backoff: delay doubles each retry.
    Exponential {
        /// Initial delay.
        initial: Duration,
        /// Multiplier (typically 2.0).
        multiplier: f64,
        /// Maximum delay.
        max: Duration,
    },
    /// Exponential backoff with up to 50% jitter added before the cap.
    ExponentialWithJitter {
        /// Initial delay.
        initial: Duration,
        /// Multiplier (typically 2.0).
        multiplier: f64,
        /// Maximum delay.
        max: Duration,
    },
}

impl BackoffStrategy {
    /// Create constant backoff.
    pub fn constant(delay: Duration) -> Self {
        Self::Constant(delay)
    }

    /// Create exponential backoff.
    pub fn exponential(initial: Duration) -> Self {
        Self::Exponential {
            initial,
            multiplier: 2.0,
            max: Duration::from_secs(60),
        }
    }

    /// Create exponential backoff with jitter.
    pub fn exponential_with_jitter(initial: Duration) -> Self {
        Self::ExponentialWithJitter {
            initial,
            multiplier: 2.0,
            max: Duration::from_secs(60),
        }
    }

    /// Set maximum delay.
    pub fn with_max(self, max: Duration) -> Self {
        match self {
            Self::Exponential {
                initial,
                multiplier,
                ..
            } => Self::Exponential {
                initial,
                multiplier,
                max,
            },
            Self::ExponentialWithJitter {
                initial,
                multiplier,
                ..
            } => Self::ExponentialWithJitter {
                initial,
                multiplier,
                max,
            },
            other => other,
        }
    }

    /// Calculate delay for a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Constant(d) => *d,
            Self::Exponential {
                initial,
                multiplier,
                max,
            } => scaled(*initial, *multiplier, attempt, 0.0, *max),
            Self::ExponentialWithJitter {
                initial,
                multiplier,
                max,
            } => scaled(*initial, *multiplier, attempt, rand::random::<f64>() * 0.5, *max),
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::exponential(Duration::from_secs(2))
    }
}

// `initial * multiplier^attempt * (1 + jitter)`, capped at `max`.
fn scaled(initial: Duration, multiplier: f64, attempt: u32, jitter: f64, max: Duration) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let millis = initial.as_millis() as f64 * multiplier.powi(exponent) * (1.0 + jitter);
    let cap = max.as_millis() as f64;

    if !millis.is_finite() || millis >= cap {
        max
    } else {
        Duration::from_millis(millis as u64)
    }
}

/// Decides whether a provider failure is worth retrying.
///
/// A failure is transient when the provider answered 429 or 5xx, or when its
/// lowercased text contains one of the configured patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryClassifier {
    patterns: Vec<String>,
}

impl RetryClassifier {
    /// Classifier matching the given patterns instead of the defaults.
    pub fn with_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.into().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Patterns in match order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether a retry could succeed.
    pub fn is_transient(&self, error: &ProviderError) -> bool {
        if let Some(status) = error.status
            && (status == 429 || (500..600).contains(&status))
        {
            return true;
        }

        let text = error.to_string().to_lowercase();
        self.patterns.iter().any(|p| text.contains(p.as_str()))
    }
}

impl Default for RetryClassifier {
    fn default() -> Self {
        Self::with_patterns(DEFAULT_RETRY_PATTERNS)
    }
}

/// Retry configuration for one campaign.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per recipient, including the first one.
    pub max_attempts: u32,
    /// Delay before each retry.
    pub backoff: BackoffStrategy,
    /// Transient failure detection.
    pub classifier: RetryClassifier,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::default(),
            classifier: RetryClassifier::default(),
        }
    }
}

impl RetryPolicy {
    /// Create new retry policy.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Build the policy described by the service configuration.
    pub fn from_config(config: &LaunchpadConfig) -> Self {
        let backoff = if config.backoff_jitter {
            BackoffStrategy::exponential_with_jitter(config.backoff_base())
        } else {
            BackoffStrategy::exponential(config.backoff_base())
        }
        .with_max(config.backoff_max());

        let classifier = match &config.retry_patterns {
            Some(patterns) => RetryClassifier::with_patterns(patterns.iter().cloned()),
            None => RetryClassifier::default(),
        };

        Self {
            max_attempts: config.max_attempts,
            backoff,
            classifier,
        }
    }

    /// Set the backoff strategy.
    pub fn backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the classifier.
    pub fn classifier(mut self, classifier: RetryClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Whether `error`, returned by 0-indexed `attempt`, should be retried.
    ///
    /// The last of `max_attempts` attempts never retries.
    pub fn should_retry(&self, error: &ProviderError, attempt: u32, max_attempts: u32) -> bool {
        if attempt.saturating_add(1) >= max_attempts {
            return false;
        }
        self.classifier.is_transient(error)
    }

    /// Backoff before the retry that follows `attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff.delay_for_attempt(attempt)
    }

    /// Backoff raised to the provider's `retry_after` hint when it is longer.
    pub fn wait_for(&self, error: &ProviderError, attempt: u32) -> Duration {
        let delay = self.backoff_delay(attempt);
        match error.retry_after {
            Some(hint) => delay.max(hint),
            None => delay,
        }
    }
}

/// Attempt counter of one recipient's delivery loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// Current 0-indexed attempt.
    pub attempt: u32,
    /// Attempts allowed.
    pub max_attempts: u32,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Number of attempts made once the current one finishes.
    pub fn attempts_made(&self) -> u32 {
        self.attempt + 1
    }

    /// Move on to the next attempt.
    pub fn advance(&mut self) {
        self.attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.backoff_delay(0), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(8));
        assert_eq!(policy.backoff_delay(5), Duration::from_secs(60));
        assert_eq!(policy.backoff_delay(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_is_non_decreasing() {
        let strategies = [
            BackoffStrategy::exponential(Duration::from_millis(250)),
            BackoffStrategy::exponential_with_jitter(Duration::from_millis(250))
                .with_max(Duration::from_secs(10)),
            BackoffStrategy::constant(Duration::from_secs(1)),
            BackoffStrategy::None,
        ];

        for strategy in strategies {
            let delays: Vec<Duration> = (0..12).map(|a| strategy.delay_for_attempt(a)).collect();
            assert!(
                delays.windows(2).all(|w| w[0] <= w[1]),
                "{strategy:?} produced {delays:?}"
            );
        }
    }

    #[test]
    fn test_jitter_stays_within_half() {
        let strategy = BackoffStrategy::exponential_with_jitter(Duration::from_secs(1));
        for _ in 0..50 {
            let delay = strategy.delay_for_attempt(1);
            assert!(delay >= Duration::from_secs(2));
            assert!(delay <= Duration::from_secs(3));
        }
    }

    #[test]
    fn test_classifier_patterns() {
        let classifier = RetryClassifier::default();

        assert!(classifier.is_transient(&ProviderError::rejected("Rate limit exceeded")));
        assert!(classifier.is_transient(&ProviderError::timeout("request timed out")));
        assert!(classifier.is_transient(&ProviderError::network("Service Unavailable")));
        assert!(!classifier.is_transient(&ProviderError::http(422, "invalid recipient")));
        assert!(!classifier.is_transient(&ProviderError::http(401, "API key is invalid")));
        assert!(!classifier.is_transient(&ProviderError::malformed("success response without an id")));
    }

    #[test]
    fn test_classifier_statuses() {
        let classifier = RetryClassifier::with_patterns(Vec::<String>::new());

        assert!(classifier.is_transient(&ProviderError::http(429, "slow down")));
        assert!(classifier.is_transient(&ProviderError::http(500, "oops")));
        assert!(classifier.is_transient(&ProviderError::http(599, "oops")));
        assert!(!classifier.is_transient(&ProviderError::http(400, "bad request")));
    }

    #[test]
    fn test_custom_patterns_are_normalized() {
        let classifier = RetryClassifier::with_patterns(["  Overloaded ", ""]);
        assert_eq!(classifier.patterns(), ["overloaded"]);
        assert!(classifier.is_transient(&ProviderError::network("provider OVERLOADED")));
        assert!(!classifier.is_transient(&ProviderError::timeout("x")));
    }

    #[test]
    fn test_last_attempt_never_retries() {
        let policy = RetryPolicy::default();
        let err = ProviderError::http(429, "rate limit");

        assert!(policy.should_retry(&err, 0, 3));
        assert!(policy.should_retry(&err, 1, 3));
        assert!(!policy.should_retry(&err, 2, 3));
        assert!(!policy.should_retry(&err, 0, 1));
        assert!(!policy.should_retry(&err, 0, 0));
    }

    #[test]
    fn test_retry_after_raises_wait() {
        let policy = RetryPolicy::default();
        let hinted = ProviderError::http(429, "rate limit").with_retry_after(Duration::from_secs(30));
        let short = ProviderError::http(429, "rate limit").with_retry_after(Duration::from_millis(10));

        assert_eq!(policy.wait_for(&hinted, 0), Duration::from_secs(30));
        assert_eq!(policy.wait_for(&short, 1), Duration::from_secs(4));
    }

    #[test]
    fn test_from_config() {
        let config = LaunchpadConfig {
            max_attempts: 5,
            backoff_base_ms: 100,
            backoff_max_ms: 1_000,
            retry_patterns: Some(vec!["Overloaded".into()]),
            ..LaunchpadConfig::default()
        };

        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(10), Duration::from_secs(1));
        assert_eq!(policy.classifier.patterns(), ["overloaded"]);
    }

    #[test]
    fn test_retry_state() {
        let mut state = RetryState::new(0);
        assert_eq!(state.max_attempts, 1);
        assert_eq!(state.attempts_made(), 1);
        state.advance();
        assert_eq!(state.attempts_made(), 2);
    }
}
