//! 重试策略
//!
//! 指数退避：第 `attempt` 次（从 0 开始）失败后等待 `min(2^attempt * base, cap)`，
//! 频率限制 / 超时与其他暂时性错误使用不同的上限。

use std::time::Duration;

use crate::config::Config;
use crate::error::GenerationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// 频率限制 / 超时的等待上限
    pub rate_limit_cap: Duration,
    /// 其他暂时性错误的等待上限
    pub transient_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            rate_limit_cap: Duration::from_millis(30_000),
            transient_cap: Duration::from_millis(10_000),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_attempts,
            ..Self::default()
        }
    }

    /// 第 `attempt` 次尝试失败后的等待时间
    ///
    /// 返回 `None` 表示不再重试（已是最后一次，或错误不可重试）
    pub fn backoff_delay(&self, attempt: u32, err: &GenerationError) -> Option<Duration> {
        if attempt + 1 >= self.max_attempts || !err.is_retryable() {
            return None;
        }
        let cap = match err {
            GenerationError::RateLimited { .. } | GenerationError::Timeout { .. } => {
                self.rate_limit_cap
            }
            _ => self.transient_cap,
        };
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        Some(self.base_delay.saturating_mul(factor).min(cap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_backoff_doubles() {
        let policy = RetryPolicy::default();
        let err = GenerationError::rate_limited("429");
        let delays: Vec<_> = (0..5).map(|a| policy.backoff_delay(a, &err)).collect();
        assert_eq!(
            delays,
            vec![
                Some(Duration::from_secs(1)),
                Some(Duration::from_secs(2)),
                Some(Duration::from_secs(4)),
                Some(Duration::from_secs(8)),
                None,
            ]
        );
    }

    #[test]
    fn test_caps_differ_by_error_kind() {
        let policy = RetryPolicy {
            max_attempts: 10,
            ..RetryPolicy::default()
        };
        assert_eq!(
            policy.backoff_delay(6, &GenerationError::timeout("slow")),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            policy.backoff_delay(6, &GenerationError::transient("502")),
            Some(Duration::from_secs(10))
        );
    }

    #[test]
    fn test_fatal_is_never_retried() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(0, &GenerationError::fatal("401")), None);
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let policy = RetryPolicy {
            max_attempts: u32::MAX,
            ..RetryPolicy::default()
        };
        assert_eq!(
            policy.backoff_delay(40, &GenerationError::rate_limited("429")),
            Some(Duration::from_secs(30))
        );
    }
}
