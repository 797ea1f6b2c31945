//! 有界重试
//!
//! 只负责"失败后按递增间隔再试"能力，不关心调用的是什么

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

/// 重试策略
///
/// 第 k 次失败后等待 `min(backoff_step * k, backoff_cap)`，
/// 总尝试次数为 `max_retries + 1`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_step: Duration,
    pub backoff_cap: Duration,
}

/// 成功结果及所用尝试次数
#[derive(Debug)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
}

/// 重试耗尽
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff_step: Duration::from_secs(2),
            backoff_cap: Duration::from_secs(5),
        }
    }

    pub fn with_backoff(mut self, step: Duration, cap: Duration) -> Self {
        self.backoff_step = step;
        self.backoff_cap = cap;
        self
    }

    /// 第 `attempt` 次失败后的等待时间
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_step.saturating_mul(attempt).min(self.backoff_cap)
    }

    /// 执行操作，失败时按策略重试
    ///
    /// # 参数
    /// - `label`: 日志中显示的操作名称
    /// - `op`: 每次尝试调用一次，参数为当前尝试序号（从 1 开始）
    ///
    /// # 返回
    /// 成功时返回值和尝试次数；全部失败时返回最后一次的错误
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<Retried<T>, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} 在第 {} 次尝试成功", label, attempt);
                    }
                    return Ok(Retried { value, attempts: attempt });
                }
                Err(e) => {
                    warn!("{} 失败 (尝试 {}/{}): {}", label, attempt, max_attempts, e);
                    if attempt >= max_attempts {
                        return Err(RetryExhausted {
                            attempts: attempt,
                            last_error: e,
                        });
                    }
                    sleep(self.backoff_for(attempt)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn instant(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries).with_backoff(Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn backoff_grows_then_caps() {
        let policy = RetryPolicy::new(5);
        assert_eq!(policy.backoff_for(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(5));
        assert_eq!(policy.backoff_for(10), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn always_failing_op_runs_retries_plus_one_times() {
        for retries in 0..5 {
            let calls = Cell::new(0u32);
            let result = instant(retries)
                .run("test", |_| {
                    calls.set(calls.get() + 1);
                    async { Err::<(), _>("boom") }
                })
                .await;

            let exhausted = result.unwrap_err();
            assert_eq!(calls.get(), retries + 1);
            assert_eq!(exhausted.attempts, retries + 1);
            assert_eq!(exhausted.last_error, "boom");
        }
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let calls = Cell::new(0u32);
        let result = instant(5)
            .run("test", |attempt| {
                calls.set(calls.get() + 1);
                async move {
                    if attempt < 3 {
                        Err("not yet")
                    } else {
                        Ok(attempt * 10)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result.value, 30);
        assert_eq!(result.attempts, 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_between_attempts() {
        let started = tokio::time::Instant::now();
        let _ = RetryPolicy::new(2)
            .run("test", |_| async { Err::<(), _>("boom") })
            .await;
        // 2s + 4s
        assert!(started.elapsed() >= Duration::from_secs(6));
    }
}
