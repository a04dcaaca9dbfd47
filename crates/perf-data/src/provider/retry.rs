//! 데이터 소스 호출 재시도 정책.
//!
//! 지수 백오프: `initial_backoff * multiplier^(n-1)`, 최대 `max_backoff`.
//! 재시도 가능한 오류(`DataError::is_retryable`)만 재시도합니다.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::Result;

/// 재시도 정책.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// 최대 시도 횟수 (첫 시도 포함, 최소 1)
    pub max_attempts: u32,
    /// 첫 재시도 전 대기 시간
    pub initial_backoff: Duration,
    /// 대기 시간 상한
    pub max_backoff: Duration,
    /// 재시도마다 곱해지는 배수
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff: Duration::from_secs(4),
            max_backoff: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// 재시도 없이 한 번만 시도.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// 대기 없이 `max_attempts`번 시도.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::none()
        }
    }

    /// `retry`번째 재시도(1부터) 전 대기 시간.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = self.multiplier.max(1.0).powi(retry as i32 - 1);
        let secs = self.initial_backoff.as_secs_f64() * factor;
        let capped = secs.min(self.max_backoff.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    /// 정책에 따라 비동기 작업을 실행합니다.
    ///
    /// 재시도 불가능한 오류는 즉시 반환하고, 시도 횟수를 모두 쓰면
    /// 마지막 오류를 반환합니다.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    // rate limit이면 서버가 요청한 대기 시간 이상
                    let backoff = self.backoff_for(attempt);
                    let delay = e.retry_after().map_or(backoff, |after| backoff.max(after));
                    debug!(
                        operation = operation,
                        attempt = attempt,
                        max_attempts = max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "재시도 예정"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        warn!(
                            operation = operation,
                            attempts = attempt,
                            error = %e,
                            "재시도 횟수 초과"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}
