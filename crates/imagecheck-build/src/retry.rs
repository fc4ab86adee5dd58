//! ビルドのリトライポリシー

use std::time::Duration;

/// 失敗した試行の後に待つ時間の決め方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// 待たない
    None,
    /// 常に同じ時間
    Fixed(Duration),
    /// 試行インデックス（0始まり）× step
    Linear(Duration),
}

impl Backoff {
    pub fn delay(&self, attempt_index: u32) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => *delay,
            Backoff::Linear(step) => *step * attempt_index,
        }
    }
}

/// 1バージョンあたりの試行回数と待ち時間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    /// 5回まで、0, 5, 10, 15, 20 秒の線形バックオフ
    fn default() -> Self {
        Self::new(5, Backoff::Linear(Duration::from_secs(5)))
    }
}
