//! 衝突解決で使う時刻源
//!
//! リゾルバは候補のサフィックスを時計から読み、試行の合間にスリープします。
//! どちらも [`Clock`] を経由するので、テストでは実際に待たずにバックオフの
//! スケジュールを確認できます。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

/// tokio のタイマーによる実時間の時計
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug)]
struct ManualState {
    now: DateTime<Utc>,
    sleeps: Vec<Duration>,
}

/// 明示的に進めたときだけ動く時計
///
/// `sleep` は要求された時間を記録し、その分だけ即座に時計を進める。
/// 停止させた時計はスリープを記録したまま戻らないので、
/// バックオフ中のキャンセルをテストできる。
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<ManualState>,
    stalled: bool,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: start,
                sleeps: Vec::new(),
            }),
            stalled: false,
        }
    }

    /// スリープが完了しない時計
    pub fn stalled(start: DateTime<Utc>) -> Self {
        Self {
            stalled: true,
            ..Self::new(start)
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn advance(&self, duration: Duration) {
        let mut state = self.lock();
        state.now += chrono::Duration::milliseconds(duration.as_millis() as i64);
    }

    /// これまでに要求されたスリープ（要求順）
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::default())
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.lock().now
    }

    async fn sleep(&self, duration: Duration) {
        self.lock().sleeps.push(duration);
        if self.stalled {
            std::future::pending::<()>().await;
        }
        self.advance(duration);
    }
}
