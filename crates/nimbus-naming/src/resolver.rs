//! 命名機関に対する衝突解決
//!
//! リゾルバは試行インデックスを `0` から `max_retries` まで進めます:
//!
//! ```text
//!  attempt 0: prefix-account-team-moniker
//!  attempt n: prefix-account-team-moniker-NNNN   (NNNN from the clock)
//!
//!  candidate ──invalid──▶ draw a new suffix (attempt index unchanged)
//!      │
//!   exists? ──no──▶ create ──ok──▶ done
//!      │                 └──already exists──▶ collision
//!     yes ─▶ collision ─▶ sleep(backoff(n)) ─▶ attempt n+1
//! ```
//!
//! 存在確認、作成、スリープはいずれも呼び出し元のキャンセルトークンおよび
//! 期限と競合させます。

use crate::builder::assemble_base;
use crate::clock::Clock;
use crate::config::BackoffConfig;
use crate::error::{CancelReason, NamingError, Result};
use crate::model::SanitizedComponents;
use crate::validate::validate_name;
use nimbus_cloud::{CloudError, Creator, ExistenceOracle};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// 時刻から作るリトライサフィックスの桁数
pub const RETRY_SUFFIX_DIGITS: usize = 4;

const SUFFIX_MODULUS: i64 = 10_000;

/// 1回の生成呼び出しに対するキャンセルトークンと任意の期限
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl ResolveContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// `token` がキャンセルされたら止まるコンテキスト
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancel: token,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// トークン発火か期限切れが先に来なければ `fut` を実行
    pub async fn guard<F: Future>(&self, fut: F) -> std::result::Result<F::Output, CancelReason> {
        if self.cancel.is_cancelled() {
            return Err(CancelReason::Token);
        }

        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CancelReason::Token),
            _ = deadline => Err(CancelReason::Deadline),
            out = fut => Ok(out),
        }
    }
}

/// リゾルバが確保した名前
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub name: String,
    /// 消費した試行回数（成功した試行を含む）
    pub attempts: u32,
}

enum AttemptOutcome {
    Created,
    Collision,
    Transient(CloudError),
}

/// 狭義単調増加のミリ秒値をサフィックスの桁数に丸めたもの
#[derive(Debug, Default)]
struct SuffixSequence {
    last: Option<i64>,
}

impl SuffixSequence {
    fn next(&mut self, clock: &dyn Clock) -> String {
        let now = clock.now().timestamp_millis();
        let reading = match self.last {
            Some(last) if now <= last => last + 1,
            _ => now,
        };
        self.last = Some(reading);
        format!(
            "{:0width$}",
            reading.rem_euclid(SUFFIX_MODULUS),
            width = RETRY_SUFFIX_DIGITS
        )
    }
}

/// 上限付きのバックオフリトライで空き名を見つけて確保する
pub struct CollisionResolver<'a> {
    prefix: &'a str,
    max_retries: u32,
    backoff: &'a BackoffConfig,
    clock: &'a dyn Clock,
}

impl<'a> CollisionResolver<'a> {
    pub fn new(
        prefix: &'a str,
        max_retries: u32,
        backoff: &'a BackoffConfig,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            prefix,
            max_retries,
            backoff,
            clock,
        }
    }

    pub async fn resolve(
        &self,
        sanitized: &SanitizedComponents,
        oracle: &dyn ExistenceOracle,
        creator: &dyn Creator,
        ctx: &ResolveContext,
    ) -> Result<Resolution> {
        let plain_base = assemble_base(self.prefix, sanitized, 0);
        let suffixed_base = assemble_base(self.prefix, sanitized, RETRY_SUFFIX_DIGITS + 1);
        let skip_budget = self.max_retries + 1;

        let mut suffixes = SuffixSequence::default();
        let mut attempt: u32 = 0;
        let mut skipped: u32 = 0;

        loop {
            let candidate = if attempt == 0 && skipped == 0 {
                plain_base.clone()
            } else {
                format!("{}-{}", suffixed_base, suffixes.next(self.clock))
            };

            let validation = validate_name(&candidate);
            if !validation.is_valid {
                skipped += 1;
                tracing::debug!(
                    "Skipping invalid candidate {} ({})",
                    candidate,
                    validation.errors.join("; ")
                );
                if skipped > skip_budget {
                    return Err(NamingError::invalid_generated_name(
                        candidate,
                        validation.errors,
                    ));
                }
                continue;
            }

            tracing::debug!("Attempt {}/{}: {}", attempt + 1, self.max_retries + 1, candidate);

            let outcome = self
                .try_claim(&candidate, oracle, creator, ctx)
                .await
                .map_err(|reason| NamingError::Cancelled {
                    attempts: attempt,
                    reason,
                })?;

            let transient = match outcome {
                AttemptOutcome::Created => {
                    tracing::info!("Claimed name {} after {} attempt(s)", candidate, attempt + 1);
                    return Ok(Resolution {
                        name: candidate,
                        attempts: attempt + 1,
                    });
                }
                AttemptOutcome::Collision => {
                    tracing::debug!("Name {} is taken", candidate);
                    None
                }
                AttemptOutcome::Transient(e) => {
                    tracing::warn!("Naming authority failed for {}: {}", candidate, e);
                    Some(e)
                }
            };

            if attempt >= self.max_retries {
                let attempts = attempt + 1;
                return Err(match transient {
                    Some(source) => NamingError::OracleUnavailable { attempts, source },
                    None => NamingError::CollisionExhausted {
                        attempts,
                        last_candidate: candidate,
                    },
                });
            }

            let delay = self.backoff.delay_for_attempt(attempt);
            tracing::debug!("Backing off {:?} before attempt {}", delay, attempt + 2);
            ctx.guard(self.clock.sleep(delay))
                .await
                .map_err(|reason| NamingError::Cancelled {
                    attempts: attempt + 1,
                    reason,
                })?;

            attempt += 1;
        }
    }

    async fn try_claim(
        &self,
        candidate: &str,
        oracle: &dyn ExistenceOracle,
        creator: &dyn Creator,
        ctx: &ResolveContext,
    ) -> std::result::Result<AttemptOutcome, CancelReason> {
        match ctx.guard(oracle.exists(candidate)).await? {
            Ok(true) => Ok(AttemptOutcome::Collision),
            Ok(false) => match ctx.guard(creator.create(candidate)).await? {
                Ok(()) => Ok(AttemptOutcome::Created),
                Err(e) if e.is_already_exists() => Ok(AttemptOutcome::Collision),
                Err(e) => Ok(AttemptOutcome::Transient(e)),
            },
            Err(e) => Ok(AttemptOutcome::Transient(e)),
        }
    }
}
