//! リクエストと結果の型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 1つのリソース名に対応するテナント・所有チーム・用途の組
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameRequest {
    pub account: String,
    pub team: String,
    pub moniker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl NameRequest {
    pub fn new(
        account: impl Into<String>,
        team: impl Into<String>,
        moniker: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            team: team.into(),
            moniker: moniker.into(),
            region: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// サニタイズ後のコンポーネント
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizedComponents {
    pub account: String,
    pub team: String,
    pub moniker: String,
}

/// 名前を生成した経路
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyTag {
    /// 決定的なハッシュ付き名前
    Hash,
    /// 単純なリトライ結果を記録する呼び出し元向けに予約
    Retry,
    /// 衝突解決で見つけた名前
    CollisionFree,
}

impl std::fmt::Display for StrategyTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyTag::Hash => write!(f, "hash"),
            StrategyTag::Retry => write!(f, "retry"),
            StrategyTag::CollisionFree => write!(f, "collision-free"),
        }
    }
}

/// 生成されたリソース名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedName {
    pub bucket_name: String,

    #[serde(rename = "strategy")]
    pub strategy_used: StrategyTag,

    /// この呼び出しでリソースを作成したかどうか
    pub created: bool,

    pub sanitized: SanitizedComponents,

    pub timestamp: DateTime<Utc>,
}
