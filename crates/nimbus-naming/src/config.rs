//! ジェネレータ設定
//!
//! 設定は YAML ファイル、環境変数、コードのいずれからも与えられます。
//! キーは camelCase で、すべて省略可能です:
//!
//! ```yaml
//! strategy: hybrid        # hash | retry | hybrid
//! enableValidation: true
//! maxRetries: 3
//! cacheSize: 100
//! prefix: nim
//! defaultRegion: us-east-1
//! backoff:
//!   initialDelayMs: 100
//!   maxDelayMs: 5000
//!   multiplier: 2.0
//! limits:
//!   account: 20
//!   team: 20
//!   moniker: 15
//! ```

use crate::builder::{HASH_SUFFIX_LEN, assembly_overhead};
use crate::error::{NamingError, Result};
use crate::resolver::RETRY_SUFFIX_DIGITS;
use crate::sanitize::sanitize;
use crate::validate::{ComponentLimits, MAX_NAME_LEN, RESERVED_PREFIXES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "NIMBUS_NAMING_CONFIG";
pub const ENV_STRATEGY: &str = "NIMBUS_NAMING_STRATEGY";
pub const ENV_MAX_RETRIES: &str = "NIMBUS_NAMING_MAX_RETRIES";
pub const ENV_CACHE_SIZE: &str = "NIMBUS_NAMING_CACHE_SIZE";
pub const ENV_ENABLE_VALIDATION: &str = "NIMBUS_NAMING_ENABLE_VALIDATION";
pub const ENV_PREFIX: &str = "NIMBUS_NAMING_PREFIX";

const CONFIG_FILE: &str = "nimbus-naming.yaml";
const CONFIG_DIR: &str = ".nimbus";
const CONFIG_DIR_FILE: &str = "naming.yaml";

/// 3要素を詰め込める最小の文字数
const MIN_COMPONENT_BUDGET: usize = 3;

/// 名前の生成戦略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// 決定的なハッシュ付き名前（I/O なし）
    Hash,
    /// 実際の存在確認とサフィックス付きリトライ
    Retry,
    /// まずハッシュ付き名前、衝突時のみリトライ
    #[default]
    Hybrid,
}

impl Strategy {
    /// この戦略が付けうる最長のサフィックス（区切りを含む）
    pub fn suffix_budget(self) -> usize {
        match self {
            Strategy::Hash | Strategy::Hybrid => HASH_SUFFIX_LEN + 1,
            Strategy::Retry => RETRY_SUFFIX_DIGITS + 1,
        }
    }

    /// 命名機関への問い合わせが必要か
    pub fn needs_namespace(self) -> bool {
        !matches!(self, Strategy::Hash)
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Hash => write!(f, "hash"),
            Strategy::Retry => write!(f, "retry"),
            Strategy::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl FromStr for Strategy {
    type Err = NamingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hash" => Ok(Strategy::Hash),
            "retry" => Ok(Strategy::Retry),
            "hybrid" => Ok(Strategy::Hybrid),
            other => Err(NamingError::InvalidConfig(format!(
                "unknown strategy {other:?} (expected hash, retry or hybrid)"
            ))),
        }
    }
}

/// 衝突リトライ間の指数バックオフ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackoffConfig {
    /// 最初の失敗後の待機時間
    pub initial_delay_ms: u64,

    /// 1回の待機時間の上限
    pub max_delay_ms: u64,

    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 100,
            max_delay_ms: 5_000,
            multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    /// `attempt` 回目（0始まり）の後の待機時間
    ///
    /// `initial * multiplier^attempt` を `max_delay_ms` で頭打ちにする
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        Duration::from_millis((delay as u64).min(self.max_delay_ms))
    }
}

/// 名前ジェネレータの設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorConfig {
    pub strategy: Strategy,

    /// 生成前にコンポーネントの事前チェックを行う
    pub enable_validation: bool,

    /// 初回以降のリトライ回数。`retry` は `max_retries + 1` 回試行する
    pub max_retries: u32,

    /// 結果キャッシュの容量。`0` で無効
    pub cache_size: usize,

    /// すべての名前の先頭に付く固定要素
    pub prefix: String,

    /// リクエストにリージョンがない場合にハッシュへ含めるリージョン
    pub default_region: String,

    pub backoff: BackoffConfig,

    pub limits: ComponentLimits,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            enable_validation: true,
            max_retries: 3,
            cache_size: 100,
            prefix: "nim".to_string(),
            default_region: "us-east-1".to_string(),
            backoff: BackoffConfig::default(),
            limits: ComponentLimits::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = enabled;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// 現在の戦略で3要素の外側に加わる文字数
    pub fn overhead(&self) -> usize {
        assembly_overhead(&self.prefix, self.strategy.suffix_budget())
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: GeneratorConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// YAML 設定ファイルを読み込む
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&content)?;
        tracing::debug!("Loaded naming config from {}", path.display());
        Ok(config)
    }

    /// 設定ファイルを探して読み込み、環境変数で上書きして検証する
    ///
    /// ファイルがなければデフォルト値（と環境変数による上書き）を使う。
    pub fn discover() -> Result<Self> {
        let mut config = match find_config_file() {
            Ok(path) => Self::load(path)?,
            Err(NamingError::ConfigNotFound) => {
                tracing::debug!("No naming config file found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// `NIMBUS_NAMING_*` 環境変数で上書き
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(value) = env_var(ENV_STRATEGY) {
            self.strategy = value.parse()?;
        }
        if let Some(value) = env_var(ENV_MAX_RETRIES) {
            self.max_retries = parse_env(ENV_MAX_RETRIES, &value)?;
        }
        if let Some(value) = env_var(ENV_CACHE_SIZE) {
            self.cache_size = parse_env(ENV_CACHE_SIZE, &value)?;
        }
        if let Some(value) = env_var(ENV_ENABLE_VALIDATION) {
            self.enable_validation = parse_env(ENV_ENABLE_VALIDATION, &value)?;
        }
        if let Some(value) = env_var(ENV_PREFIX) {
            self.prefix = value;
        }
        Ok(())
    }

    /// 有効な名前を生成しようがない設定を拒否
    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() {
            return Err(NamingError::InvalidConfig("prefix must not be empty".into()));
        }
        if sanitize(&self.prefix) != self.prefix {
            return Err(NamingError::InvalidConfig(format!(
                "prefix {:?} must use lowercase letters, digits and single inner hyphens",
                self.prefix
            )));
        }
        if let Some(reserved) = RESERVED_PREFIXES.iter().find(|p| self.prefix.starts_with(*p)) {
            return Err(NamingError::InvalidConfig(format!(
                "prefix {:?} starts with reserved prefix {:?}",
                self.prefix, reserved
            )));
        }

        let worst_overhead = assembly_overhead(&self.prefix, Strategy::Hash.suffix_budget());
        if worst_overhead + MIN_COMPONENT_BUDGET > MAX_NAME_LEN {
            return Err(NamingError::InvalidConfig(format!(
                "prefix {:?} is too long: at most {} characters allowed",
                self.prefix,
                MAX_NAME_LEN - MIN_COMPONENT_BUDGET - (worst_overhead - self.prefix.len())
            )));
        }

        if !self.backoff.multiplier.is_finite() || self.backoff.multiplier < 1.0 {
            return Err(NamingError::InvalidConfig(format!(
                "backoff multiplier must be >= 1.0, got {}",
                self.backoff.multiplier
            )));
        }
        if self.backoff.initial_delay_ms > self.backoff.max_delay_ms {
            return Err(NamingError::InvalidConfig(format!(
                "backoff initialDelayMs ({}) exceeds maxDelayMs ({})",
                self.backoff.initial_delay_ms, self.backoff.max_delay_ms
            )));
        }

        if self.limits.account == 0 || self.limits.team == 0 || self.limits.moniker == 0 {
            return Err(NamingError::InvalidConfig(
                "component limits must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| NamingError::InvalidConfig(format!("{name}={value:?} could not be parsed")))
}

/// 命名設定ファイルを検索
///
/// 検索順序:
/// 1. `NIMBUS_NAMING_CONFIG`（直接パス指定）
/// 2. `./nimbus-naming.yaml`
/// 3. `./.nimbus/naming.yaml`
/// 4. `<config_dir>/nimbus/naming.yaml`
pub fn find_config_file() -> Result<PathBuf> {
    if let Some(config_path) = env_var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(
            "{} points to {}, which does not exist",
            ENV_CONFIG_PATH,
            path.display()
        );
    }

    let current_dir = std::env::current_dir()?;

    let local = current_dir.join(CONFIG_FILE);
    if local.exists() {
        return Ok(local);
    }

    let in_dir = current_dir.join(CONFIG_DIR).join(CONFIG_DIR_FILE);
    if in_dir.exists() {
        return Ok(in_dir);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("nimbus").join(CONFIG_DIR_FILE);
        if global.exists() {
            return Ok(global);
        }
    }

    Err(NamingError::ConfigNotFound)
}
