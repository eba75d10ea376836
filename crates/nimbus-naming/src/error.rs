//! 命名エラー型

use nimbus_cloud::CloudError;
use thiserror::Error;

/// 解決が結論に達する前に止まった理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// 呼び出し元のキャンセルトークンが発火した
    Token,
    /// 呼び出し元が指定した期限を過ぎた
    Deadline,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancelReason::Token => write!(f, "cancelled by caller"),
            CancelReason::Deadline => write!(f, "deadline exceeded"),
        }
    }
}

/// 命名エラー
#[derive(Error, Debug)]
pub enum NamingError {
    /// 入力がコンポーネントの事前チェックに失敗した。I/O は行っていない
    #[error("Invalid name components: {}", .errors.join("; "))]
    InvalidComponents { errors: Vec<String> },

    /// 生成した候補が命名規則に違反した。
    /// 呼び出し元の誤りではなくジェネレータの不具合
    #[error("Generated name {name:?} violates the naming grammar: {}", .errors.join("; "))]
    InvalidGeneratedName { name: String, errors: Vec<String> },

    #[error("No free name found after {attempts} attempts (last candidate: {last_candidate})")]
    CollisionExhausted {
        attempts: u32,
        last_candidate: String,
    },

    #[error("Naming authority unavailable after {attempts} attempts: {source}")]
    OracleUnavailable {
        attempts: u32,
        #[source]
        source: CloudError,
    },

    #[error("Name resolution {reason} after {attempts} attempts")]
    Cancelled { attempts: u32, reason: CancelReason },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config file error: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("Config file not found. Set NIMBUS_NAMING_CONFIG or create nimbus-naming.yaml")]
    ConfigNotFound,
}

impl NamingError {
    /// 生成した名前が文法違反だったことを error レベルで記録して返す
    ///
    /// 入力の問題ではなくジェネレータの不具合なので、利用者エラーとは
    /// 区別してログに残す。
    pub fn invalid_generated_name(name: impl Into<String>, errors: Vec<String>) -> Self {
        let name = name.into();
        tracing::error!(
            "Generated name {} violates the naming grammar: {}",
            name,
            errors.join("; ")
        );
        NamingError::InvalidGeneratedName { name, errors }
    }

    /// リクエストを直せば解消するエラー
    pub fn is_user_error(&self) -> bool {
        matches!(self, NamingError::InvalidComponents { .. })
    }

    /// 呼び出し元で後から再試行する価値のあるエラー
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NamingError::CollisionExhausted { .. } | NamingError::OracleUnavailable { .. }
        )
    }

    /// エラーまでに行った試行回数（試行があった場合のみ）
    pub fn attempts(&self) -> Option<u32> {
        match self {
            NamingError::CollisionExhausted { attempts, .. }
            | NamingError::OracleUnavailable { attempts, .. }
            | NamingError::Cancelled { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, NamingError>;
