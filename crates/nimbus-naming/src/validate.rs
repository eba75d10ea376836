//! 命名規則のチェック
//!
//! 入口は2つ:
//!
//! - [`validate_components`]: 入力そのものの事前チェック。I/O より前に実行
//! - [`validate_name`]: 組み立て済みの候補をすべての規則で再チェック
//!
//! どちらも失敗せず、問題は [`ValidationOutcome`] で報告します。

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub const MIN_NAME_LEN: usize = 3;
pub const MAX_NAME_LEN: usize = 63;

pub const RESERVED_PREFIXES: &[&str] = &["s3", "sthree", "xn--"];
pub const RESERVED_SUFFIXES: &[&str] = &["-s3alias", "--ol-s3"];

const FORBIDDEN_SEQUENCES: &[&str] = &["--", "..", ".-", "-."];

static IPV4_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,3}(\.\d{1,3}){3}$").expect("IPv4 pattern compiles")
});

/// 検証結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    fn from_parts(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// コンポーネントごとに受け付ける入力の最大長
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentLimits {
    pub account: usize,
    pub team: usize,
    pub moniker: usize,
}

impl Default for ComponentLimits {
    fn default() -> Self {
        Self {
            account: 20,
            team: 20,
            moniker: 15,
        }
    }
}

/// 入力コンポーネントの事前チェック
///
/// `overhead` は組み立て時にコンポーネント以外で加わる長さ
/// （プレフィックス、区切り、戦略が付けうる最長のサフィックス）。
pub fn validate_components(
    account: &str,
    team: &str,
    moniker: &str,
    limits: &ComponentLimits,
    overhead: usize,
) -> ValidationOutcome {
    let mut errors = Vec::new();

    let parts = [
        ("account", account, limits.account),
        ("team", team, limits.team),
        ("moniker", moniker, limits.moniker),
    ];

    let mut total = overhead;
    for (label, value, max) in parts {
        let len = value.chars().count();
        total += len;

        if len > max {
            errors.push(format!("{label} length {len} exceeds maximum of {max}"));
        }
        if !value.chars().any(|c| c.is_ascii_alphanumeric()) {
            errors.push(format!("{label} must contain at least one ASCII letter or digit"));
        }
    }

    if total > MAX_NAME_LEN {
        errors.push(format!(
            "assembled name length {total} exceeds maximum of {MAX_NAME_LEN}"
        ));
    }

    ValidationOutcome::from_parts(errors, Vec::new())
}

/// 組み立て済みの候補を命名規則全体でチェック
pub fn validate_name(name: &str) -> ValidationOutcome {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let len = name.chars().count();
    if len < MIN_NAME_LEN {
        errors.push(format!("name length {len} is below minimum of {MIN_NAME_LEN}"));
    }
    if len > MAX_NAME_LEN {
        errors.push(format!("name length {len} exceeds maximum of {MAX_NAME_LEN}"));
    }

    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '.'))
    {
        errors.push(format!("contains invalid character {bad:?}"));
    }

    if name.contains('.') {
        warnings.push("contains '.', which breaks virtual-host style addressing".to_string());
    }

    for edge in ['-', '.'] {
        if name.starts_with(edge) {
            errors.push(format!("starts with {edge:?}"));
        }
        if name.ends_with(edge) {
            errors.push(format!("ends with {edge:?}"));
        }
    }

    for seq in FORBIDDEN_SEQUENCES {
        if name.contains(seq) {
            errors.push(format!("contains forbidden sequence {seq:?}"));
        }
    }

    if let Some(prefix) = RESERVED_PREFIXES.iter().find(|p| name.starts_with(*p)) {
        errors.push(format!("starts with reserved prefix {prefix:?}"));
    }
    if let Some(suffix) = RESERVED_SUFFIXES.iter().find(|s| name.ends_with(*s)) {
        errors.push(format!("ends with reserved suffix {suffix:?}"));
    }

    if IPV4_SHAPE.is_match(name) {
        errors.push("is formatted as an IPv4 address".to_string());
    }

    ValidationOutcome::from_parts(errors, warnings)
}
