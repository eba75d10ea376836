//! コンポーネントのサニタイズ
//!
//! 任意の入力文字列を、命名に使える文字 `[a-z0-9-]` だけのコンポーネントに
//! 変換します。ここの関数はすべて純粋かつ冪等です: `f(f(x)) == f(x)`

use crate::model::{NameRequest, SanitizedComponents};

/// サニタイズ後に何も残らなかった場合の代替値
pub const FALLBACK_TOKEN: &str = "default";

/// リソース名を構成する3つの要素のひとつ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Account,
    Team,
    Moniker,
}

impl Component {
    pub fn min_len(self) -> usize {
        match self {
            Component::Account => 3,
            Component::Team => 2,
            Component::Moniker => 3,
        }
    }

    pub fn max_len(self) -> usize {
        match self {
            Component::Account => 20,
            Component::Team => 20,
            Component::Moniker => 20,
        }
    }

    /// [`Component::min_len`] に満たない値にハイフン付きで追加する
    pub fn pad_token(self) -> &'static str {
        match self {
            Component::Account => "acct",
            Component::Team => "team",
            Component::Moniker => "cfg",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Component::Account => "account",
            Component::Team => "team",
            Component::Moniker => "moniker",
        }
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 任意の文字列を `[a-z0-9-]` に写像する（ハイフンは内側に1つずつ）
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_hyphen = false;

    for ch in input.chars() {
        let mapped = if ch.is_ascii_alphanumeric() {
            ch.to_ascii_lowercase()
        } else {
            '-'
        };

        if mapped == '-' {
            if last_was_hyphen {
                continue;
            }
            last_was_hyphen = true;
        } else {
            last_was_hyphen = false;
        }
        out.push(mapped);
    }

    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        FALLBACK_TOKEN.to_string()
    } else {
        trimmed.to_string()
    }
}

/// [`sanitize`] に `component` ごとの長さ規則を加えたもの
pub fn sanitize_component(component: Component, input: &str) -> String {
    let mut value = sanitize(input);

    if value.len() < component.min_len() {
        value.push('-');
        value.push_str(component.pad_token());
    }

    if value.len() > component.max_len() {
        // この時点で ASCII のみなのでバイト単位で切り詰めてよい
        value.truncate(component.max_len());
        let end = value.trim_end_matches('-').len();
        value.truncate(end);
    }

    value
}

/// リクエストの全コンポーネントをサニタイズ
pub fn sanitize_request(request: &NameRequest) -> SanitizedComponents {
    SanitizedComponents {
        account: sanitize_component(Component::Account, &request.account),
        team: sanitize_component(Component::Team, &request.team),
        moniker: sanitize_component(Component::Moniker, &request.moniker),
    }
}
