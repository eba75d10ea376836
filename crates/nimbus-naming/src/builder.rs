//! 決定的な名前の組み立て
//!
//! 名前は `prefix-account-team-moniker[-suffix]` の形で組み立てます。
//! [`MAX_NAME_LEN`] を超える場合は中央の3要素だけを短くします。
//! 最も長い要素（同じ長さなら右側）の末尾から1文字ずつ削り、収まるまで
//! 繰り返します。プレフィックスとサフィックスには触れないため、
//! ハッシュサフィックスは必ず残ります。

use crate::model::SanitizedComponents;
use crate::validate::MAX_NAME_LEN;
use sha2::{Digest, Sha256};

/// ハッシュサフィックスとして使う SHA-256 の16進文字数
pub const HASH_SUFFIX_LEN: usize = 8;

/// プレフィックスと3要素の間の区切り数
const COMPONENT_SEPARATORS: usize = 3;

/// `sha256("account:team:moniker:region")` の先頭
/// [`HASH_SUFFIX_LEN`] 文字
pub fn hash_suffix(sanitized: &SanitizedComponents, region: &str) -> String {
    let input = format!(
        "{}:{}:{}:{}",
        sanitized.account, sanitized.team, sanitized.moniker, region
    );
    let digest = format!("{:x}", Sha256::digest(input.as_bytes()));
    digest[..HASH_SUFFIX_LEN].to_string()
}

/// 内容から決まる名前。同じ入力からは常に同じ名前になる
pub fn build_hashed_name(prefix: &str, sanitized: &SanitizedComponents, region: &str) -> String {
    let suffix = hash_suffix(sanitized, region);
    let base = assemble_base(prefix, sanitized, suffix.len() + 1);
    format!("{}-{}", base, suffix)
}

/// `prefix-account-team-moniker`
///
/// あと `reserve` 文字を付け足しても [`MAX_NAME_LEN`] を超えないように縮める。
pub fn assemble_base(prefix: &str, sanitized: &SanitizedComponents, reserve: usize) -> String {
    let budget = MAX_NAME_LEN
        .saturating_sub(prefix.len())
        .saturating_sub(COMPONENT_SEPARATORS)
        .saturating_sub(reserve);

    let [account, team, moniker] = fit_components(
        [&sanitized.account, &sanitized.team, &sanitized.moniker],
        budget,
    );
    format!("{}-{}-{}-{}", prefix, account, team, moniker)
}

/// サフィックス長に対して、名前がコンポーネント以外に使う長さ
pub fn assembly_overhead(prefix: &str, suffix_len: usize) -> usize {
    prefix.len() + COMPONENT_SEPARATORS + suffix_len
}

fn fit_components(parts: [&str; 3], budget: usize) -> [String; 3] {
    let mut parts = parts.map(str::to_string);

    while parts.iter().map(String::len).sum::<usize>() > budget {
        let mut longest = 0;
        for (i, part) in parts.iter().enumerate() {
            if part.len() >= parts[longest].len() {
                longest = i;
            }
        }
        // 各要素は最低1文字残す
        if parts[longest].len() <= 1 {
            break;
        }
        parts[longest].pop();
    }

    for part in parts.iter_mut() {
        let end = part.trim_end_matches('-').len();
        part.truncate(end);
    }
    parts
}
