//! Nimbus リソース命名
//!
//! `(account, team, moniker)` の組から、グローバルに一意で命名規則に
//! 準拠したバケット名を生成します。
//!
//! # アーキテクチャ
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 NameGenerator                    │
//! │     cache ─▶ pre-check ─▶ sanitize ─▶ strategy   │
//! │                  ─▶ post-check ─▶ cache          │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼────────────────────────┐
//! │     hash      │ │       CollisionResolver         │
//! │  (no I/O,     │ │  attempt / backoff / cancel     │
//! │ deterministic)│ └───────┬────────────────────────┘
//! └───────────────┘         │
//!                 ┌─────────▼─────────┐
//!                 │   nimbus-cloud    │
//!                 │ ExistenceOracle + │
//!                 │      Creator      │
//!                 └───────────────────┘
//! ```
//!
//! # 使用例
//!
//! ```no_run
//! use nimbus_naming::{GeneratorConfig, NameGenerator, NameRequest, Strategy};
//!
//! # async fn run() -> nimbus_naming::Result<()> {
//! let generator = NameGenerator::new(GeneratorConfig::default().with_strategy(Strategy::Hash))?;
//! let name = generator
//!     .generate(&NameRequest::new("prod", "data", "config"))
//!     .await?;
//! println!("{}", name.bucket_name);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod generator;
pub mod model;
pub mod resolver;
pub mod sanitize;
pub mod validate;

// 再エクスポート
pub use builder::{HASH_SUFFIX_LEN, assemble_base, build_hashed_name, hash_suffix};
pub use cache::{CacheEntry, ResultCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BackoffConfig, GeneratorConfig, Strategy, find_config_file};
pub use error::{CancelReason, NamingError, Result};
pub use generator::NameGenerator;
pub use model::{GeneratedName, NameRequest, SanitizedComponents, StrategyTag};
pub use resolver::{CollisionResolver, Resolution, ResolveContext};
pub use sanitize::{Component, sanitize, sanitize_component, sanitize_request};
pub use validate::{ComponentLimits, ValidationOutcome, validate_components, validate_name};
