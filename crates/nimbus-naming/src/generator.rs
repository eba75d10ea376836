//! 戦略のオーケストレーション
//!
//! [`NameGenerator`] が公開の入口です。1回の呼び出しで次の順に処理します:
//!
//! 1. 結果キャッシュの参照
//! 2. コンポーネントの事前チェック（検証が有効な場合）
//! 3. サニタイズ
//! 4. 設定された戦略の実行
//! 5. 最終的な名前の命名規則チェック
//! 6. 結果キャッシュへの格納

use crate::builder::build_hashed_name;
use crate::cache::ResultCache;
use crate::clock::{Clock, SystemClock};
use crate::config::{GeneratorConfig, Strategy};
use crate::error::{NamingError, Result};
use crate::model::{GeneratedName, NameRequest, SanitizedComponents, StrategyTag};
use crate::resolver::{CollisionResolver, ResolveContext};
use crate::sanitize::sanitize_request;
use crate::validate::{validate_components, validate_name};
use nimbus_cloud::{Creator, ExistenceOracle, Namespace};
use std::sync::Arc;

/// 命名規則に準拠したリソース名を生成する
pub struct NameGenerator {
    config: GeneratorConfig,
    oracle: Option<Arc<dyn ExistenceOracle>>,
    creator: Option<Arc<dyn Creator>>,
    clock: Arc<dyn Clock>,
    cache: Arc<ResultCache>,
}

impl NameGenerator {
    /// `config.cache_size` の容量で専用キャッシュを持つジェネレータを作成
    ///
    /// `retry` と `hybrid` は命名機関も必要。
    /// [`NameGenerator::with_namespace`] か
    /// [`NameGenerator::with_collaborators`] で接続する。
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let cache = Arc::new(ResultCache::new(config.cache_size));
        Ok(Self {
            config,
            oracle: None,
            creator: None,
            clock: Arc::new(SystemClock),
            cache,
        })
    }

    /// 1つのプロバイダを存在確認と作成の両方に使う
    pub fn with_namespace<N: Namespace + 'static>(mut self, namespace: Arc<N>) -> Self {
        self.oracle = Some(namespace.clone());
        self.creator = Some(namespace);
        self
    }

    pub fn with_collaborators(
        mut self,
        oracle: Arc<dyn ExistenceOracle>,
        creator: Arc<dyn Creator>,
    ) -> Self {
        self.oracle = Some(oracle);
        self.creator = Some(creator);
        self
    }

    /// 呼び出し元が持つキャッシュを共有し、専用キャッシュと差し替える
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// 名前を生成する。同じリクエストはキャッシュから返す
    pub async fn generate(&self, request: &NameRequest) -> Result<GeneratedName> {
        self.generate_with(request, &ResolveContext::new()).await
    }

    /// キャンセルトークンや期限を指定できる [`NameGenerator::generate`]
    pub async fn generate_with(
        &self,
        request: &NameRequest,
        ctx: &ResolveContext,
    ) -> Result<GeneratedName> {
        let key = self.cache_key(request);
        if let Some(mut hit) = self.cache.get(&key) {
            tracing::debug!("Cache hit for {}", hit.bucket_name);
            // キャッシュから返す呼び出しでは何も作成していない
            hit.created = false;
            hit.timestamp = self.clock.now();
            return Ok(hit);
        }

        let generated = self.run(request, ctx).await?;
        self.cache.set(key, generated.clone());
        Ok(generated)
    }

    /// キャッシュを参照せずに生成する（名前空間の再確認など）
    ///
    /// 新しい結果でキャッシュは置き換える。
    pub async fn generate_uncached(
        &self,
        request: &NameRequest,
        ctx: &ResolveContext,
    ) -> Result<GeneratedName> {
        let generated = self.run(request, ctx).await?;
        self.cache.set(self.cache_key(request), generated.clone());
        Ok(generated)
    }

    /// キャッシュキー
    ///
    /// リクエストに加えて、結果の名前を左右する設定（戦略・プレフィックス・
    /// 解決後のリージョン）を含める。設定の異なるジェネレータが同じ
    /// [`ResultCache`] を共有しても結果が混ざらない。
    pub fn cache_key(&self, request: &NameRequest) -> String {
        format!(
            "{}\0{}\0{}\0{}\0{}\0{}",
            self.config.strategy,
            self.config.prefix,
            request.account,
            request.team,
            request.moniker,
            self.region_for(request)
        )
    }

    fn region_for<'r>(&'r self, request: &'r NameRequest) -> &'r str {
        request
            .region
            .as_deref()
            .unwrap_or(&self.config.default_region)
    }

    async fn run(&self, request: &NameRequest, ctx: &ResolveContext) -> Result<GeneratedName> {
        // 設定不備はリクエストの検証より先に報告する
        let namespace = if self.config.strategy.needs_namespace() {
            Some(self.namespace()?)
        } else {
            None
        };

        if self.config.enable_validation {
            let outcome = validate_components(
                &request.account,
                &request.team,
                &request.moniker,
                &self.config.limits,
                self.config.overhead(),
            );
            if !outcome.is_valid {
                tracing::debug!("Rejected request: {}", outcome.errors.join("; "));
                return Err(NamingError::InvalidComponents {
                    errors: outcome.errors,
                });
            }
        }

        let sanitized = sanitize_request(request);
        let region = self.region_for(request);

        match (self.config.strategy, namespace) {
            (Strategy::Retry, Some((oracle, creator))) => {
                let name = self.resolve(&sanitized, oracle, creator, ctx).await?;
                self.finish(name, StrategyTag::CollisionFree, true, sanitized)
            }
            (Strategy::Hybrid, Some((oracle, creator))) => {
                let hashed = build_hashed_name(&self.config.prefix, &sanitized, region);
                check_candidate(&hashed)?;

                if self.claim_hashed(&hashed, oracle, creator, ctx).await? {
                    return self.finish(hashed, StrategyTag::Hash, true, sanitized);
                }

                let name = self.resolve(&sanitized, oracle, creator, ctx).await?;
                self.finish(name, StrategyTag::CollisionFree, true, sanitized)
            }
            _ => {
                let name = build_hashed_name(&self.config.prefix, &sanitized, region);
                self.finish(name, StrategyTag::Hash, false, sanitized)
            }
        }
    }

    /// hybrid の高速経路: 存在確認を1回、空いていれば作成を1回
    ///
    /// リゾルバに引き継ぐ必要がある場合は `false` を返す。
    async fn claim_hashed(
        &self,
        hashed: &str,
        oracle: &dyn ExistenceOracle,
        creator: &dyn Creator,
        ctx: &ResolveContext,
    ) -> Result<bool> {
        let cancelled = |reason| NamingError::Cancelled {
            attempts: 0,
            reason,
        };

        match ctx.guard(oracle.exists(hashed)).await.map_err(cancelled)? {
            Ok(false) => {}
            Ok(true) => {
                tracing::debug!("Hashed name {} is taken, resolving with retries", hashed);
                return Ok(false);
            }
            Err(e) => {
                tracing::warn!("Existence check for {} failed: {}", hashed, e);
                return Ok(false);
            }
        }

        match ctx.guard(creator.create(hashed)).await.map_err(cancelled)? {
            Ok(()) => {
                tracing::info!("Created {} from hashed name", hashed);
                Ok(true)
            }
            Err(e) if e.is_already_exists() => {
                tracing::debug!("Hashed name {} was claimed concurrently", hashed);
                Ok(false)
            }
            Err(e) => {
                tracing::warn!("Creating {} failed: {}", hashed, e);
                Ok(false)
            }
        }
    }

    async fn resolve(
        &self,
        sanitized: &SanitizedComponents,
        oracle: &dyn ExistenceOracle,
        creator: &dyn Creator,
        ctx: &ResolveContext,
    ) -> Result<String> {
        let resolver = CollisionResolver::new(
            &self.config.prefix,
            self.config.max_retries,
            &self.config.backoff,
            self.clock.as_ref(),
        );
        let resolution = resolver.resolve(sanitized, oracle, creator, ctx).await?;
        Ok(resolution.name)
    }

    fn namespace(&self) -> Result<(&dyn ExistenceOracle, &dyn Creator)> {
        match (&self.oracle, &self.creator) {
            (Some(oracle), Some(creator)) => Ok((oracle.as_ref(), creator.as_ref())),
            _ => Err(NamingError::InvalidConfig(format!(
                "strategy {} needs a naming authority; attach one with with_namespace",
                self.config.strategy
            ))),
        }
    }

    fn finish(
        &self,
        name: String,
        strategy_used: StrategyTag,
        created: bool,
        sanitized: SanitizedComponents,
    ) -> Result<GeneratedName> {
        check_candidate(&name)?;
        Ok(GeneratedName {
            bucket_name: name,
            strategy_used,
            created,
            sanitized,
            timestamp: self.clock.now(),
        })
    }
}

fn check_candidate(name: &str) -> Result<()> {
    let outcome = validate_name(name);
    if outcome.is_valid {
        return Ok(());
    }
    Err(NamingError::invalid_generated_name(name, outcome.errors))
}
