mod common;

use common::{AWKWARD_COMPONENTS, TestHarness};
use nimbus_cloud::InMemoryNamespace;
use nimbus_naming::validate::{MAX_NAME_LEN, MIN_NAME_LEN};
use nimbus_naming::{
    CancelReason, GeneratorConfig, NameGenerator, NameRequest, NamingError, ResolveContext,
    ResultCache, Strategy, StrategyTag, build_hashed_name, sanitize_request, validate_name,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[test]
fn test_sanitizes_mixed_case_and_punctuation() {
    let request = NameRequest::new("Prod_Account", "Data.Engineering", "Analytics_Config");
    let sanitized = sanitize_request(&request);

    assert_eq!(sanitized.account, "prod-account");
    assert_eq!(sanitized.team, "data-engineering");
    assert_eq!(sanitized.moniker, "analytics-config");
}

#[tokio::test]
async fn test_hash_strategy_is_deterministic() {
    let config = GeneratorConfig::default().with_strategy(Strategy::Hash);
    let request = NameRequest::new("prod", "data", "config").with_region("us-west-2");

    // 2回目がキャッシュヒットにならないよう別のジェネレータを使う
    let first = NameGenerator::new(config.clone())
        .unwrap()
        .generate(&request)
        .await
        .unwrap();
    let second = NameGenerator::new(config)
        .unwrap()
        .generate(&request)
        .await
        .unwrap();

    assert_eq!(first.bucket_name, second.bucket_name);
    assert_eq!(
        first.bucket_name,
        build_hashed_name("nim", &first.sanitized, "us-west-2")
    );
}

#[tokio::test]
async fn test_region_changes_hashed_name() {
    let generator =
        NameGenerator::new(GeneratorConfig::default().with_strategy(Strategy::Hash)).unwrap();

    let east = generator
        .generate(&NameRequest::new("prod", "data", "config"))
        .await
        .unwrap();
    let west = generator
        .generate(&NameRequest::new("prod", "data", "config").with_region("us-west-2"))
        .await
        .unwrap();

    assert_ne!(east.bucket_name, west.bucket_name);
}

#[tokio::test]
async fn test_overlong_account_rejected_without_io() {
    let harness = TestHarness::new(Strategy::Hybrid);
    let request = NameRequest::new("a".repeat(25), "data", "cfg");

    let err = harness.generator.generate(&request).await.unwrap_err();

    match &err {
        NamingError::InvalidComponents { errors } => {
            assert!(errors.iter().any(|e| e.contains("account") && e.contains("25")));
        }
        other => panic!("expected InvalidComponents, got {other:?}"),
    }
    assert!(err.is_user_error());
    assert_eq!(harness.oracle_calls(), 0);
    assert!(harness.generator.cache().is_empty());
}

#[tokio::test]
async fn test_retry_exhausts_after_max_retries_plus_one() {
    let harness = TestHarness::with_namespace(
        GeneratorConfig::default()
            .with_strategy(Strategy::Retry)
            .with_max_retries(2),
        InMemoryNamespace::fully_taken(),
    );

    let err = harness
        .generator
        .generate(&NameRequest::new("prod", "data", "config"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        NamingError::CollisionExhausted { attempts: 3, .. }
    ));
    assert_eq!(err.attempts(), Some(3));
    assert_eq!(harness.namespace.exists_calls(), 3);
    assert_eq!(harness.namespace.create_calls(), 0);
    assert_eq!(
        harness.clock.sleeps(),
        vec![Duration::from_millis(100), Duration::from_millis(200)]
    );
}

#[tokio::test]
async fn test_hybrid_free_hash_never_enters_retry_path() {
    let harness = TestHarness::new(Strategy::Hybrid);

    let result = harness
        .generator
        .generate(&NameRequest::new("prod", "data", "config"))
        .await
        .unwrap();

    assert_eq!(result.strategy_used, StrategyTag::Hash);
    assert!(result.created);
    assert_eq!(harness.namespace.exists_calls(), 1);
    assert_eq!(harness.namespace.create_calls(), 1);
    assert!(harness.clock.sleeps().is_empty());
    assert_eq!(harness.namespace.names(), vec![result.bucket_name.clone()]);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["strategy"], "hash");
    assert_eq!(json["created"], true);
}

#[tokio::test]
async fn test_every_strategy_yields_grammar_valid_names() {
    for strategy in [Strategy::Hash, Strategy::Retry, Strategy::Hybrid] {
        for (account, team, moniker) in AWKWARD_COMPONENTS {
            let harness = TestHarness::new(strategy);
            let request = NameRequest::new(*account, *team, *moniker);

            let result = harness
                .generator
                .generate(&request)
                .await
                .unwrap_or_else(|e| panic!("{strategy} failed for {request:?}: {e}"));

            let name = &result.bucket_name;
            assert!(validate_name(name).is_valid, "{strategy}: {name}");
            assert!((MIN_NAME_LEN..=MAX_NAME_LEN).contains(&name.len()));
        }
    }
}

#[tokio::test]
async fn test_worst_case_components_fit_every_strategy() {
    for strategy in [Strategy::Hash, Strategy::Retry, Strategy::Hybrid] {
        let harness = TestHarness::with_config(
            GeneratorConfig::default()
                .with_strategy(strategy)
                .with_validation(false),
        );
        let request = NameRequest::new("x".repeat(64), "y".repeat(64), "z".repeat(64));

        let result = harness.generator.generate(&request).await.unwrap();
        assert!(result.bucket_name.len() <= MAX_NAME_LEN);
        assert!(validate_name(&result.bucket_name).is_valid);
    }
}

#[tokio::test]
async fn test_retry_suffixes_after_collision() {
    let harness = TestHarness::with_namespace(
        GeneratorConfig::default().with_strategy(Strategy::Retry),
        InMemoryNamespace::with_names(["nim-prod-data-config"]),
    );

    let result = harness
        .generator
        .generate(&NameRequest::new("prod", "data", "config"))
        .await
        .unwrap();

    assert_eq!(result.strategy_used, StrategyTag::CollisionFree);
    assert!(result.created);
    assert_eq!(result.bucket_name, "nim-prod-data-config-0100");
    assert!(harness.namespace.contains("nim-prod-data-config-0100"));
}

#[tokio::test]
async fn test_transient_failures_surface_as_oracle_unavailable() {
    let namespace = InMemoryNamespace::new();
    namespace.fail_next_exists(10);
    let harness = TestHarness::with_namespace(
        GeneratorConfig::default()
            .with_strategy(Strategy::Retry)
            .with_max_retries(1),
        namespace,
    );

    let err = harness
        .generator
        .generate(&NameRequest::new("prod", "data", "config"))
        .await
        .unwrap_err();

    assert!(matches!(err, NamingError::OracleUnavailable { attempts: 2, .. }));
    assert!(err.is_retryable());
    assert!(harness.generator.cache().is_empty());
}

#[tokio::test]
async fn test_cached_result_skips_namespace() {
    let harness = TestHarness::new(Strategy::Retry);
    let request = NameRequest::new("prod", "data", "config");

    let first = harness.generator.generate(&request).await.unwrap();
    let calls = harness.oracle_calls();
    let second = harness.generator.generate(&request).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.bucket_name, second.bucket_name);
    assert_eq!(harness.oracle_calls(), calls);
    assert_eq!(harness.namespace.create_calls(), 1);
}

#[tokio::test]
async fn test_shared_cache_respects_each_prefix() {
    let cache = Arc::new(ResultCache::new(10));
    let ns = Arc::new(InMemoryNamespace::new());
    let request = NameRequest::new("prod", "data", "config");

    let default_prefix = NameGenerator::new(GeneratorConfig::default())
        .unwrap()
        .with_namespace(Arc::clone(&ns))
        .with_cache(cache.clone());
    let acme = NameGenerator::new(GeneratorConfig::default().with_prefix("acme"))
        .unwrap()
        .with_namespace(Arc::clone(&ns))
        .with_cache(cache.clone());

    let first = default_prefix.generate(&request).await.unwrap();
    let second = acme.generate(&request).await.unwrap();

    assert!(first.bucket_name.starts_with("nim-"));
    assert!(second.bucket_name.starts_with("acme-"));
    assert!(second.created);
    assert_eq!(ns.create_calls(), 2);
}

#[tokio::test]
async fn test_missing_namespace_is_config_error() {
    for strategy in [Strategy::Retry, Strategy::Hybrid] {
        let generator =
            NameGenerator::new(GeneratorConfig::default().with_strategy(strategy)).unwrap();
        let err = generator
            .generate(&NameRequest::new("prod", "data", "config"))
            .await
            .unwrap_err();
        assert!(matches!(err, NamingError::InvalidConfig(_)), "{strategy}");
    }
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let harness = TestHarness::new(Strategy::Hybrid);
    let token = CancellationToken::new();
    token.cancel();

    let err = harness
        .generator
        .generate_with(
            &NameRequest::new("prod", "data", "config"),
            &ResolveContext::with_cancellation(token),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        NamingError::Cancelled {
            attempts: 0,
            reason: CancelReason::Token
        }
    ));
    assert_eq!(harness.oracle_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_interrupts_backoff() {
    let namespace = Arc::new(InMemoryNamespace::fully_taken());
    let generator = NameGenerator::new(
        GeneratorConfig::default()
            .with_strategy(Strategy::Retry)
            .with_max_retries(10),
    )
    .unwrap()
    .with_namespace(Arc::clone(&namespace));

    // 試行0の後に100ms待ち、試行1の後の200ms待ちの途中で期限が来る
    let ctx = ResolveContext::new().with_timeout(Duration::from_millis(250));
    let err = generator
        .generate_with(&NameRequest::new("prod", "data", "config"), &ctx)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        NamingError::Cancelled {
            attempts: 2,
            reason: CancelReason::Deadline
        }
    ));
    assert_eq!(namespace.exists_calls(), 2);
}

#[tokio::test]
async fn test_concurrent_distinct_requests() {
    let harness = TestHarness::new(Strategy::Hybrid);
    let generator = Arc::new(harness.generator);

    let mut handles = Vec::new();
    for i in 0..16 {
        let generator = Arc::clone(&generator);
        handles.push(tokio::spawn(async move {
            generator
                .generate(&NameRequest::new("prod", "data", format!("svc{i}")))
                .await
        }));
    }

    let mut names = Vec::new();
    for handle in handles {
        names.push(handle.await.unwrap().unwrap().bucket_name);
    }
    names.sort();
    names.dedup();

    assert_eq!(names.len(), 16);
    assert_eq!(harness.namespace.names().len(), 16);
}
