use nimbus_cloud::InMemoryNamespace;
use nimbus_naming::{GeneratorConfig, ManualClock, NameGenerator, Strategy};
use std::sync::Arc;

/// インメモリ名前空間と手動時計につないだジェネレータ
pub struct TestHarness {
    pub namespace: Arc<InMemoryNamespace>,
    pub clock: Arc<ManualClock>,
    pub generator: NameGenerator,
}

impl TestHarness {
    pub fn new(strategy: Strategy) -> Self {
        Self::with_config(GeneratorConfig::default().with_strategy(strategy))
    }

    pub fn with_config(config: GeneratorConfig) -> Self {
        Self::with_namespace(config, InMemoryNamespace::new())
    }

    pub fn with_namespace(config: GeneratorConfig, namespace: InMemoryNamespace) -> Self {
        let namespace = Arc::new(namespace);
        let clock = Arc::new(ManualClock::default());
        let generator = NameGenerator::new(config)
            .unwrap()
            .with_namespace(Arc::clone(&namespace))
            .with_clock(clock.clone());
        Self {
            namespace,
            clock,
            generator,
        }
    }

    #[allow(dead_code)]
    pub fn oracle_calls(&self) -> usize {
        self.namespace.exists_calls() + self.namespace.create_calls()
    }
}

/// サニタイザの全分岐を通る入力
#[allow(dead_code)]
pub const AWKWARD_COMPONENTS: &[(&str, &str, &str)] = &[
    ("Prod_Account", "Data.Eng", "Analytics"),
    ("prod", "data", "config"),
    ("A", "b", "c"),
    ("--edge--", "__team__", "..cfg.."),
    ("Ünïcödé", "Team チーム", "moniker!"),
    ("s3", "xn--team", "s3alias"),
    ("192", "168", "1"),
    ("acct", "t-e-a-m", "m"),
];
