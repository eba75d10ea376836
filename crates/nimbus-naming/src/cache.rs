//! 生成済み名前の結果キャッシュ
//!
//! `キャッシュキー -> GeneratedName` の容量付き LRU です。
//! 呼び出し元が作成してジェネレータに注入するため、寿命は呼び出し元が決めます。
//! アクセスはすべて1つのミューテックスを通ります。

use crate::model::GeneratedName;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// キャッシュされた生成結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub value: GeneratedName,
    pub inserted_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LruState {
    entries: HashMap<String, (u64, CacheEntry)>,
    /// 使用順のカウンタ -> キー（古い順）
    recency: BTreeMap<u64, String>,
    tick: u64,
}

impl LruState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn touch(&mut self, key: &str) -> Option<CacheEntry> {
        let tick = self.next_tick();
        let (old_tick, entry) = self.entries.get_mut(key)?;
        let previous = std::mem::replace(old_tick, tick);
        let entry = entry.clone();
        self.recency.remove(&previous);
        self.recency.insert(tick, key.to_string());
        Some(entry)
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.recency.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }
}

/// スレッドセーフな生成済み名前の LRU キャッシュ
#[derive(Debug)]
pub struct ResultCache {
    capacity: usize,
    state: Mutex<LruState>,
}

impl ResultCache {
    /// 最大 `capacity` 件を保持するキャッシュを作成。`0` で無効
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(LruState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `key` を引き、最近使用したものとして記録
    pub fn get(&self, key: &str) -> Option<GeneratedName> {
        self.lock().touch(key).map(|entry| entry.value)
    }

    /// 使用順を変えずにエントリ全体を参照
    pub fn peek(&self, key: &str) -> Option<CacheEntry> {
        self.lock().entries.get(key).map(|(_, entry)| entry.clone())
    }

    /// `key` を挿入または置換。満杯なら最も古いエントリを追い出す
    pub fn set(&self, key: impl Into<String>, value: GeneratedName) {
        if self.capacity == 0 {
            return;
        }

        let key = key.into();
        let mut state = self.lock();

        if let Some((old_tick, _)) = state.entries.remove(&key) {
            state.recency.remove(&old_tick);
        }

        while state.entries.len() >= self.capacity {
            match state.evict_oldest() {
                Some(evicted) => tracing::trace!("Evicted cached name for {:?}", evicted),
                None => break,
            }
        }

        let tick = state.next_tick();
        state.recency.insert(tick, key.clone());
        state.entries.insert(
            key.clone(),
            (
                tick,
                CacheEntry {
                    key,
                    value,
                    inserted_at: Utc::now(),
                },
            ),
        );
    }

    pub fn remove(&self, key: &str) -> Option<GeneratedName> {
        let mut state = self.lock();
        let (tick, entry) = state.entries.remove(key)?;
        state.recency.remove(&tick);
        Some(entry.value)
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.recency.clear();
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SanitizedComponents, StrategyTag};
    use std::sync::Arc;

    fn name(bucket: &str) -> GeneratedName {
        GeneratedName {
            bucket_name: bucket.to_string(),
            strategy_used: StrategyTag::Hash,
            created: false,
            sanitized: SanitizedComponents {
                account: "prod".into(),
                team: "data".into(),
                moniker: "config".into(),
            },
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_get_and_set() {
        let cache = ResultCache::new(4);
        assert!(cache.get("a").is_none());

        cache.set("a", name("bucket-a"));
        assert_eq!(cache.get("a").unwrap().bucket_name, "bucket-a");
        assert_eq!(cache.len(), 1);

        cache.set("a", name("bucket-a2"));
        assert_eq!(cache.get("a").unwrap().bucket_name, "bucket-a2");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = ResultCache::new(2);
        cache.set("a", name("bucket-a"));
        cache.set("b", name("bucket-b"));

        // "a" に触れたので "b" が追い出し対象になる
        assert!(cache.get("a").is_some());
        cache.set("c", name("bucket-c"));

        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_peek_does_not_refresh() {
        let cache = ResultCache::new(2);
        cache.set("a", name("bucket-a"));
        cache.set("b", name("bucket-b"));

        let entry = cache.peek("a").unwrap();
        assert_eq!(entry.key, "a");
        cache.set("c", name("bucket-c"));

        assert!(cache.peek("a").is_none());
        assert!(cache.peek("b").is_some());
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let cache = ResultCache::new(0);
        cache.set("a", name("bucket-a"));
        assert!(cache.is_empty());
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = ResultCache::new(3);
        cache.set("a", name("bucket-a"));
        cache.set("b", name("bucket-b"));

        assert_eq!(cache.remove("a").unwrap().bucket_name, "bucket-a");
        assert!(cache.remove("a").is_none());

        cache.clear();
        assert!(cache.is_empty());

        // clear 後も使用順の管理は壊れない
        cache.set("x", name("bucket-x"));
        cache.set("y", name("bucket-y"));
        cache.set("z", name("bucket-z"));
        cache.set("w", name("bucket-w"));
        assert_eq!(cache.len(), 3);
        assert!(cache.get("x").is_none());
    }

    #[tokio::test]
    async fn test_concurrent_access_stays_bounded() {
        let cache = Arc::new(ResultCache::new(16));
        let mut handles = Vec::new();

        for worker in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                for i in 0..200 {
                    let key = format!("{}-{}", worker, i % 32);
                    cache.set(key.clone(), name(&key));
                    if let Some(found) = cache.get(&key) {
                        assert_eq!(found.bucket_name, key);
                    }
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
        assert!(cache.len() <= 16);
    }
}
