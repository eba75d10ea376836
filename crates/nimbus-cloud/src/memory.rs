//! In-memory naming authority
//!
//! Keeps the set of claimed names in process memory. Used as the test double
//! for the naming core and for local development where no real provider is
//! configured. Failure injection knobs let callers script transient outages
//! and creation races.

use crate::error::{CloudError, Result};
use crate::provider::{Creator, ExistenceOracle};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// A name claimed in the in-memory namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceEntry {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Point-in-time view of the namespace
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamespaceSnapshot {
    pub entries: Vec<NamespaceEntry>,
    pub exists_calls: usize,
    pub create_calls: usize,
}

#[derive(Debug, Default)]
struct Inner {
    names: BTreeMap<String, DateTime<Utc>>,
    everything_taken: bool,
    failing_exists: u32,
    timing_out_exists: u32,
    failing_creates: u32,
    racing_creates: u32,
    exists_log: Vec<String>,
    create_log: Vec<String>,
}

/// In-memory implementation of [`ExistenceOracle`] and [`Creator`]
#[derive(Debug, Default)]
pub struct InMemoryNamespace {
    inner: Mutex<Inner>,
}

impl InMemoryNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespace pre-populated with `names`
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ns = Self::new();
        for name in names {
            ns.reserve(name);
        }
        ns
    }

    /// Namespace that reports every name as taken
    pub fn fully_taken() -> Self {
        let ns = Self::new();
        ns.lock().everything_taken = true;
        ns
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking test holding the lock must not poison unrelated assertions
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mark `name` as taken without counting it as a creation
    pub fn reserve(&self, name: impl Into<String>) {
        self.lock().names.insert(name.into(), Utc::now());
    }

    /// Release a previously claimed name
    pub fn release(&self, name: &str) -> bool {
        self.lock().names.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        let inner = self.lock();
        inner.everything_taken || inner.names.contains_key(name)
    }

    /// Claimed names in lexical order
    pub fn names(&self) -> Vec<String> {
        self.lock().names.keys().cloned().collect()
    }

    /// Make the next `count` existence checks fail with [`CloudError::Unavailable`]
    pub fn fail_next_exists(&self, count: u32) {
        self.lock().failing_exists = count;
    }

    /// Make the next `count` existence checks fail with [`CloudError::Timeout`]
    pub fn time_out_next_exists(&self, count: u32) {
        self.lock().timing_out_exists = count;
    }

    /// Make the next `count` creations fail with [`CloudError::Unavailable`]
    pub fn fail_next_creates(&self, count: u32) {
        self.lock().failing_creates = count;
    }

    /// Make the next `count` creations lose a race to another writer.
    ///
    /// The name is claimed by the "other writer" and the call fails with
    /// [`CloudError::AlreadyExists`].
    pub fn race_next_creates(&self, count: u32) {
        self.lock().racing_creates = count;
    }

    /// Number of existence checks performed so far
    pub fn exists_calls(&self) -> usize {
        self.lock().exists_log.len()
    }

    /// Number of creation attempts performed so far
    pub fn create_calls(&self) -> usize {
        self.lock().create_log.len()
    }

    /// Names passed to `exists`, in call order
    pub fn exists_log(&self) -> Vec<String> {
        self.lock().exists_log.clone()
    }

    /// Names passed to `create`, in call order
    pub fn create_log(&self) -> Vec<String> {
        self.lock().create_log.clone()
    }

    pub fn snapshot(&self) -> NamespaceSnapshot {
        let inner = self.lock();
        NamespaceSnapshot {
            entries: inner
                .names
                .iter()
                .map(|(name, created_at)| NamespaceEntry {
                    name: name.clone(),
                    created_at: *created_at,
                })
                .collect(),
            exists_calls: inner.exists_log.len(),
            create_calls: inner.create_log.len(),
        }
    }

    /// Serialize the current snapshot as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }
}

#[async_trait]
impl ExistenceOracle for InMemoryNamespace {
    async fn exists(&self, name: &str) -> Result<bool> {
        let mut inner = self.lock();
        inner.exists_log.push(name.to_string());

        if inner.failing_exists > 0 {
            inner.failing_exists -= 1;
            tracing::debug!("Injected existence failure for {}", name);
            return Err(CloudError::Unavailable(format!(
                "existence check for {} failed",
                name
            )));
        }

        if inner.timing_out_exists > 0 {
            inner.timing_out_exists -= 1;
            tracing::debug!("Injected existence timeout for {}", name);
            return Err(CloudError::Timeout(format!(
                "existence check for {} timed out",
                name
            )));
        }

        Ok(inner.everything_taken || inner.names.contains_key(name))
    }
}

#[async_trait]
impl Creator for InMemoryNamespace {
    async fn create(&self, name: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.create_log.push(name.to_string());

        if inner.failing_creates > 0 {
            inner.failing_creates -= 1;
            tracing::debug!("Injected creation failure for {}", name);
            return Err(CloudError::Unavailable(format!("creation of {} failed", name)));
        }

        if inner.racing_creates > 0 {
            inner.racing_creates -= 1;
            inner.names.insert(name.to_string(), Utc::now());
            return Err(CloudError::AlreadyExists(name.to_string()));
        }

        if inner.everything_taken || inner.names.contains_key(name) {
            return Err(CloudError::AlreadyExists(name.to_string()));
        }

        inner.names.insert(name.to_string(), Utc::now());
        tracing::debug!("Claimed {} in memory namespace", name);
        Ok(())
    }
}
