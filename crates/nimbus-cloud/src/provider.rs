//! Naming authority trait definitions

use crate::error::Result;
use async_trait::async_trait;

/// Answers whether a resource name is already taken.
///
/// Storage providers (object storage buckets, blob containers, etc.)
/// implement this against their own namespace. Scope of "taken" (global,
/// per-account, per-region) is the provider's business.
#[async_trait]
pub trait ExistenceOracle: Send + Sync {
    /// Returns `true` if `name` is already in use
    async fn exists(&self, name: &str) -> Result<bool>;
}

/// Claims a resource name by creating the resource behind it.
#[async_trait]
pub trait Creator: Send + Sync {
    /// Create the resource named `name`.
    ///
    /// Providers return [`CloudError::AlreadyExists`](crate::CloudError::AlreadyExists)
    /// when another writer claimed the name between the existence check and
    /// this call.
    async fn create(&self, name: &str) -> Result<()>;
}

/// A provider that can both answer existence queries and create resources
pub trait Namespace: ExistenceOracle + Creator {}

impl<T: ExistenceOracle + Creator> Namespace for T {}

