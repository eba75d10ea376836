//! Nimbus Cloud naming authority
//!
//! This crate defines the narrow contract between the Nimbus naming core and
//! the storage providers that own a resource namespace.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  nimbus-naming                   │
//! │       (sanitize / validate / hash / retry)       │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                  nimbus-cloud                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   trait ExistenceOracle { exists() }      │   │
//! │  │   trait Creator { create() }              │   │
//! │  └──────────────────────────────────────────┘   │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │   provider    │ │   in-memory   │
//! │   adapters    │ │   namespace   │
//! └───────────────┘ └───────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod provider;

// Re-exports
pub use error::{CloudError, Result};
pub use memory::{InMemoryNamespace, NamespaceEntry, NamespaceSnapshot};
pub use provider::{Creator, ExistenceOracle, Namespace};
