//! Store client trait definition.

use async_trait::async_trait;

use crate::error::StoreError;

/// A flat key-value namespace the repository is mirrored into.
///
/// Keys are repository paths used verbatim. Values are raw bytes.
///
/// # Implementors
///
/// - `EtcdClient` - etcd v3 through its JSON gateway
/// - `MemoryStore` - in-process map, for tests and dry runs
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Returns true if `key` is present.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Creates `key`.
    ///
    /// # Errors
    ///
    /// - `StoreError::KeyExists` if the key is already present
    async fn create(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Creates or overwrites `key`.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Removes `key`.
    ///
    /// # Errors
    ///
    /// - `StoreError::KeyNotFound` if the key is absent
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Returns the name of this store, for logging.
    fn name(&self) -> &str;
}
