//! # gitsync store client
//!
//! The key-value side of gitsync: a small [`StoreClient`] trait with the
//! create/set/delete semantics the reconciler relies on, an etcd v3
//! implementation and an in-memory one.

pub mod error;
pub mod etcd;
pub mod memory;
pub mod traits;

pub use error::StoreError;
pub use etcd::{EtcdClient, EtcdConfig};
pub use memory::MemoryStore;
pub use traits::StoreClient;
