//! Adapters for the domain ports: local stores, the HTTP gateway and the reachability probe.

pub mod file;
pub mod http;
pub mod in_memory;
pub mod probe;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
