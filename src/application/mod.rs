//! Application layer: the offline queue and the connectivity signal it reacts to.
//!
//! `OfflineQueue` owns the store and gateway ports and runs sync passes behind an
//! atomic idle/syncing flag. `ConnectivityTracker` fans connectivity transitions
//! out to listeners such as the automatic reconnect sync.

pub mod connectivity;
pub mod queue;
