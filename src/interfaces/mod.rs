//! Edge adapters for moving payments in and out of the queue.

pub mod csv;
