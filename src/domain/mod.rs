//! Domain types and the ports the queue talks to.

pub mod payment;
pub mod ports;
pub mod submission;
