//! Periodically force deletes pods stuck in Terminating.
//!
//! A pod qualifies once it has been terminating for longer than its own
//! termination grace period plus a configurable extra period. Its finalizers
//! are cleared (unless disabled) and it is deleted with a zero grace period.
//! Static pods are never touched.

pub mod actions;
pub mod clock;
pub mod cluster;
pub mod config;
pub mod control_loop;
pub mod enumerator;
pub mod evaluator;
pub mod shutdown;

#[cfg(test)]
mod mock;
