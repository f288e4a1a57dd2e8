//! Mutating steps taken against a pod that overstayed its grace period.
//!
//! Removal is two independent calls: finalizers are cleared first, then the
//! pod is deleted with a zero grace period. If the process stops in between,
//! the next scan finds the pod without finalizers and simply deletes it.

pub mod finalizer;
pub mod force_delete;

pub use finalizer::FinalizerOutcome;
pub use finalizer::FinalizerRemover;
pub use force_delete::DeleteOutcome;
pub use force_delete::ForceDeleter;
