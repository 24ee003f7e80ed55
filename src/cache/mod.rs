//! Query cache shared by every panel of a session.
//!
//! This module provides a resource-agnostic cache that:
//! - Keys entries by endpoint path plus credential fingerprint
//! - Coalesces concurrent reads of one key into a single request
//! - Refetches in the background after invalidation, serving stale data meanwhile
//! - Lives in memory only; nothing is persisted

mod key;
mod layer;

pub use key::{ChecklistPath, QueryKey, Shape};
pub use layer::{QueryCache, Snapshot};
