//! Deterministic ownership handles for heap objects.
//!
//! Three handle types cover the usual ownership shapes, without a garbage
//! collector and without matching every allocation to a manual release:
//!
//! - `Uniq` owns its object alone and cannot be duplicated.
//! - `Shared` shares ownership of an object with other `Shared` handles.
//!   The object is released when the last of them goes away.
//! - `Weak` observes a shared object without keeping it alive, and can be
//!   promoted back to a `Shared` while the object still exists.
//!
//! Shared and weak handles of one ownership group meet in a control block
//! holding a strong and a weak count. The object is released exactly once,
//! when the strong count drops to zero; the control block is released
//! exactly once, when both counts are zero.
//!
//! Counting is not atomic, so `Shared` and `Weak` stay on the thread that
//! created them. Cycles of `Shared` handles are never collected; break
//! them with `Weak` back-references.
//!
//! Every release is recorded in a per-thread ledger, readable through
//! [`thread_local_stats`]. With the `global` feature, ledgers of exited
//! threads are merged into a process-wide one, see `global_stats`.

pub(crate) mod counter;
pub(crate) mod ledger;
pub mod error;
pub mod pointers;
pub mod stats;


pub use error::NullAccess;
#[cfg(feature = "global")]
pub use ledger::global_stats;
pub use ledger::thread_local_stats;
pub use pointers::{Shared, Uniq, Weak};
pub use stats::Stats;
