use std::cell::Cell;

#[cfg(feature = "global")]
use lazy_static::lazy_static;
#[cfg(feature = "global")]
use parking_lot::Mutex;

use crate::stats::Stats;

struct LocalLedger
{
    stats: Cell<Stats>,
}

thread_local! {
    static LEDGER : LocalLedger = LocalLedger { stats: Cell::new(Stats::default()) };
}

#[cfg(feature = "global")]
lazy_static! {
    static ref GLOBAL_LEDGER : Mutex<Stats> = Mutex::new(Stats::default());
}

impl LocalLedger
{
    fn update(&self, f: fn(&mut Stats))
    {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

impl Drop for LocalLedger
{
    fn drop(&mut self)
    {
        #[cfg(feature = "global")]
        {
            let stats = self.stats.get();
            log::debug!("merging thread ledger into global ledger: {:?}", stats);
            GLOBAL_LEDGER.lock().merge(&stats);
        }
    }
}

// Handles dropped during thread-local teardown may outlive the local
// ledger; their releases go straight to the global one.
fn record(f: fn(&mut Stats))
{
    if LEDGER.try_with(|ledger| ledger.update(f)).is_err() {
        #[cfg(feature = "global")]
        f(&mut GLOBAL_LEDGER.lock());
    }
}

pub(crate) fn block_allocated() { record(|s| s.blocks_allocated += 1) }
pub(crate) fn block_released() { record(|s| s.blocks_released += 1) }
pub(crate) fn object_released() { record(|s| s.objects_released += 1) }
pub(crate) fn exclusive_released() { record(|s| s.exclusive_released += 1) }

/// Snapshot of the bookkeeping done by the current thread.
pub fn thread_local_stats() -> Stats
{
    LEDGER
        .try_with(|ledger| ledger.stats.get())
        .unwrap_or_default()
}

/// Snapshot of the bookkeeping of all threads that have exited so far.
///
/// Threads merge their ledger into this one when their thread-local
/// storage is torn down; the current thread is not included.
#[cfg(feature = "global")]
pub fn global_stats() -> Stats { *GLOBAL_LEDGER.lock() }
