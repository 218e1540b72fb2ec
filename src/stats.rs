/// Ownership bookkeeping, for diagnosing leaks and double releases.
///
/// Every control block allocation and every release performed by a handle
/// is counted here. A snapshot is cheap to take and compare.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats
{
    /// Control blocks handed out to new ownership groups.
    pub blocks_allocated: usize,

    /// Control blocks released after both counts reached zero.
    pub blocks_released: usize,

    /// Objects released by the last strong handle of their group.
    pub objects_released: usize,

    /// Objects released by an exclusive handle.
    pub exclusive_released: usize,
}

impl Stats
{
    /// Control blocks that are still allocated.
    pub fn live_blocks(&self) -> usize
    {
        self.blocks_allocated.saturating_sub(self.blocks_released)
    }

    /// Shared objects that are still alive.
    ///
    /// Each ownership group owns exactly one object, so this is the number
    /// of groups whose strong count has not yet reached zero.
    pub fn live_shared_objects(&self) -> usize
    {
        self.blocks_allocated.saturating_sub(self.objects_released)
    }

    /// Control blocks kept alive only by weak handles.
    pub fn expired_blocks(&self) -> usize
    {
        self.live_blocks().saturating_sub(self.live_shared_objects())
    }

    #[allow(dead_code)]
    pub(crate) fn merge(&mut self, other: &Stats)
    {
        self.blocks_allocated += other.blocks_allocated;
        self.blocks_released += other.blocks_released;
        self.objects_released += other.objects_released;
        self.exclusive_released += other.exclusive_released;
    }
}
