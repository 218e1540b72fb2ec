use std::{cell::Cell, ptr::NonNull};

use crate::ledger;

/// Shared bookkeeping of one ownership group.
///
/// Allocated once per group, separately from the managed object, and only
/// ever touched through the handles bound to it.
#[derive(Debug)]
pub(crate) struct ControlBlock
{
    strong: Cell<usize>,
    weak: Cell<usize>,
    releasing: Cell<bool>,
}

impl ControlBlock
{
    /// A fresh block owned by a single strong handle.
    pub(crate) fn allocate() -> NonNull<ControlBlock>
    {
        let block = NonNull::from(Box::leak(Box::new(ControlBlock {
            strong: Cell::new(1),
            weak: Cell::new(0),
            releasing: Cell::new(false),
        })));
        ledger::block_allocated();
        log::trace!("allocated control block {:p}", block);
        block
    }

    /// Caller guarantees both counts are zero and no handle refers to the
    /// block afterwards.
    pub(crate) unsafe fn release(block: NonNull<ControlBlock>)
    {
        debug_assert!(block.as_ref().is_unreferenced());
        log::trace!("releasing control block {:p}", block);
        drop(Box::from_raw(block.as_ptr()));
        ledger::block_released();
    }

    pub(crate) fn strong(&self) -> usize { self.strong.get() }

    pub(crate) fn weak(&self) -> usize { self.weak.get() }

    pub(crate) fn is_expired(&self) -> bool { self.strong() == 0 }

    /// Both counts are zero and no object release is in progress.
    pub(crate) fn is_unreferenced(&self) -> bool
    {
        self.strong() == 0 && self.weak() == 0 && !self.releasing.get()
    }

    /// Set while the object's destructor runs. Keeps the block alive without
    /// showing up in either count.
    pub(crate) fn set_releasing(&self, releasing: bool) { self.releasing.set(releasing) }

    #[inline]
    pub(crate) fn inc_strong(&self)
    {
        // zero means the object is already gone
        let strong = self.strong();
        if strong == 0 || strong == usize::MAX {
            panic!("strong count increment on a control block with strong count {}", strong);
        }
        self.strong.set(strong + 1);
    }

    #[inline]
    pub(crate) fn inc_weak(&self)
    {
        let weak = self.weak();
        if weak == usize::MAX {
            panic!("weak count overflow");
        }
        self.weak.set(weak + 1);
    }

    /// Returns the count after decrementing.
    #[inline]
    pub(crate) fn dec_strong(&self) -> usize
    {
        let strong = self
            .strong()
            .checked_sub(1)
            .unwrap_or_else(|| panic!("strong count underflow"));
        self.strong.set(strong);
        strong
    }

    /// Returns the count after decrementing.
    #[inline]
    pub(crate) fn dec_weak(&self) -> usize
    {
        let weak = self
            .weak()
            .checked_sub(1)
            .unwrap_or_else(|| panic!("weak count underflow"));
        self.weak.set(weak);
        weak
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn counts_start_at_one_strong()
    {
        let block = ControlBlock::allocate();
        let b = unsafe { block.as_ref() };
        assert_eq!((b.strong(), b.weak()), (1, 0));

        b.inc_weak();
        b.inc_strong();
        assert_eq!((b.strong(), b.weak()), (2, 1));

        assert_eq!(b.dec_strong(), 1);
        assert_eq!(b.dec_strong(), 0);
        assert!(b.is_expired());
        assert!(!b.is_unreferenced());

        assert_eq!(b.dec_weak(), 0);
        assert!(b.is_unreferenced());

        b.set_releasing(true);
        assert!(!b.is_unreferenced());
        b.set_releasing(false);
        unsafe { ControlBlock::release(block) };
    }

    #[test]
    #[should_panic]
    fn no_resurrection()
    {
        let block = ControlBlock::allocate();
        let b = unsafe { block.as_ref() };
        b.dec_strong();
        b.inc_strong();
    }
}
