use crate::{counter::ControlBlock, error::NullAccess, ledger};
use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    mem,
    ops::{Deref, DerefMut},
    ptr::{self, NonNull},
};

/// Exclusively owned allocation.
///
/// The only handle to its object, so it is neither `Clone` nor `Copy`:
/// duplicating it is a compile error rather than a runtime failure. Moving
/// it transfers ownership. A `Uniq` may also be empty, in which case
/// dereferencing it fails with [`NullAccess`].
///
/// ```
/// use sptr::Uniq;
///
/// let mut a = Uniq::new(String::from("hello"));
/// a.push_str(", world");
///
/// let b = a.take();
/// assert!(a.is_empty());
/// assert!(a.try_get().is_err());
/// assert_eq!(*b, "hello, world");
/// ```
pub struct Uniq<T>
{
    ptr: Option<NonNull<T>>,
    _phantom: PhantomData<T>,
}

unsafe impl<T: Send> Send for Uniq<T> {}
unsafe impl<T: Sync> Sync for Uniq<T> {}

#[allow(dead_code)]
impl<T> Uniq<T>
{
    /// Move `it` to the heap and own it.
    pub fn new(it: T) -> Self { Self::from(Box::new(it)) }

    /// A handle owning nothing.
    pub const fn empty() -> Self
    {
        Self {
            ptr: None,
            _phantom: PhantomData,
        }
    }

    /// Take ownership of a raw allocation. A null pointer yields an empty
    /// handle.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must come from `Box::into_raw` and must not be
    /// released or owned by anything else afterwards.
    pub unsafe fn from_raw(ptr: *mut T) -> Self
    {
        Self {
            ptr: NonNull::new(ptr),
            _phantom: PhantomData,
        }
    }

    pub fn is_empty(&self) -> bool { self.ptr.is_none() }

    /// Raw address of the owned object, null when empty.
    pub fn as_ptr(&self) -> *const T { self.ptr.map_or(ptr::null(), |p| p.as_ptr() as *const T) }

    pub fn try_get(&self) -> Result<&T, NullAccess>
    {
        match self.ptr {
            Some(p) => Ok(unsafe { p.as_ref() }),
            None => Err(NullAccess::new("Uniq")),
        }
    }

    pub fn try_get_mut(&mut self) -> Result<&mut T, NullAccess>
    {
        match self.ptr {
            Some(mut p) => Ok(unsafe { p.as_mut() }),
            None => Err(NullAccess::new("Uniq")),
        }
    }

    /// Move the owned object out, leaving this handle empty.
    pub fn take(&mut self) -> Self { mem::take(self) }

    /// Move-assignment: own whatever `other` owns, releasing the object
    /// previously owned here.
    pub fn assign(&mut self, other: Uniq<T>)
    {
        if self.ptr.is_some() && self.ptr == other.ptr {
            // two handles to one object can only come from `from_raw` misuse
            mem::forget(other);
            return;
        }
        *self = other;
    }

    /// Release the owned object, if any.
    pub fn reset(&mut self)
    {
        if let Some(p) = self.ptr.take() {
            log::trace!("releasing exclusive object {:p}", p);
            drop(unsafe { Box::from_raw(p.as_ptr()) });
            ledger::exclusive_released();
        }
    }

    /// Give up ownership without releasing the object.
    pub fn into_box(mut self) -> Option<Box<T>>
    {
        self.ptr
            .take()
            .map(|p| unsafe { Box::from_raw(p.as_ptr()) })
    }

    /// Give up ownership without releasing the object. Null when empty.
    pub fn into_raw(mut self) -> *mut T { self.ptr.take().map_or(ptr::null_mut(), NonNull::as_ptr) }

    /// Hand the object over to shared ownership.
    ///
    /// Also available as `From<Uniq<T>>` on `Shared`.
    pub fn decay(self) -> Shared<T>
    {
        match self.into_box() {
            Some(it) => Shared::from(it),
            None => Shared::empty(),
        }
    }
}

impl<T> Default for Uniq<T>
{
    fn default() -> Self { Self::empty() }
}

impl<T> From<Box<T>> for Uniq<T>
{
    fn from(it: Box<T>) -> Self
    {
        Self {
            ptr: Some(NonNull::from(Box::leak(it))),
            _phantom: PhantomData,
        }
    }
}

impl<T> Deref for Uniq<T>
{
    type Target = T;

    fn deref(&self) -> &Self::Target
    {
        match self.try_get() {
            Ok(it) => it,
            Err(e) => panic!("{}", e),
        }
    }
}

impl<T> DerefMut for Uniq<T>
{
    fn deref_mut(&mut self) -> &mut Self::Target
    {
        match self.try_get_mut() {
            Ok(it) => it,
            Err(e) => panic!("{}", e),
        }
    }
}

impl<T> Drop for Uniq<T>
{
    fn drop(&mut self) { self.reset() }
}

impl<T> fmt::Debug for Uniq<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Uniq").field("ptr", &self.as_ptr()).finish()
    }
}

impl<T: PartialEq> PartialEq for Uniq<T>
{
    fn eq(&self, other: &Self) -> bool { self.try_get().ok() == other.try_get().ok() }
}

impl<T: Eq> Eq for Uniq<T> {}

impl<T: PartialOrd> PartialOrd for Uniq<T>
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering>
    {
        self.try_get().ok().partial_cmp(&other.try_get().ok())
    }
}

impl<T: Ord> Ord for Uniq<T>
{
    fn cmp(&self, other: &Self) -> Ordering { self.try_get().ok().cmp(&other.try_get().ok()) }
}

impl<T: Hash> Hash for Uniq<T>
{
    fn hash<H: Hasher>(&self, state: &mut H) { self.try_get().ok().hash(state) }
}

/// An object and the control block of its ownership group.
///
/// Handles hold an `Option<Binding<T>>`, so a handle is either bound to both
/// or to neither.
struct Binding<T>
{
    object: NonNull<T>,
    block: NonNull<ControlBlock>,
}

impl<T> Clone for Binding<T>
{
    fn clone(&self) -> Self { *self }
}
impl<T> Copy for Binding<T> {}

impl<T> Binding<T>
{
    fn block(&self) -> &ControlBlock { unsafe { self.block.as_ref() } }

    /// Whether two optional bindings belong to the same ownership group.
    fn same_group(a: Option<Self>, b: Option<Self>) -> bool
    {
        a.map(|a| a.block) == b.map(|b| b.block)
    }

    /// Give up one strong reference.
    ///
    /// The last one releases the object. The block stays allocated until
    /// the object's destructor has returned (or unwound), so weak handles
    /// dropped from inside that destructor cannot release it underneath us.
    unsafe fn release_strong(self)
    {
        if self.block().dec_strong() == 0 {
            self.block().set_releasing(true);
            let _finish = FinishRelease(self);
            log::trace!("releasing shared object {:p}", self.object);
            drop(Box::from_raw(self.object.as_ptr()));
        }
    }

    /// Give up one weak reference. Never touches the object.
    unsafe fn release_weak(self)
    {
        self.block().dec_weak();
        self.release_block_if_unreferenced();
    }

    unsafe fn release_block_if_unreferenced(self)
    {
        if self.block().is_unreferenced() {
            ControlBlock::release(self.block);
        }
    }
}

/// Completes an object release once the object's destructor is done,
/// including when it panics.
struct FinishRelease<T>(Binding<T>);

impl<T> Drop for FinishRelease<T>
{
    fn drop(&mut self)
    {
        self.0.block().set_releasing(false);
        ledger::object_released();
        unsafe { self.0.release_block_if_unreferenced() }
    }
}

/// Shared ownership of a heap object.
///
/// Every bound `Shared` counts as one strong reference on the group's
/// control block. The object is released when the last one goes away; the
/// block outlives it for as long as [`Weak`] handles observe it.
///
/// Strong references that form a cycle keep each other alive forever.
/// Back-references (parent links, observers) must be `Weak`.
///
/// ```
/// use sptr::Shared;
///
/// let a = Shared::new(42);
/// let b = a.clone();
/// assert_eq!(a.strong_count(), 2);
///
/// drop(b);
/// assert_eq!(a.strong_count(), 1);
/// assert_eq!(*a, 42);
/// ```
pub struct Shared<T>
{
    binding: Option<Binding<T>>,
    _phantom: PhantomData<T>,
}

#[allow(dead_code)]
impl<T> Shared<T>
{
    /// Move `it` to the heap and start a new ownership group for it.
    pub fn new(it: T) -> Self { Self::from(Box::new(it)) }

    /// A handle bound to nothing.
    pub const fn empty() -> Self
    {
        Self {
            binding: None,
            _phantom: PhantomData,
        }
    }

    /// Start a new ownership group for a raw allocation. A null pointer
    /// yields an empty handle.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must come from `Box::into_raw` and must not be
    /// released or owned by anything else afterwards.
    pub unsafe fn from_raw(ptr: *mut T) -> Self
    {
        match NonNull::new(ptr) {
            Some(object) => Self::fresh(object),
            None => Self::empty(),
        }
    }

    fn fresh(object: NonNull<T>) -> Self
    {
        Self {
            binding: Some(Binding {
                object,
                block: ControlBlock::allocate(),
            }),
            _phantom: PhantomData,
        }
    }

    pub fn is_empty(&self) -> bool { self.binding.is_none() }

    /// Raw address of the managed object, null when empty.
    pub fn as_ptr(&self) -> *const T
    {
        self.binding
            .map_or(ptr::null(), |b| b.object.as_ptr() as *const T)
    }

    pub fn try_get(&self) -> Result<&T, NullAccess>
    {
        match self.binding {
            Some(b) => Ok(unsafe { b.object.as_ref() }),
            None => Err(NullAccess::new("Shared")),
        }
    }

    /// Number of `Shared` handles in this group, 0 when empty.
    pub fn strong_count(&self) -> usize { self.binding.map_or(0, |b| b.block().strong()) }

    /// Number of `Weak` handles in this group, 0 when empty.
    pub fn weak_count(&self) -> usize { self.binding.map_or(0, |b| b.block().weak()) }

    /// Whether both handles belong to the same ownership group. Two empty
    /// handles compare equal.
    pub fn ptr_eq(&self, other: &Shared<T>) -> bool
    {
        Binding::same_group(self.binding, other.binding)
    }

    /// Produce a weak handle to the same group.
    pub fn downgrade(&self) -> Weak<T> { Weak::from(self) }

    /// Copy-assignment.
    ///
    /// Within the same ownership group (including assigning a handle to a
    /// copy of itself) nothing changes. Otherwise the current binding is
    /// released and `other`'s is shared.
    pub fn assign(&mut self, other: &Shared<T>)
    {
        if self.ptr_eq(other) {
            return;
        }
        *self = other.clone();
    }

    /// Move-assignment: take over `other`'s binding, leaving it empty, and
    /// release the binding previously held here.
    pub fn assign_from(&mut self, other: &mut Shared<T>) { *self = other.take(); }

    /// Move the binding out, leaving this handle empty. No counts change.
    pub fn take(&mut self) -> Self { mem::take(self) }

    /// Release the current binding, if any, and become empty.
    pub fn reset(&mut self)
    {
        if let Some(b) = self.binding.take() {
            unsafe { b.release_strong() }
        }
    }

    /// Take the object back out of shared ownership.
    ///
    /// Succeeds only for the last strong handle of the group; outstanding
    /// weak handles become expired. Hands the handle back otherwise.
    pub fn try_into_inner(mut self) -> Result<T, Self>
    {
        let binding = self.binding;
        match binding {
            Some(b) if b.block().strong() == 1 => {
                self.binding = None;
                b.block().dec_strong();
                let it = unsafe { *Box::from_raw(b.object.as_ptr()) };
                ledger::object_released();
                unsafe { b.release_block_if_unreferenced() }
                Ok(it)
            }
            _ => Err(self),
        }
    }
}

impl<T> Default for Shared<T>
{
    fn default() -> Self { Self::empty() }
}

impl<T> From<Box<T>> for Shared<T>
{
    fn from(it: Box<T>) -> Self { Self::fresh(NonNull::from(Box::leak(it))) }
}

impl<T> From<Uniq<T>> for Shared<T>
{
    fn from(it: Uniq<T>) -> Self { it.decay() }
}

impl<T> From<&Weak<T>> for Shared<T>
{
    fn from(it: &Weak<T>) -> Self { it.lock() }
}

impl<T> Clone for Shared<T>
{
    fn clone(&self) -> Self
    {
        if let Some(b) = self.binding {
            b.block().inc_strong();
        }
        Self {
            binding: self.binding,
            _phantom: PhantomData,
        }
    }

    fn clone_from(&mut self, source: &Self) { self.assign(source) }
}

impl<T> Drop for Shared<T>
{
    fn drop(&mut self) { self.reset() }
}

impl<T> Deref for Shared<T>
{
    type Target = T;

    fn deref(&self) -> &Self::Target
    {
        match self.try_get() {
            Ok(it) => it,
            Err(e) => panic!("{}", e),
        }
    }
}

impl<T> fmt::Debug for Shared<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Shared")
            .field("ptr", &self.as_ptr())
            .field("strong", &self.strong_count())
            .field("weak", &self.weak_count())
            .finish()
    }
}

impl<T> fmt::Pointer for Shared<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::Pointer::fmt(&self.as_ptr(), f)
    }
}

impl<T: PartialEq> PartialEq for Shared<T>
{
    fn eq(&self, other: &Self) -> bool { self.try_get().ok() == other.try_get().ok() }
}

impl<T: Eq> Eq for Shared<T> {}

impl<T: PartialOrd> PartialOrd for Shared<T>
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering>
    {
        self.try_get().ok().partial_cmp(&other.try_get().ok())
    }
}

impl<T: Ord> Ord for Shared<T>
{
    fn cmp(&self, other: &Self) -> Ordering { self.try_get().ok().cmp(&other.try_get().ok()) }
}

impl<T: Hash> Hash for Shared<T>
{
    fn hash<H: Hasher>(&self, state: &mut H) { self.try_get().ok().hash(state) }
}

/// Weak reference to a shared object.
///
/// Keeps the control block of its group allocated but never the object.
/// Access goes through [`Weak::lock`], which yields an empty `Shared` once
/// the object is gone.
///
/// ```
/// use sptr::Shared;
///
/// let strong = Shared::new("x");
/// let weak = strong.downgrade();
/// assert_eq!(*weak.lock(), "x");
///
/// drop(strong);
/// assert!(weak.expired());
/// assert!(weak.lock().is_empty());
/// ```
pub struct Weak<T>
{
    binding: Option<Binding<T>>,
    _phantom: PhantomData<*const T>,
}

#[allow(dead_code)]
impl<T> Weak<T>
{
    /// A handle bound to nothing. Always expired.
    pub const fn new() -> Self
    {
        Self {
            binding: None,
            _phantom: PhantomData,
        }
    }

    pub fn is_empty(&self) -> bool { self.binding.is_none() }

    /// Whether the object is gone (or was never there).
    pub fn expired(&self) -> bool { self.binding.map_or(true, |b| b.block().is_expired()) }

    /// Promote to a strong handle.
    ///
    /// An expired handle yields an empty `Shared` and leaves all counts as
    /// they are.
    pub fn lock(&self) -> Shared<T>
    {
        match self.binding {
            Some(b) if !self.expired() => {
                b.block().inc_strong();
                Shared {
                    binding: Some(b),
                    _phantom: PhantomData,
                }
            }
            _ => Shared::empty(),
        }
    }

    /// Like [`Weak::lock`], with `None` in place of an empty handle.
    pub fn upgrade(&self) -> Option<Shared<T>>
    {
        let it = self.lock();
        if it.is_empty() {
            None
        } else {
            Some(it)
        }
    }

    /// Number of `Shared` handles in the observed group.
    pub fn strong_count(&self) -> usize { self.binding.map_or(0, |b| b.block().strong()) }

    /// Number of `Weak` handles in the observed group, this one included.
    pub fn weak_count(&self) -> usize { self.binding.map_or(0, |b| b.block().weak()) }

    pub fn ptr_eq(&self, other: &Weak<T>) -> bool
    {
        Binding::same_group(self.binding, other.binding)
    }

    /// Copy-assignment, guarded by group identity like [`Shared::assign`].
    pub fn assign(&mut self, other: &Weak<T>)
    {
        if self.ptr_eq(other) {
            return;
        }
        *self = other.clone();
    }

    /// Observe the group of `other` instead of the current one.
    pub fn assign_shared(&mut self, other: &Shared<T>)
    {
        if Binding::same_group(self.binding, other.binding) {
            return;
        }
        *self = Weak::from(other);
    }

    /// Move-assignment: take over `other`'s binding, leaving it empty.
    pub fn assign_from(&mut self, other: &mut Weak<T>) { *self = other.take(); }

    /// Move the binding out, leaving this handle empty. No counts change.
    pub fn take(&mut self) -> Self { mem::take(self) }

    /// Release the current binding, if any, and become empty.
    pub fn reset(&mut self)
    {
        if let Some(b) = self.binding.take() {
            unsafe { b.release_weak() }
        }
    }
}

impl<T> Default for Weak<T>
{
    fn default() -> Self { Self::new() }
}

impl<T> From<&Shared<T>> for Weak<T>
{
    fn from(it: &Shared<T>) -> Self
    {
        if let Some(b) = it.binding {
            b.block().inc_weak();
        }
        Self {
            binding: it.binding,
            _phantom: PhantomData,
        }
    }
}

impl<T> Clone for Weak<T>
{
    fn clone(&self) -> Self
    {
        if let Some(b) = self.binding {
            b.block().inc_weak();
        }
        Self {
            binding: self.binding,
            _phantom: PhantomData,
        }
    }

    fn clone_from(&mut self, source: &Self) { self.assign(source) }
}

impl<T> Drop for Weak<T>
{
    fn drop(&mut self) { self.reset() }
}

impl<T> fmt::Debug for Weak<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Weak")
            .field("expired", &self.expired())
            .field("strong", &self.strong_count())
            .field("weak", &self.weak_count())
            .finish()
    }
}
