use thiserror::Error;

/// Raised when an empty handle is dereferenced.
///
/// `Deref` on the handles panics with this message instead; the fallible
/// accessors (`try_get`, `try_get_mut`) hand it back as an error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("null access: dereferenced an empty `{handle}` handle")]
pub struct NullAccess
{
    handle: &'static str,
}

impl NullAccess
{
    #[cold]
    pub(crate) fn new(handle: &'static str) -> Self { Self { handle } }

    /// Name of the handle type that was dereferenced.
    pub fn handle(&self) -> &'static str { self.handle }
}
