//! Opt-in close-on-drop guard.

use std::mem::{self, ManuallyDrop};
use std::ops::{Deref, DerefMut};

use log::warn;

use crate::handle::HandleUnion;

/// A [`HandleUnion`] that is closed when it goes out of scope.
///
/// Close errors on drop are logged and otherwise ignored. Call
/// [`close`](HandleUnion::close) explicitly to see them.
#[derive(Debug)]
pub struct ScopedHandle {
    inner: HandleUnion,
}

impl ScopedHandle {
    pub(crate) fn new(inner: HandleUnion) -> Self {
        Self { inner }
    }

    /// Disarm the guard and hand back the union, still open.
    pub fn into_inner(self) -> HandleUnion {
        let mut this = ManuallyDrop::new(self);
        mem::take(&mut this.inner)
    }
}

impl From<HandleUnion> for ScopedHandle {
    fn from(inner: HandleUnion) -> Self {
        Self::new(inner)
    }
}

impl Deref for ScopedHandle {
    type Target = HandleUnion;

    fn deref(&self) -> &HandleUnion {
        &self.inner
    }
}

impl DerefMut for ScopedHandle {
    fn deref_mut(&mut self) -> &mut HandleUnion {
        &mut self.inner
    }
}

impl Drop for ScopedHandle {
    fn drop(&mut self) {
        if self.inner.is_live() {
            if let Err(err) = self.inner.close() {
                warn!("scoped close failed: {}", err);
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::types::{Disposition, HandleKind};

    #[test]
    fn test_into_inner_keeps_resource_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kept.bin");

        let mut handle = HandleUnion::new();
        handle
            .open_native(&path, Disposition::CreateNew, true)
            .unwrap();

        let mut handle = handle.scoped().into_inner();
        assert_eq!(handle.kind(), HandleKind::NativeHandle);
        handle.close().unwrap();
    }

    #[test]
    fn test_scope_end_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locked.bin");

        {
            let mut first = HandleUnion::new().scoped();
            first
                .open_native(&path, Disposition::CreateNew, false)
                .unwrap();

            let mut second = HandleUnion::new();
            assert!(second
                .open_native(&path, Disposition::OpenExisting, false)
                .is_err());
            assert_eq!(second.kind(), HandleKind::Invalid);
        }

        let mut again = HandleUnion::new();
        again
            .open_native(&path, Disposition::OpenExisting, false)
            .expect("lock should be released when the guard drops");
        again.close().unwrap();
    }
}
