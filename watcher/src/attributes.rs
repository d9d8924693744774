//! Extended attribute queries.

use std::path::Path;
use std::sync::Arc;

/// Attribute the backup service sets on excluded items.
pub const BACKUP_EXCLUDE_ATTRIBUTE: &str = "com.apple.metadata:com_apple_backup_excludeItem";

/// Read access to a file system's extended attributes.
pub trait AttributeStore: Send + Sync {
    /// Value of `name` on `path`, or `None` if absent or unreadable.
    fn get(&self, path: &Path, name: &str) -> Option<Vec<u8>>;
}

/// [`AttributeStore`] backed by `getxattr(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XattrStore;

#[cfg(any(target_os = "macos", target_os = "linux"))]
impl AttributeStore for XattrStore {
    fn get(&self, path: &Path, name: &str) -> Option<Vec<u8>> {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(path.as_os_str().as_bytes()).ok()?;
        let c_name = CString::new(name).ok()?;

        // Size first, then the value. The attribute can change between the
        // two calls; a short or failed second read is treated as absent.
        let len = sys::getxattr(&c_path, &c_name, &mut [])?;
        let mut buf = vec![0u8; len];
        let read = sys::getxattr(&c_path, &c_name, &mut buf)?;
        buf.truncate(read);
        Some(buf)
    }
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
impl AttributeStore for XattrStore {
    fn get(&self, _path: &Path, _name: &str) -> Option<Vec<u8>> {
        None
    }
}

#[cfg(any(target_os = "macos", target_os = "linux"))]
mod sys {
    use std::ffi::CStr;

    /// Returns the attribute size (empty `buf`) or bytes read.
    pub(super) fn getxattr(path: &CStr, name: &CStr, buf: &mut [u8]) -> Option<usize> {
        let (ptr, size) = if buf.is_empty() {
            (std::ptr::null_mut(), 0)
        } else {
            (buf.as_mut_ptr().cast::<libc::c_void>(), buf.len())
        };

        #[cfg(target_os = "macos")]
        // SAFETY: both strings are NUL-terminated and `ptr` is either null with
        // size 0 or points to `size` writable bytes.
        let ret = unsafe { libc::getxattr(path.as_ptr(), name.as_ptr(), ptr, size, 0, 0) };

        #[cfg(target_os = "linux")]
        // SAFETY: as above.
        let ret = unsafe { libc::getxattr(path.as_ptr(), name.as_ptr(), ptr, size) };

        usize::try_from(ret).ok()
    }
}

/// Answers whether a path already carries the backup exclusion attribute.
#[derive(Clone)]
pub struct ExclusionAttributeProbe {
    store: Arc<dyn AttributeStore>,
}

impl ExclusionAttributeProbe {
    /// Create a probe over an attribute store.
    pub fn new(store: Arc<dyn AttributeStore>) -> Self {
        Self { store }
    }

    /// True only if the attribute is present and non-empty.
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.store
            .get(path, BACKUP_EXCLUDE_ATTRIBUTE)
            .is_some_and(|value| !value.is_empty())
    }
}

impl std::fmt::Debug for ExclusionAttributeProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExclusionAttributeProbe").finish_non_exhaustive()
    }
}
