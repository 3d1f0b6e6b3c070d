//! One owner for an open file across its three OS representations.
//!
//! A [`HandleUnion`] holds a file as exactly one of a C runtime descriptor, a
//! native OS handle or a buffered stdio stream, and converts between them
//! without ever owning two live representations of the same file:
//!
//! ```text
//!              open_descriptor            open_native
//!                    |                         |
//!                    v   descriptor_to_native  v
//!  stream <----> descriptor <-----------> native handle
//!    ^                    native_to_descriptor
//!    |
//!  open_stream
//! ```
//!
//! Every failed open, conversion or close leaves the union
//! [`HandleKind::Invalid`]. Nothing is closed implicitly on drop; use
//! [`HandleUnion::scoped`] for that.
//!
//! # Example
//!
//! ```no_run
//! use handles::{Disposition, HandleUnion, OpenFlags, SharePolicy};
//!
//! fn main() -> handles::Result<()> {
//!     let mut handle = HandleUnion::new();
//!     handle.open_native("data.bin", Disposition::OpenAlways, false)?;
//!
//!     // Hand the file to code that wants a FILE*.
//!     handle.native_to_descriptor(OpenFlags::READ_WRITE)?;
//!     handle.descriptor_to_stream("r+")?;
//!
//!     handle.close()?;
//!
//!     let mut log = HandleUnion::new();
//!     log.open_descriptor(
//!         "app.log",
//!         OpenFlags::WRITE_ONLY | OpenFlags::CREATE | OpenFlags::APPEND,
//!         SharePolicy::DenyWrite,
//!         0o644,
//!     )?;
//!     log.close()?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod handle;
pub mod scoped;
mod sys;
pub mod types;

// Re-export main types at the crate root
pub use error::{Error, Result};
pub use handle::HandleUnion;
pub use scoped::ScopedHandle;
pub use types::{Disposition, HandleKind, OpenFlags, SharePolicy, StreamAccess, StreamMode};

/// Library version constants.
pub mod version {
    /// Major version.
    pub const MAJOR: u32 = 0;
    /// Minor version.
    pub const MINOR: u32 = 1;
    /// Patch version.
    pub const PATCH: u32 = 0;
    /// Pre-release state.
    pub const STATE: &str = "alpha";
}

/// Get the version string (e.g., "0.1.0-alpha").
pub fn version_string() -> String {
    format!(
        "{}.{}.{}-{}",
        version::MAJOR,
        version::MINOR,
        version::PATCH,
        version::STATE
    )
}

/// Pack a version into one comparable integer: `major << 16 | minor << 8 | patch`.
pub const fn make_version(major: u32, minor: u32, patch: u32) -> u32 {
    (major << 16) | (minor << 8) | patch
}

/// This library's version packed with [`make_version`].
pub const fn version_number() -> u32 {
    make_version(version::MAJOR, version::MINOR, version::PATCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string() {
        assert_eq!(version_string(), "0.1.0-alpha");
    }

    #[test]
    fn test_make_version() {
        assert_eq!(make_version(0, 1, 0), 0x100);
        assert_eq!(make_version(1, 2, 3), 0x010203);
        assert!(make_version(1, 0, 0) > make_version(0, 255, 255));
        assert_eq!(version_number(), make_version(0, 1, 0));
    }
}
