//! Type definitions and enums.

use std::ffi::{CStr, CString};
use std::fmt;
use std::fs::OpenOptions;
use std::str::FromStr;

use bitflags::bitflags;

use crate::error::{Error, Result};

/// Which representation a [`HandleUnion`](crate::HandleUnion) currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HandleKind {
    /// No resource.
    #[default]
    Invalid,
    /// A C runtime file descriptor.
    RawDescriptor,
    /// A native OS handle (`HANDLE` on Windows, the kernel descriptor on Unix).
    NativeHandle,
    /// A buffered stdio `FILE*` stream.
    Stream,
}

impl HandleKind {
    /// Whether this kind carries a resource.
    pub const fn is_live(self) -> bool {
        !matches!(self, HandleKind::Invalid)
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandleKind::Invalid => "invalid handle",
            HandleKind::RawDescriptor => "raw descriptor",
            HandleKind::NativeHandle => "native handle",
            HandleKind::Stream => "stream",
        })
    }
}

bitflags! {
    /// Descriptor-level open flags.
    ///
    /// Read-only is the empty set. `TEXT` and `BINARY` only matter to the
    /// Windows C runtime and are accepted and ignored on Unix.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OpenFlags: u32 {
        /// Write only.
        const WRITE_ONLY = 1 << 0;
        /// Read and write.
        const READ_WRITE = 1 << 1;
        /// Every write goes to the end of the file.
        const APPEND = 1 << 2;
        /// Create if not exists.
        const CREATE = 1 << 3;
        /// Truncate to zero.
        const TRUNCATE = 1 << 4;
        /// Exclusive create (fail if exists).
        const EXCLUSIVE = 1 << 5;
        /// Translate line endings.
        const TEXT = 1 << 6;
        /// No translation.
        const BINARY = 1 << 7;
    }
}

impl OpenFlags {
    /// Read only.
    pub const READ_ONLY: Self = Self::empty();

    /// Whether the flags grant write access.
    pub fn is_writable(self) -> bool {
        self.intersects(Self::WRITE_ONLY | Self::READ_WRITE)
    }

    /// Reject combinations the C runtimes refuse or leave undefined.
    pub fn validate(self) -> Result<()> {
        if self.contains(Self::WRITE_ONLY | Self::READ_WRITE) {
            return Err(Error::InvalidFlags("write-only and read-write are exclusive"));
        }
        if self.contains(Self::TEXT | Self::BINARY) {
            return Err(Error::InvalidFlags("text and binary are exclusive"));
        }
        if self.contains(Self::EXCLUSIVE) && !self.contains(Self::CREATE) {
            return Err(Error::InvalidFlags("exclusive requires create"));
        }
        if self.contains(Self::TRUNCATE) && !self.is_writable() {
            return Err(Error::InvalidFlags("truncate requires write access"));
        }
        if self.contains(Self::APPEND) && !self.is_writable() {
            return Err(Error::InvalidFlags("append requires write access"));
        }
        Ok(())
    }
}

/// Who else may open the file while this handle is live.
///
/// On Unix this is enforced with a non-blocking advisory `flock`, so only
/// cooperating openers are excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SharePolicy {
    /// Others may read, write and delete.
    #[default]
    DenyNone,
    /// Others may only read.
    DenyWrite,
    /// No concurrent access.
    DenyAll,
}

impl SharePolicy {
    /// Map the native-handle `shared` switch onto a policy.
    pub const fn from_shared(shared: bool) -> Self {
        if shared {
            SharePolicy::DenyNone
        } else {
            SharePolicy::DenyAll
        }
    }
}

/// Open-time policy on whether the file must or may already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Create; fail if the file exists.
    CreateNew,
    /// Create, truncating any existing file.
    CreateAlways,
    /// Open; fail if the file does not exist.
    OpenExisting,
    /// Open, creating the file if missing.
    OpenAlways,
    /// Open and truncate; fail if the file does not exist.
    TruncateExisting,
}

impl Disposition {
    /// Native handles are always opened read+write.
    pub(crate) fn open_options(self) -> OpenOptions {
        let mut opts = OpenOptions::new();
        opts.read(true).write(true);
        match self {
            Disposition::CreateNew => opts.create_new(true),
            Disposition::CreateAlways => opts.create(true).truncate(true),
            Disposition::OpenExisting => &mut opts,
            Disposition::OpenAlways => opts.create(true),
            Disposition::TruncateExisting => opts.truncate(true),
        };
        opts
    }

    /// Whether opening discards existing contents.
    pub fn truncates(self) -> bool {
        matches!(self, Disposition::CreateAlways | Disposition::TruncateExisting)
    }
}

/// Primary access of a stdio mode string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamAccess {
    /// `r`
    Read,
    /// `w`
    Write,
    /// `a`
    Append,
}

/// A validated `fopen`/`fdopen` mode string such as `"r"`, `"wb"` or `"a+"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMode {
    access: StreamAccess,
    update: bool,
    binary: Option<bool>,
    exclusive: bool,
    raw: CString,
}

impl StreamMode {
    /// Primary access.
    pub fn access(&self) -> StreamAccess {
        self.access
    }

    /// Whether `+` was given.
    pub fn is_update(&self) -> bool {
        self.update
    }

    /// `Some(true)` for `b`, `Some(false)` for `t`, `None` when unspecified.
    pub fn binary(&self) -> Option<bool> {
        self.binary
    }

    /// Whether `x` was given.
    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    /// The mode as handed to the C runtime.
    pub fn as_c_str(&self) -> &CStr {
        &self.raw
    }

    /// Equivalent options for platforms that open the file through std first.
    #[cfg_attr(unix, allow(dead_code))]
    pub(crate) fn open_options(&self) -> OpenOptions {
        let mut opts = OpenOptions::new();
        match self.access {
            StreamAccess::Read => opts.read(true).write(self.update),
            StreamAccess::Write => opts.write(true).read(self.update).create(true).truncate(true),
            StreamAccess::Append => opts.append(true).read(self.update).create(true),
        };
        if self.exclusive {
            opts.create_new(true);
        }
        opts
    }
}

/// `r`, `w` or `a`, then any of `+` and one of `b`/`t`, each at most once.
/// `x` is only allowed after `w` and must come last, as in C11.
impl FromStr for StreamMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidMode(s.to_string());

        let mut chars = s.chars();
        let access = match chars.next() {
            Some('r') => StreamAccess::Read,
            Some('w') => StreamAccess::Write,
            Some('a') => StreamAccess::Append,
            _ => return Err(invalid()),
        };

        let (mut update, mut binary, mut exclusive) = (false, None, false);
        for c in chars {
            if exclusive {
                return Err(invalid());
            }
            match c {
                '+' if !update => update = true,
                'b' if binary.is_none() => binary = Some(true),
                't' if binary.is_none() => binary = Some(false),
                'x' if !exclusive && access == StreamAccess::Write => exclusive = true,
                _ => return Err(invalid()),
            }
        }

        let raw = CString::new(s).map_err(|_| invalid())?;
        Ok(Self {
            access,
            update,
            binary,
            exclusive,
            raw,
        })
    }
}

impl fmt::Display for StreamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw.to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_validation() {
        assert!(OpenFlags::READ_ONLY.validate().is_ok());
        assert!((OpenFlags::READ_WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE)
            .validate()
            .is_ok());
        assert!((OpenFlags::WRITE_ONLY | OpenFlags::CREATE | OpenFlags::EXCLUSIVE)
            .validate()
            .is_ok());

        let rejected = [
            OpenFlags::WRITE_ONLY | OpenFlags::READ_WRITE,
            OpenFlags::TEXT | OpenFlags::BINARY,
            OpenFlags::WRITE_ONLY | OpenFlags::EXCLUSIVE,
            OpenFlags::TRUNCATE,
            OpenFlags::APPEND,
            OpenFlags::APPEND | OpenFlags::TEXT,
        ];
        for flags in rejected {
            assert!(
                matches!(flags.validate(), Err(Error::InvalidFlags(_))),
                "{:?} should be rejected",
                flags
            );
        }
    }

    #[test]
    fn test_stream_mode_parse() {
        let mode: StreamMode = "r".parse().unwrap();
        assert_eq!(mode.access(), StreamAccess::Read);
        assert!(!mode.is_update());
        assert_eq!(mode.binary(), None);

        let mode: StreamMode = "wb+".parse().unwrap();
        assert_eq!(mode.access(), StreamAccess::Write);
        assert!(mode.is_update());
        assert_eq!(mode.binary(), Some(true));
        assert_eq!(mode.to_string(), "wb+");

        for exclusive in ["wx", "wbx", "w+x", "wb+x", "w+bx"] {
            let mode: StreamMode = exclusive.parse().unwrap();
            assert!(mode.is_exclusive(), "{:?} should be exclusive", exclusive);
        }

        let mode: StreamMode = "at".parse().unwrap();
        assert_eq!(mode.access(), StreamAccess::Append);
        assert_eq!(mode.binary(), Some(false));
    }

    #[test]
    fn test_stream_mode_rejects() {
        for bad in ["", "z", "rw", "r++", "rbt", "rx", "ax", "r\0", "+r", "wxb", "wx+"] {
            assert!(
                matches!(bad.parse::<StreamMode>(), Err(Error::InvalidMode(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_share_policy_from_shared() {
        assert_eq!(SharePolicy::from_shared(true), SharePolicy::DenyNone);
        assert_eq!(SharePolicy::from_shared(false), SharePolicy::DenyAll);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(HandleKind::NativeHandle.to_string(), "native handle");
        assert!(!HandleKind::Invalid.is_live());
        assert!(HandleKind::Stream.is_live());
    }
}
