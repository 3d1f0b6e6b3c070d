//! Unix: the native handle is the kernel descriptor itself.

use std::ffi::CString;
use std::fs::File;
use std::io;
use std::mem::ManuallyDrop;
use std::os::raw::c_int;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::{AsRawFd, FromRawFd, IntoRawFd, RawFd};
use std::path::Path;
use std::ptr::NonNull;

use super::{cvt, Stream};
use crate::types::{Disposition, OpenFlags, SharePolicy, StreamMode};

/// Native handle type.
pub type RawNative = RawFd;

fn c_path(path: &Path) -> io::Result<CString> {
    CString::new(path.as_os_str().as_bytes()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "path contains an interior nul byte",
        )
    })
}

fn oflag(flags: OpenFlags) -> c_int {
    let mut oflag = if flags.contains(OpenFlags::READ_WRITE) {
        libc::O_RDWR
    } else if flags.contains(OpenFlags::WRITE_ONLY) {
        libc::O_WRONLY
    } else {
        libc::O_RDONLY
    };
    for (flag, bit) in [
        (OpenFlags::APPEND, libc::O_APPEND),
        (OpenFlags::CREATE, libc::O_CREAT),
        (OpenFlags::TRUNCATE, libc::O_TRUNC),
        (OpenFlags::EXCLUSIVE, libc::O_EXCL),
    ] {
        if flags.contains(flag) {
            oflag |= bit;
        }
    }
    oflag | libc::O_CLOEXEC
}

/// Share modes become a non-blocking advisory lock on the open file.
fn apply_share(fd: c_int, share: SharePolicy) -> io::Result<()> {
    let op = match share {
        SharePolicy::DenyNone => return Ok(()),
        SharePolicy::DenyWrite => libc::LOCK_SH,
        SharePolicy::DenyAll => libc::LOCK_EX,
    };
    cvt(unsafe { libc::flock(fd, op | libc::LOCK_NB) }).map(drop)
}

pub fn open_descriptor(
    path: &Path,
    flags: OpenFlags,
    share: SharePolicy,
    perms: u32,
) -> io::Result<c_int> {
    let path = c_path(path)?;
    // Truncation waits for the lock, so a refused open leaves the file intact.
    let deferred = share != SharePolicy::DenyNone && flags.contains(OpenFlags::TRUNCATE);
    let bits = oflag(flags.difference(if deferred {
        OpenFlags::TRUNCATE
    } else {
        OpenFlags::empty()
    }));

    let fd = cvt(unsafe { libc::open(path.as_ptr(), bits, perms as libc::c_uint) })?;
    let locked = apply_share(fd, share).and_then(|()| {
        if deferred {
            cvt(unsafe { libc::ftruncate(fd, 0) }).map(drop)
        } else {
            Ok(())
        }
    });
    if let Err(err) = locked {
        unsafe { libc::close(fd) };
        return Err(err);
    }
    Ok(fd)
}

pub fn open_native(path: &Path, disposition: Disposition, shared: bool) -> io::Result<RawNative> {
    let share = SharePolicy::from_shared(shared);
    let deferred = share != SharePolicy::DenyNone && disposition.truncates();
    let mut opts = disposition.open_options();
    if deferred {
        opts.truncate(false);
    }

    let file = opts.open(path)?;
    apply_share(file.as_raw_fd(), share)?;
    if deferred {
        file.set_len(0)?;
    }
    Ok(file.into_raw_fd())
}

pub fn open_stream(path: &Path, mode: &StreamMode) -> io::Result<Stream> {
    let path = c_path(path)?;
    let stream = unsafe { libc::fopen(path.as_ptr(), mode.as_c_str().as_ptr()) };
    NonNull::new(stream).ok_or_else(io::Error::last_os_error)
}

pub fn close_descriptor(fd: c_int) -> io::Result<()> {
    cvt(unsafe { libc::close(fd) }).map(drop)
}

pub fn close_native(native: RawNative) -> io::Result<()> {
    close_descriptor(native)
}

/// Only `APPEND` can be applied to an already open file; the rest of the
/// flags are fixed by how the handle was opened.
pub fn native_descriptor(native: RawNative, flags: OpenFlags) -> io::Result<c_int> {
    let status = cvt(unsafe { libc::fcntl(native, libc::F_GETFL) })?;
    if flags.contains(OpenFlags::APPEND) && status & libc::O_APPEND == 0 {
        cvt(unsafe { libc::fcntl(native, libc::F_SETFL, status | libc::O_APPEND) })?;
    }
    Ok(native)
}

pub fn descriptor_native(fd: c_int) -> io::Result<RawNative> {
    cvt(unsafe { libc::fcntl(fd, libc::F_GETFD) })?;
    Ok(fd)
}

pub fn read_descriptor(fd: c_int, buf: &mut [u8]) -> io::Result<usize> {
    let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
    if n < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(n as usize)
    }
}

pub fn write_descriptor(fd: c_int, buf: &[u8]) -> io::Result<usize> {
    let n = unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) };
    if n < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(n as usize)
    }
}

/// Borrow a live native handle as a `File` that must never be dropped.
pub fn native_file(native: RawNative) -> ManuallyDrop<File> {
    ManuallyDrop::new(unsafe { File::from_raw_fd(native) })
}
