//! Windows: descriptors live in the C runtime table on top of Win32 handles.

use std::fs::{File, OpenOptions};
use std::io;
use std::mem::ManuallyDrop;
use std::os::raw::{c_int, c_uint};
use std::os::windows::fs::OpenOptionsExt;
use std::os::windows::io::{FromRawHandle, IntoRawHandle, RawHandle};
use std::path::Path;

use ::windows::Win32::Foundation::{CloseHandle, HANDLE};

use super::{cvt, descriptor_stream, Stream};
use crate::types::{Disposition, OpenFlags, SharePolicy, StreamAccess, StreamMode};

/// Native handle type.
pub type RawNative = RawHandle;

const FILE_SHARE_READ: u32 = 0x1;
const FILE_SHARE_WRITE: u32 = 0x2;
const FILE_SHARE_DELETE: u32 = 0x4;
const FILE_ATTRIBUTE_READONLY: u32 = 0x1;

fn share_mode(share: SharePolicy) -> u32 {
    match share {
        SharePolicy::DenyNone => FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE,
        SharePolicy::DenyWrite => FILE_SHARE_READ,
        SharePolicy::DenyAll => 0,
    }
}

fn crt_flags(flags: OpenFlags) -> c_int {
    let mut crt = if flags.contains(OpenFlags::READ_WRITE) {
        libc::O_RDWR
    } else if flags.contains(OpenFlags::WRITE_ONLY) {
        libc::O_WRONLY
    } else {
        libc::O_RDONLY
    };
    for (flag, bit) in [
        (OpenFlags::APPEND, libc::O_APPEND),
        (OpenFlags::TEXT, libc::O_TEXT),
        (OpenFlags::BINARY, libc::O_BINARY),
    ] {
        if flags.contains(flag) {
            crt |= bit;
        }
    }
    crt
}

fn stream_crt_flags(mode: &StreamMode) -> c_int {
    let mut crt = match (mode.access(), mode.is_update()) {
        (_, true) => libc::O_RDWR,
        (StreamAccess::Read, false) => libc::O_RDONLY,
        (_, false) => libc::O_WRONLY,
    };
    if mode.access() == StreamAccess::Append {
        crt |= libc::O_APPEND;
    }
    match mode.binary() {
        Some(true) => crt | libc::O_BINARY,
        Some(false) => crt | libc::O_TEXT,
        None => crt,
    }
}

/// Wrap `handle` in a new CRT descriptor, closing it if the CRT refuses.
fn adopt_handle(handle: RawHandle, crt: c_int) -> io::Result<c_int> {
    match cvt(unsafe { libc::open_osfhandle(handle as libc::intptr_t, crt) }) {
        Ok(fd) => Ok(fd),
        Err(err) => {
            let _ = close_native(handle);
            Err(err)
        }
    }
}

pub fn open_descriptor(
    path: &Path,
    flags: OpenFlags,
    share: SharePolicy,
    perms: u32,
) -> io::Result<c_int> {
    let mut opts = OpenOptions::new();
    opts.read(!flags.contains(OpenFlags::WRITE_ONLY))
        .write(flags.is_writable())
        .append(flags.contains(OpenFlags::APPEND))
        .share_mode(share_mode(share));
    if flags.contains(OpenFlags::EXCLUSIVE) {
        opts.create_new(true);
    } else {
        opts.create(flags.contains(OpenFlags::CREATE))
            .truncate(flags.contains(OpenFlags::TRUNCATE));
    }
    if flags.contains(OpenFlags::CREATE) && perms & 0o200 == 0 {
        opts.attributes(FILE_ATTRIBUTE_READONLY);
    }
    let handle = opts.open(path)?.into_raw_handle();
    adopt_handle(handle, crt_flags(flags))
}

pub fn open_native(path: &Path, disposition: Disposition, shared: bool) -> io::Result<RawNative> {
    let mut opts = disposition.open_options();
    opts.share_mode(share_mode(SharePolicy::from_shared(shared)));
    Ok(opts.open(path)?.into_raw_handle())
}

pub fn open_stream(path: &Path, mode: &StreamMode) -> io::Result<Stream> {
    let handle = mode.open_options().open(path)?.into_raw_handle();
    let fd = adopt_handle(handle, stream_crt_flags(mode))?;
    descriptor_stream(fd, mode).map_err(|err| {
        let _ = close_descriptor(fd);
        err
    })
}

pub fn close_descriptor(fd: c_int) -> io::Result<()> {
    cvt(unsafe { libc::close(fd) }).map(drop)
}

pub fn close_native(native: RawNative) -> io::Result<()> {
    unsafe { CloseHandle(HANDLE(native)) }.map_err(io::Error::from)
}

pub fn native_descriptor(native: RawNative, flags: OpenFlags) -> io::Result<c_int> {
    cvt(unsafe { libc::open_osfhandle(native as libc::intptr_t, crt_flags(flags)) })
}

pub fn descriptor_native(fd: c_int) -> io::Result<RawNative> {
    let handle = unsafe { libc::get_osfhandle(fd) };
    if handle == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(handle as RawNative)
    }
}

pub fn read_descriptor(fd: c_int, buf: &mut [u8]) -> io::Result<usize> {
    let len = buf.len().min(c_uint::MAX as usize) as c_uint;
    cvt(unsafe { libc::read(fd, buf.as_mut_ptr().cast(), len) }).map(|n| n as usize)
}

pub fn write_descriptor(fd: c_int, buf: &[u8]) -> io::Result<usize> {
    let len = buf.len().min(c_uint::MAX as usize) as c_uint;
    cvt(unsafe { libc::write(fd, buf.as_ptr().cast(), len) }).map(|n| n as usize)
}

/// Borrow a live native handle as a `File` that must never be dropped.
pub fn native_file(native: RawNative) -> ManuallyDrop<File> {
    ManuallyDrop::new(unsafe { File::from_raw_handle(native) })
}
