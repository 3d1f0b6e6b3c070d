//! Platform calls behind the handle union.
//!
//! Each function turns a C sentinel (`-1`, `NULL`, `INVALID_HANDLE_VALUE`)
//! into an `io::Result`. State transitions stay in [`crate::handle`].

use std::io;
use std::os::raw::c_int;
use std::ptr::NonNull;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::*;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use self::windows::*;

use crate::types::StreamMode;

/// An open stdio stream.
pub type Stream = NonNull<libc::FILE>;

/// Map the `-1` failure sentinel to the current OS error.
pub(crate) fn cvt(ret: c_int) -> io::Result<c_int> {
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

pub fn close_stream(stream: Stream) -> io::Result<()> {
    if unsafe { libc::fclose(stream.as_ptr()) } == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Flush `stream` and return the descriptor it sits on.
///
/// The `FILE` bookkeeping is never freed after this; the descriptor is the
/// only handle left to the resource.
pub fn stream_descriptor(stream: Stream) -> io::Result<c_int> {
    flush_stream(stream)?;
    cvt(unsafe { libc::fileno(stream.as_ptr()) })
}

pub fn descriptor_stream(fd: c_int, mode: &StreamMode) -> io::Result<Stream> {
    let stream = unsafe { libc::fdopen(fd, mode.as_c_str().as_ptr()) };
    NonNull::new(stream).ok_or_else(io::Error::last_os_error)
}

pub fn read_stream(stream: Stream, buf: &mut [u8]) -> io::Result<usize> {
    let n = unsafe { libc::fread(buf.as_mut_ptr().cast(), 1, buf.len(), stream.as_ptr()) };
    if n == 0 && !buf.is_empty() && unsafe { libc::ferror(stream.as_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(n)
}

pub fn write_stream(stream: Stream, buf: &[u8]) -> io::Result<usize> {
    let n = unsafe { libc::fwrite(buf.as_ptr().cast(), 1, buf.len(), stream.as_ptr()) };
    if n == 0 && !buf.is_empty() {
        return Err(io::Error::last_os_error());
    }
    Ok(n)
}

pub fn flush_stream(stream: Stream) -> io::Result<()> {
    if unsafe { libc::fflush(stream.as_ptr()) } == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
