//! The handle union and its ownership state machine.

use std::fmt;
use std::io::{self, Read, Write};
use std::mem;
use std::os::raw::c_int;
use std::path::Path;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::scoped::ScopedHandle;
use crate::sys;
use crate::types::{Disposition, HandleKind, OpenFlags, SharePolicy, StreamMode};

#[derive(Clone, Copy)]
enum Repr {
    Invalid,
    Descriptor(c_int),
    Native(sys::RawNative),
    Stream(sys::Stream),
}

impl Repr {
    fn kind(&self) -> HandleKind {
        match self {
            Repr::Invalid => HandleKind::Invalid,
            Repr::Descriptor(_) => HandleKind::RawDescriptor,
            Repr::Native(_) => HandleKind::NativeHandle,
            Repr::Stream(_) => HandleKind::Stream,
        }
    }
}

/// One open file, held as exactly one of a raw descriptor, a native handle or
/// a stdio stream.
///
/// The union owns the OS resource. Conversions hand ownership from one
/// representation to the next without duplicating it, and every failed open,
/// conversion or close leaves the union [`HandleKind::Invalid`].
///
/// Dropping a live union does **not** close it; the resource leaks and a
/// warning is logged. Close explicitly, or wrap it with
/// [`scoped`](HandleUnion::scoped).
///
/// # Example
///
/// ```no_run
/// use std::io::Write;
/// use handles::{HandleKind, HandleUnion};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut handle = HandleUnion::new();
/// handle.open_stream("t.txt", "w")?;
/// handle.write_all(b"hello")?;
///
/// handle.stream_to_descriptor()?;
/// handle.descriptor_to_native()?;
/// handle.close_native()?;
/// assert_eq!(handle.kind(), HandleKind::Invalid);
/// # Ok(())
/// # }
/// ```
pub struct HandleUnion {
    repr: Repr,
}

impl HandleUnion {
    /// Create an invalid union.
    pub const fn new() -> Self {
        Self {
            repr: Repr::Invalid,
        }
    }

    /// Which representation is currently held.
    pub fn kind(&self) -> HandleKind {
        self.repr.kind()
    }

    /// Whether a resource is held.
    pub fn is_live(&self) -> bool {
        self.kind().is_live()
    }

    /// Close automatically when the returned guard goes out of scope.
    pub fn scoped(self) -> ScopedHandle {
        ScopedHandle::new(self)
    }

    fn ensure_closed(&self) -> Result<()> {
        match self.kind() {
            HandleKind::Invalid => Ok(()),
            kind => Err(Error::AlreadyOpen(kind)),
        }
    }

    /// Leave the union invalid and return what it held.
    fn take(&mut self) -> Repr {
        mem::replace(&mut self.repr, Repr::Invalid)
    }

    /// Put back a representation taken by mistake.
    fn restore(&mut self, repr: Repr, expected: HandleKind) -> Error {
        self.repr = repr;
        Error::WrongKind {
            expected,
            actual: repr.kind(),
        }
    }

    // ---------------------------------------------------------------------
    // Open
    // ---------------------------------------------------------------------

    /// Open `path` as a C runtime descriptor.
    ///
    /// `perms` are the permission bits used when the file is created.
    pub fn open_descriptor<P: AsRef<Path>>(
        &mut self,
        path: P,
        flags: OpenFlags,
        share: SharePolicy,
        perms: u32,
    ) -> Result<()> {
        self.ensure_closed()?;
        let path = path.as_ref();
        flags.validate()?;

        let fd = sys::open_descriptor(path, flags, share, perms)
            .map_err(|source| open_error(HandleKind::RawDescriptor, path, source))?;
        self.repr = Repr::Descriptor(fd);
        debug!("opened {} as raw descriptor {}", path.display(), fd);
        Ok(())
    }

    /// Open `path` as a native handle with read and write access.
    ///
    /// With `shared` unset no other opener may read, write or delete the
    /// file while the handle is live.
    pub fn open_native<P: AsRef<Path>>(
        &mut self,
        path: P,
        disposition: Disposition,
        shared: bool,
    ) -> Result<()> {
        self.ensure_closed()?;
        let path = path.as_ref();

        let native = sys::open_native(path, disposition, shared)
            .map_err(|source| open_error(HandleKind::NativeHandle, path, source))?;
        self.repr = Repr::Native(native);
        debug!(
            "opened {} as native handle ({:?}, shared: {})",
            path.display(),
            disposition,
            shared
        );
        Ok(())
    }

    /// Open `path` as a stdio stream with an `fopen` mode such as `"rb"`.
    pub fn open_stream<P: AsRef<Path>>(&mut self, path: P, mode: &str) -> Result<()> {
        self.ensure_closed()?;
        let path = path.as_ref();
        let mode: StreamMode = mode.parse()?;

        let stream = sys::open_stream(path, &mode)
            .map_err(|source| open_error(HandleKind::Stream, path, source))?;
        self.repr = Repr::Stream(stream);
        debug!("opened {} as stream ({})", path.display(), mode);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Close
    //
    // The union goes invalid before the OS call and stays invalid even when
    // the call fails. A failed close is never retried.
    // ---------------------------------------------------------------------

    /// Close a raw descriptor.
    pub fn close_descriptor(&mut self) -> Result<()> {
        let fd = match self.take() {
            Repr::Descriptor(fd) => fd,
            other => return Err(self.restore(other, HandleKind::RawDescriptor)),
        };
        debug!("closing raw descriptor {}", fd);
        sys::close_descriptor(fd).map_err(|source| close_error(HandleKind::RawDescriptor, source))
    }

    /// Close a native handle.
    pub fn close_native(&mut self) -> Result<()> {
        let native = match self.take() {
            Repr::Native(native) => native,
            other => return Err(self.restore(other, HandleKind::NativeHandle)),
        };
        debug!("closing native handle");
        sys::close_native(native).map_err(|source| close_error(HandleKind::NativeHandle, source))
    }

    /// Close a stream, flushing its buffers.
    pub fn close_stream(&mut self) -> Result<()> {
        let stream = match self.take() {
            Repr::Stream(stream) => stream,
            other => return Err(self.restore(other, HandleKind::Stream)),
        };
        debug!("closing stream");
        sys::close_stream(stream).map_err(|source| close_error(HandleKind::Stream, source))
    }

    /// Close whichever representation is held.
    pub fn close(&mut self) -> Result<()> {
        match self.kind() {
            HandleKind::Invalid => Err(Error::NotOpen),
            HandleKind::RawDescriptor => self.close_descriptor(),
            HandleKind::NativeHandle => self.close_native(),
            HandleKind::Stream => self.close_stream(),
        }
    }

    // ---------------------------------------------------------------------
    // Conversions
    //
    // On failure the consumed representation is released and the union is
    // left invalid.
    // ---------------------------------------------------------------------

    /// Replace the stream with the descriptor underneath it.
    ///
    /// The stream is flushed first. Its descriptor is not duplicated: any copy
    /// of the stream kept elsewhere dies with the descriptor.
    pub fn stream_to_descriptor(&mut self) -> Result<()> {
        let stream = match self.take() {
            Repr::Stream(stream) => stream,
            other => return Err(self.restore(other, HandleKind::Stream)),
        };

        match sys::stream_descriptor(stream) {
            Ok(fd) => {
                self.repr = Repr::Descriptor(fd);
                debug!("stream -> raw descriptor {}", fd);
                Ok(())
            }
            Err(source) => {
                let _ = sys::close_stream(stream);
                Err(convert_error(HandleKind::Stream, HandleKind::RawDescriptor, source))
            }
        }
    }

    /// Associate a stream with the descriptor, using an `fdopen` mode.
    ///
    /// The mode must be compatible with the descriptor's access mode.
    pub fn descriptor_to_stream(&mut self, mode: &str) -> Result<()> {
        let fd = match self.take() {
            Repr::Descriptor(fd) => fd,
            other => return Err(self.restore(other, HandleKind::RawDescriptor)),
        };

        let stream = mode
            .parse::<StreamMode>()
            .and_then(|mode| {
                sys::descriptor_stream(fd, &mode).map_err(|source| {
                    convert_error(HandleKind::RawDescriptor, HandleKind::Stream, source)
                })
            });
        match stream {
            Ok(stream) => {
                self.repr = Repr::Stream(stream);
                debug!("raw descriptor {} -> stream ({})", fd, mode);
                Ok(())
            }
            Err(err) => {
                let _ = sys::close_descriptor(fd);
                Err(err)
            }
        }
    }

    /// Replace the native handle with a descriptor over the same file.
    ///
    /// Only the access, append and text/binary bits of `flags` are meaningful
    /// here; on Unix only `APPEND` can still be changed.
    pub fn native_to_descriptor(&mut self, flags: OpenFlags) -> Result<()> {
        let native = match self.take() {
            Repr::Native(native) => native,
            other => return Err(self.restore(other, HandleKind::NativeHandle)),
        };

        let fd = flags.validate().and_then(|()| {
            sys::native_descriptor(native, flags).map_err(|source| {
                convert_error(HandleKind::NativeHandle, HandleKind::RawDescriptor, source)
            })
        });
        match fd {
            Ok(fd) => {
                self.repr = Repr::Descriptor(fd);
                debug!("native handle -> raw descriptor {}", fd);
                Ok(())
            }
            Err(err) => {
                let _ = sys::close_native(native);
                Err(err)
            }
        }
    }

    /// Replace the descriptor with the native handle underneath it.
    pub fn descriptor_to_native(&mut self) -> Result<()> {
        let fd = match self.take() {
            Repr::Descriptor(fd) => fd,
            other => return Err(self.restore(other, HandleKind::RawDescriptor)),
        };

        match sys::descriptor_native(fd) {
            Ok(native) => {
                self.repr = Repr::Native(native);
                debug!("raw descriptor {} -> native handle", fd);
                Ok(())
            }
            Err(source) => {
                let _ = sys::close_descriptor(fd);
                Err(convert_error(HandleKind::RawDescriptor, HandleKind::NativeHandle, source))
            }
        }
    }
}

fn open_error(kind: HandleKind, path: &Path, source: io::Error) -> Error {
    Error::Open {
        kind,
        path: path.to_path_buf(),
        source,
    }
}

fn close_error(kind: HandleKind, source: io::Error) -> Error {
    Error::Close { kind, source }
}

fn convert_error(from: HandleKind, to: HandleKind, source: io::Error) -> Error {
    Error::Convert { from, to, source }
}

impl Default for HandleUnion {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandleUnion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleUnion")
            .field("kind", &self.kind())
            .finish()
    }
}

impl Drop for HandleUnion {
    fn drop(&mut self) {
        if self.is_live() {
            warn!("{} dropped without being closed; the OS resource leaks", self.kind());
        }
    }
}

// Read and write go straight to whichever representation is live.
impl Read for HandleUnion {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.repr {
            Repr::Invalid => Err(Error::NotOpen.into()),
            Repr::Descriptor(fd) => sys::read_descriptor(fd, buf),
            Repr::Native(native) => sys::native_file(native).read(buf),
            Repr::Stream(stream) => sys::read_stream(stream, buf),
        }
    }
}

impl Write for HandleUnion {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.repr {
            Repr::Invalid => Err(Error::NotOpen.into()),
            Repr::Descriptor(fd) => sys::write_descriptor(fd, buf),
            Repr::Native(native) => sys::native_file(native).write(buf),
            Repr::Stream(stream) => sys::write_stream(stream, buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.repr {
            Repr::Invalid => Err(Error::NotOpen.into()),
            Repr::Descriptor(_) | Repr::Native(_) => Ok(()),
            Repr::Stream(stream) => sys::flush_stream(stream),
        }
    }
}

// Moving the union moves sole ownership of the resource with it.
unsafe impl Send for HandleUnion {}
