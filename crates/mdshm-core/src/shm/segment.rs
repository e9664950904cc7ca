//! Named segment management: create, open read-only, unlink.
//!
//! On Linux this is POSIX shared memory (`shm_open` + `ftruncate` + `mmap`).
//! Other platforms get a file under the temp directory with the same
//! semantics, which is enough for development and tests.

use std::fs::File;

use memmap2::{Mmap, MmapMut};

use crate::error::{MdShmError, Result};

/// Normalise a segment name to the `/name` form `shm_open` expects.
pub fn normalize_name(name: &str) -> String {
    if name.starts_with('/') { name.to_string() } else { format!("/{name}") }
}

/// Create (or replace) the segment and map it read-write.
///
/// Any stale segment of the same name is unlinked first, so a previous run
/// with a different symbol set never leaks its layout into this one.
pub(crate) fn create(name: &str, size: usize) -> Result<MmapMut> {
    unlink(name)?;
    let file = open_file(name, true)?;

    let mapped = file
        .set_len(size as u64)
        .map_err(|e| MdShmError::Shm(format!("ftruncate {name} to {size} bytes failed: {e}")))
        .and_then(|_| {
            // SAFETY: the segment was just created by this process and is only
            // resized by it; other processes map it read-only.
            let map = unsafe { MmapMut::map_mut(&file) };
            map.map_err(|e| MdShmError::Shm(format!("mmap {name} failed: {e}")))
        });

    if mapped.is_err() {
        let _ = unlink(name);
    }
    mapped
}

/// Open an existing segment and map it read-only, sized from the object
/// itself rather than from any compile-time constant.
pub(crate) fn open_read_only(name: &str) -> Result<Mmap> {
    let file = open_file(name, false)?;
    let len = file.metadata()?.len();
    if len == 0 {
        return Err(MdShmError::Layout(format!("segment {name} is empty")));
    }
    // SAFETY: read-only mapping. The writer mutates the bytes concurrently;
    // callers copy out what they decode and tolerate torn contents.
    let map = unsafe { Mmap::map(&file) };
    map.map_err(|e| MdShmError::Shm(format!("mmap {name} failed: {e}")))
}

// ---------------------------------------------------------------------------
// Linux: POSIX shared memory
// ---------------------------------------------------------------------------

#[cfg(target_os = "linux")]
fn open_file(name: &str, create: bool) -> Result<File> {
    use std::ffi::CString;
    use std::os::fd::FromRawFd;

    let c_name = CString::new(name)
        .map_err(|_| MdShmError::Config(format!("segment name {name:?} contains NUL")))?;
    let flags = if create { libc::O_CREAT | libc::O_RDWR } else { libc::O_RDONLY };

    // SAFETY: c_name is a valid NUL-terminated string for the duration of the call.
    let fd = unsafe { libc::shm_open(c_name.as_ptr(), flags, 0o666) };
    if fd < 0 {
        let err = std::io::Error::last_os_error();
        return Err(if err.kind() == std::io::ErrorKind::NotFound {
            MdShmError::NotFound(name.to_string())
        } else {
            MdShmError::Shm(format!("shm_open {name} failed: {err}"))
        });
    }
    // SAFETY: fd is a freshly opened descriptor that nothing else owns.
    Ok(unsafe { File::from_raw_fd(fd) })
}

/// Remove the named segment. A missing segment is not an error.
#[cfg(target_os = "linux")]
pub(crate) fn unlink(name: &str) -> Result<()> {
    use std::ffi::CString;

    let c_name = CString::new(name)
        .map_err(|_| MdShmError::Config(format!("segment name {name:?} contains NUL")))?;
    // SAFETY: c_name is a valid NUL-terminated string.
    if unsafe { libc::shm_unlink(c_name.as_ptr()) } != 0 {
        let err = std::io::Error::last_os_error();
        if err.kind() != std::io::ErrorKind::NotFound {
            return Err(MdShmError::Shm(format!("shm_unlink {name} failed: {err}")));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Other platforms: file-backed fallback
// ---------------------------------------------------------------------------

#[cfg(not(target_os = "linux"))]
fn backing_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("mdshm{}", name.replace('/', "_")))
}

#[cfg(not(target_os = "linux"))]
fn open_file(name: &str, create: bool) -> Result<File> {
    let path = backing_path(name);
    let opened = if create {
        std::fs::OpenOptions::new().read(true).write(true).create(true).truncate(true).open(&path)
    } else {
        File::open(&path)
    };
    opened.map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            MdShmError::NotFound(name.to_string())
        } else {
            MdShmError::Shm(format!("open {} failed: {err}", path.display()))
        }
    })
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn unlink(name: &str) -> Result<()> {
    match std::fs::remove_file(backing_path(name)) {
        Err(err) if err.kind() != std::io::ErrorKind::NotFound => {
            Err(MdShmError::Shm(format!("remove segment {name} failed: {err}")))
        }
        _ => Ok(()),
    }
}
