/// Owns the memory-mapped file backing a queue: header validation, the
/// advisory creation lock, and the mutable mapping shared by the ring buffer.
use std::cell::UnsafeCell;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use fs4::fs_std::FileExt;
use memmap2::MmapMut;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::format::Header;

/// A mutable memory mapping shared between the container and the ring
/// buffer's atomic views. The mapping is never resized after creation, and
/// all interior mutation goes through atomics or offsets the ring buffer
/// owns exclusively, so sharing it across threads is sound.
pub struct SharedMapping {
    inner: UnsafeCell<MmapMut>,
}

// SAFETY: `MmapMut` is `Send`. We grant `Sync` because all concurrent access
// to the mapped bytes after creation goes through atomic operations on
// 8-byte-aligned control-block words (see `ring.rs`), or through
// non-overlapping slot regions whose ownership is established by the ring
// buffer's claim protocol.
unsafe impl Sync for SharedMapping {}

impl SharedMapping {
    fn new(mmap: MmapMut) -> Self {
        Self {
            inner: UnsafeCell::new(mmap),
        }
    }

    /// Raw pointer to the start of the mapping. Callers must respect the
    /// aliasing discipline described on the struct.
    pub fn as_mut_ptr(&self) -> *mut u8 {
        unsafe { (*self.inner.get()).as_mut_ptr() }
    }

    pub fn len(&self) -> usize {
        unsafe { (*self.inner.get()).len() }
    }

    pub fn flush(&self) -> Result<()> {
        unsafe { (*self.inner.get()).flush() }.map_err(Error::Io)
    }

    pub fn flush_async(&self) -> Result<()> {
        unsafe { (*self.inner.get()).flush_async() }.map_err(Error::Io)
    }
}

/// The file-backed container: a validated header plus the mapping it
/// describes.
pub struct FileContainer {
    _file: File,
    header: Header,
    mapping: Arc<SharedMapping>,
}

impl FileContainer {
    /// Create a new file with the given geometry.
    ///
    /// If `overwrite` is `false`, fails with [`Error::AlreadyExists`] when a
    /// file is already present at `path`. If `overwrite` is `true`, an
    /// existing file is truncated and replaced with the new header and a
    /// freshly zeroed data region.
    ///
    /// Holds an advisory exclusive lock on the file for the duration of
    /// header initialisation, so two processes racing to create the same
    /// path don't interleave writes to the header region. `sync_on_create`
    /// gates whether the freshly written header is flushed to disk before
    /// returning.
    pub fn create(
        path: impl AsRef<Path>,
        schema_id: u64,
        capacity: u32,
        slot_size: u32,
        overwrite: bool,
        sync_on_create: bool,
    ) -> Result<Self> {
        let path = path.as_ref();
        let mut options = OpenOptions::new();
        options.read(true).write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let file = options.open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                Error::AlreadyExists(path.display().to_string())
            } else {
                Error::Io(e)
            }
        })?;

        FileExt::try_lock_exclusive(&file).map_err(|_| Error::LockUnavailable)?;
        debug!(path = %path.display(), capacity, slot_size, overwrite, "creating new queue file");

        let header = Header::new(schema_id, capacity, slot_size);
        file.set_len(header.length())?;

        let mut mmap = unsafe { MmapMut::map_mut(&file)? };
        mmap[..header.data_offset() as usize].copy_from_slice(&header.encode());
        // The control block and all slots start zeroed by virtue of
        // `set_len` following a zero-length file (whether freshly created or
        // just truncated); this is what makes the in-memory
        // "uninitialised ⇒ 0" convention hold without an explicit
        // zero-fill pass.
        if sync_on_create {
            mmap.flush()?;
        }

        FileExt::unlock(&file).ok();

        Ok(Self {
            _file: file,
            header,
            mapping: Arc::new(SharedMapping::new(mmap)),
        })
    }

    /// Open an existing file if its geometry matches, or create it fresh if
    /// it doesn't exist yet. Fails with `GeometryMismatch` rather than
    /// silently adopting the file's existing geometry. `schema_id` is not
    /// checked against an existing file here; it is caller-verified (see
    /// [`Error::SchemaMismatch`]'s documentation), not enforced by the core.
    pub fn create_compatible(
        path: impl AsRef<Path>,
        schema_id: u64,
        capacity: u32,
        slot_size: u32,
        sync_on_create: bool,
    ) -> Result<Self> {
        let path = path.as_ref();
        match Self::open(path) {
            Ok(container) => {
                let header = container.header();
                if header.capacity() != capacity || header.slot_size() != slot_size {
                    return Err(Error::GeometryMismatch {
                        file_capacity: header.capacity(),
                        file_slot_size: header.slot_size(),
                        requested_capacity: capacity,
                        requested_slot_size: slot_size,
                    });
                }
                Ok(container)
            }
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::create(path, schema_id, capacity, slot_size, false, sync_on_create)
            }
            Err(other) => Err(other),
        }
    }

    /// Open an existing file, fully validating its header (magic, version,
    /// checksum, recorded length against the real file size).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let metadata = file.metadata()?;
        let actual_len = metadata.len();
        if actual_len < crate::format::HEADER_SIZE as u64 {
            return Err(Error::FileTruncated {
                expected: crate::format::HEADER_SIZE as u64,
                actual: actual_len,
            });
        }

        let mmap = unsafe { MmapMut::map_mut(&file)? };
        let header = Header::decode(&mmap[..crate::format::HEADER_SIZE as usize])?;
        header.validate_length(actual_len)?;

        debug!(
            path = %path.display(),
            capacity = header.capacity(),
            slot_size = header.slot_size(),
            schema_id = header.schema_id(),
            "opened existing queue file"
        );

        Ok(Self {
            _file: file,
            header,
            mapping: Arc::new(SharedMapping::new(mmap)),
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn mapping(&self) -> Arc<SharedMapping> {
        Arc::clone(&self.mapping)
    }

    /// The ring buffer's data region, starting at `header.data_offset()`.
    pub fn data_buffer(&self) -> (*mut u8, usize) {
        let ptr = unsafe { self.mapping.as_mut_ptr().add(self.header.data_offset() as usize) };
        let len = self.mapping.len() - self.header.data_offset() as usize;
        (ptr, len)
    }

    pub fn flush(&self) -> Result<()> {
        self.mapping.flush().map_err(|e| {
            warn!(error = %e, "flush failed");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_then_open_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.mmqf");

        {
            let container = FileContainer::create(&path, 7, 4, 16, false, true).unwrap();
            assert_eq!(container.header().capacity(), 4);
            assert_eq!(container.header().slot_size(), 16);
        }

        let reopened = FileContainer::open(&path).unwrap();
        assert_eq!(reopened.header().schema_id(), 7);
        assert_eq!(reopened.header().capacity(), 4);
    }

    #[test]
    fn create_without_overwrite_rejects_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.mmqf");
        FileContainer::create(&path, 1, 2, 8, false, true).unwrap();

        let result = FileContainer::create(&path, 1, 2, 8, false, true);
        assert!(matches!(result, Err(Error::AlreadyExists(_))));
    }

    #[test]
    fn create_with_overwrite_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.mmqf");
        {
            let container = FileContainer::create(&path, 1, 4, 8, false, true).unwrap();
            assert_eq!(container.header().capacity(), 4);
        }

        let replaced = FileContainer::create(&path, 2, 8, 16, true, true).unwrap();
        assert_eq!(replaced.header().schema_id(), 2);
        assert_eq!(replaced.header().capacity(), 8);
        assert_eq!(replaced.header().slot_size(), 16);
    }

    #[test]
    fn create_compatible_creates_when_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.mmqf");
        let container = FileContainer::create_compatible(&path, 1, 8, 32, true).unwrap();
        assert_eq!(container.header().capacity(), 8);
    }

    #[test]
    fn create_compatible_rejects_geometry_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.mmqf");
        FileContainer::create(&path, 1, 8, 32, false, true).unwrap();

        let result = FileContainer::create_compatible(&path, 1, 16, 32, true);
        assert!(matches!(result, Err(Error::GeometryMismatch { .. })));
    }

    #[test]
    fn create_compatible_ignores_schema_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.mmqf");
        FileContainer::create(&path, 1, 8, 32, false, true).unwrap();

        // schema_id is caller-verified, not enforced by the core; only
        // capacity/slot_size are checked against the existing file.
        let container = FileContainer::create_compatible(&path, 2, 8, 32, true).unwrap();
        assert_eq!(container.header().schema_id(), 1);
    }

    #[test]
    fn open_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.mmqf");
        assert!(matches!(FileContainer::open(&path), Err(Error::Io(_))));
    }

    #[test]
    fn open_detects_truncated_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.mmqf");
        FileContainer::create(&path, 1, 4, 8, false, true).unwrap();

        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(crate::format::HEADER_SIZE as u64).unwrap();

        let result = FileContainer::open(&path);
        assert!(matches!(result, Err(Error::FileTruncated { .. })));
    }
}
