//! Item-by-item lazy reader over any of the three buffer backends
//! (spec §4.8), plus the `closed -> open -> (seek|read|iterate)* ->
//! close -> closed` lifecycle from spec §4.9.
//!
//! Grounded on `npy.hpp`'s streaming `from_npy_callback` overloads, but
//! restructured as a stateful, re-seekable reader object rather than a
//! one-shot callback driver — the callback-driven free functions in
//! [`super`] cover the "drive it once, start to finish" use case; this
//! type covers "open it, then seek/view/iterate at will".

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::{Detail, NpyError, Status};
use crate::layout;
use crate::storage::{Backend, BufferBackend, FileBackend, Whence};

#[cfg(feature = "mmap")]
use crate::storage::MmapBackend;

use super::header::Header;

/// Which backend a [`NpyReader`] was opened against, mirroring spec
/// §4.4's three buffer backends. Chosen at `open` time; `view` is only
/// zero-copy for `Buffer`/`Mmap`.
enum BackendKind {
    Buffer(BufferBackend),
    File(FileBackend),
    #[cfg(feature = "mmap")]
    Mmap(MmapBackend),
}

impl BackendKind {
    fn as_backend_mut(&mut self) -> &mut dyn Backend {
        match self {
            BackendKind::Buffer(b) => b,
            BackendKind::File(b) => b,
            #[cfg(feature = "mmap")]
            BackendKind::Mmap(b) => b,
        }
    }

    fn as_backend(&self) -> &dyn Backend {
        match self {
            BackendKind::Buffer(b) => b,
            BackendKind::File(b) => b,
            #[cfg(feature = "mmap")]
            BackendKind::Mmap(b) => b,
        }
    }

    /// `Whence::Start(0)` means different things depending on the
    /// backend: `Buffer`/`File` hold the whole stream including the
    /// header, so the payload starts at `data_offset`; `Mmap` is already
    /// payload-relative (its own cursor is offset from
    /// `payload_offset`, not from file offset 0). This returns the
    /// absolute seek target for item `item_index` under each backend's
    /// own origin.
    fn item_seek_target(&self, item_index: usize, item_size: usize, data_offset: usize) -> u64 {
        match self {
            BackendKind::Buffer(_) | BackendKind::File(_) => (data_offset + item_index * item_size) as u64,
            #[cfg(feature = "mmap")]
            BackendKind::Mmap(_) => (item_index * item_size) as u64,
        }
    }
}

/// Backend selection for [`NpyReader::open_with`], matching spec
/// §4.4's three buffer backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendChoice {
    Buffer,
    Stream,
    #[cfg(feature = "mmap")]
    Mmap,
}

struct OpenState {
    header: Header,
    backend: BackendKind,
    item_index: usize,
    item_size: usize,
    n_items: usize,
}

/// A seekable, iterable item-by-item reader. `closed` is the absence of
/// an `OpenState`; `open` twice is idempotent (close-and-reopen), per
/// spec §4.9.
pub struct NpyReader {
    state: Option<OpenState>,
}

impl Default for NpyReader {
    fn default() -> Self {
        Self::new()
    }
}

impl NpyReader {
    pub fn new() -> Self {
        NpyReader { state: None }
    }

    /// Opens `path` with the buffered backend (the default). Closes any
    /// previously open stream first.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<Status, NpyError> {
        self.open_with(path, BackendChoice::Buffer)
    }

    pub fn open_with<P: AsRef<Path>>(&mut self, path: P, choice: BackendChoice) -> Result<Status, NpyError> {
        self.close();
        let path: PathBuf = path.as_ref().to_path_buf();
        let (header, warnings, backend) = match choice {
            BackendChoice::Buffer => {
                let mut bytes = Vec::new();
                File::open(&path).map_err(NpyError::from)?.read_to_end(&mut bytes).map_err(NpyError::from)?;
                let (header, warnings) = Header::read(&bytes[..])?;
                let mut buffer = BufferBackend::new(bytes);
                buffer.seek(Whence::Start(header.data_offset as u64)).map_err(NpyError::from)?;
                (header, warnings, BackendKind::Buffer(buffer))
            }
            BackendChoice::Stream => {
                // Read the header directly off the unbuffered file so the
                // OS cursor lands exactly at the payload — a BufReader
                // here would read ahead and strand bytes when handed off.
                let mut file = File::open(&path).map_err(NpyError::from)?;
                let (header, warnings) = Header::read(&mut file)?;
                (header, warnings, BackendKind::File(FileBackend::new(file)))
            }
            #[cfg(feature = "mmap")]
            BackendChoice::Mmap => {
                let file = File::open(&path).map_err(NpyError::from)?;
                let mut header_reader = BufReader::new(file.try_clone().map_err(NpyError::from)?);
                let (header, warnings) = Header::read(&mut header_reader)?;
                let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| NpyError::io(Status::MMAP_FAILED, e))?;
                (header, warnings, BackendKind::Mmap(MmapBackend::new(mmap, header.data_offset)))
            }
        };

        let item_size = header.dtype.item_size as usize;
        let n_items = layout::element_count(&header.shape);
        log::debug!(
            "npy reader opened: shape={:?} order={:?} item_size={} backend={:?}",
            header.shape,
            header.order,
            item_size,
            choice
        );
        self.state = Some(OpenState { header, backend, item_index: 0, item_size, n_items });
        Ok(warnings)
    }

    pub fn close(&mut self) {
        self.state = None;
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    pub fn header(&self) -> Option<&Header> {
        self.state.as_ref().map(|s| &s.header)
    }

    fn state_mut(&mut self) -> Result<&mut OpenState, NpyError> {
        self.state.as_mut().ok_or_else(|| NpyError::with_detail(Status::READER_NOT_OPEN, Detail::ReaderNotOpen))
    }

    /// Positions the cursor at `data_offset + item_index * item_size`.
    /// `Buffer`/`File` backends hold the stream from file offset 0 (the
    /// header included) and so need `data_offset` added; `Mmap` is
    /// already payload-relative. See [`BackendKind::item_seek_target`].
    pub fn seek_item(&mut self, item_index: usize) -> Result<(), NpyError> {
        let state = self.state_mut()?;
        let target = state.backend.item_seek_target(item_index, state.item_size, state.header.data_offset);
        state.backend.as_backend_mut().seek(Whence::Start(target)).map_err(NpyError::from)?;
        state.item_index = item_index;
        Ok(())
    }

    /// Reads one item's raw bytes at the current cursor, advancing past
    /// it. `None` at a clean EOF.
    pub fn next_item_bytes(&mut self) -> Result<Option<Vec<u8>>, NpyError> {
        let state = self.state_mut()?;
        if state.item_index >= state.n_items {
            return Ok(None);
        }
        let mut buf = vec![0u8; state.item_size];
        let backend = state.backend.as_backend_mut();
        let mut filled = 0;
        while filled < buf.len() {
            let n = backend.read(&mut buf[filled..]).map_err(NpyError::from)?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        if filled < state.item_size {
            return Err(NpyError::with_detail(Status::TRUNCATED, Detail::FileTruncated));
        }
        state.item_index += 1;
        Ok(Some(buf))
    }

    /// Reads one item at the current cursor as `T`, without advancing.
    /// Panics if `size_of::<T>()` doesn't match the item size.
    pub fn view<T: Copy>(&mut self) -> Result<T, NpyError> {
        let item_index = self.state.as_ref().map(|s| s.item_index).unwrap_or(0);
        let state = self.state_mut()?;
        assert_eq!(std::mem::size_of::<T>(), state.item_size, "T size does not match item_size");
        if let Some(view) = state.backend.as_backend().view(state.item_size) {
            let value = unsafe { std::ptr::read_unaligned(view.as_ptr() as *const T) };
            return Ok(value);
        }
        // Streaming backend: fall back to a read-then-seek-back.
        let bytes = self.next_item_bytes()?.ok_or_else(|| NpyError::new(Status::TRUNCATED))?;
        self.seek_item(item_index)?;
        Ok(unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const T) })
    }

    /// An iterator over every item's raw bytes, from the current cursor
    /// through the end of the array, in ascending flat-index order.
    pub fn items(&mut self) -> ItemBytesIter<'_> {
        ItemBytesIter { reader: self }
    }

    /// A typed iterator. Panics on the first `.next()` call if
    /// `size_of::<T>()` doesn't match the item size.
    pub fn typed_items<T: Copy>(&mut self) -> TypedItemsIter<'_, T> {
        TypedItemsIter { reader: self, _marker: std::marker::PhantomData }
    }
}

pub struct ItemBytesIter<'a> {
    reader: &'a mut NpyReader,
}

impl<'a> Iterator for ItemBytesIter<'a> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        self.reader.next_item_bytes().ok().flatten()
    }
}

pub struct TypedItemsIter<'a, T> {
    reader: &'a mut NpyReader,
    _marker: std::marker::PhantomData<T>,
}

impl<'a, T: Copy> Iterator for TypedItemsIter<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let bytes = self.reader.next_item_bytes().ok().flatten()?;
        assert_eq!(bytes.len(), std::mem::size_of::<T>(), "T size does not match item_size");
        Some(unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const T) })
    }
}
