//! Backing stores and buffer backends.
//!
//! Two related but distinct things live here, matching spec §4.4 and
//! §9's "Polymorphism over backing stores" design note:
//!
//! - [`Backend`]: the narrow `read/seek/view/eof` contract used by the
//!   npy reader to pull bytes from a buffered `Vec<u8>`, a streaming
//!   file, or a memory-mapped region, without caring which.
//! - [`Store`]: the tagged sum type an [`crate::ndarray::NdArray`] holds
//!   for its payload once constructed — owned bytes, a memory-mapped
//!   region, or a raw boxed allocation. Deliberately *not* a trait
//!   object: there's no shared behavior to dispatch polymorphically,
//!   only three release disciplines to pattern-match over.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};

#[cfg(feature = "mmap")]
use memmap2::Mmap;

/// Whence argument for [`Backend::seek`], mirroring `io::SeekFrom` but
/// kept as our own type so the trait doesn't leak `std::io` specifics
/// into callers that only ever seek by start/current/end.
#[derive(Debug, Clone, Copy)]
pub enum Whence {
    Start(u64),
    Current(i64),
    End(i64),
}

impl From<Whence> for SeekFrom {
    fn from(w: Whence) -> Self {
        match w {
            Whence::Start(n) => SeekFrom::Start(n),
            Whence::Current(n) => SeekFrom::Current(n),
            Whence::End(n) => SeekFrom::End(n),
        }
    }
}

/// The narrow read/seek/view/eof contract shared by every buffer
/// backend. `view` is only meaningfully zero-copy for buffer and mmap
/// backends; the streaming file backend returns `None`.
pub trait Backend {
    fn read(&mut self, dest: &mut [u8]) -> io::Result<usize>;
    fn seek(&mut self, whence: Whence) -> io::Result<u64>;
    fn view(&self, n: usize) -> Option<&[u8]>;
    fn eof(&self) -> bool;
}

/// A fully buffered in-memory source, the eager/default backend for
/// data handed in as a byte vector.
pub struct BufferBackend {
    data: Vec<u8>,
    cursor: usize,
}

impl BufferBackend {
    pub fn new(data: Vec<u8>) -> Self {
        BufferBackend { data, cursor: 0 }
    }
}

impl Backend for BufferBackend {
    fn read(&mut self, dest: &mut [u8]) -> io::Result<usize> {
        let available = &self.data[self.cursor..];
        let n = available.len().min(dest.len());
        dest[..n].copy_from_slice(&available[..n]);
        self.cursor += n;
        Ok(n)
    }

    fn seek(&mut self, whence: Whence) -> io::Result<u64> {
        let new_pos: i64 = match whence {
            Whence::Start(n) => n as i64,
            Whence::Current(n) => self.cursor as i64 + n,
            Whence::End(n) => self.data.len() as i64 + n,
        };
        if new_pos < 0 || new_pos as usize > self.data.len() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "seek out of bounds"));
        }
        self.cursor = new_pos as usize;
        Ok(self.cursor as u64)
    }

    fn view(&self, n: usize) -> Option<&[u8]> {
        self.data.get(self.cursor..self.cursor + n)
    }

    fn eof(&self) -> bool {
        self.cursor >= self.data.len()
    }
}

/// A streaming file-backed source. Unlike the buffer and mmap backends,
/// this one never returns a zero-copy view: `view` always returns
/// `None`, so the lazy reader falls back to a per-item `read` on this
/// backend (spec §4.4).
pub struct FileBackend {
    reader: BufReader<File>,
    eof: bool,
}

impl FileBackend {
    pub fn new(file: File) -> Self {
        FileBackend { reader: BufReader::new(file), eof: false }
    }
}

impl Backend for FileBackend {
    fn read(&mut self, dest: &mut [u8]) -> io::Result<usize> {
        let n = self.reader.read(dest)?;
        if n < dest.len() {
            self.eof = true;
        }
        Ok(n)
    }

    fn seek(&mut self, whence: Whence) -> io::Result<u64> {
        let pos = self.reader.seek(whence.into())?;
        self.eof = false;
        Ok(pos)
    }

    fn view(&self, _n: usize) -> Option<&[u8]> {
        None
    }

    fn eof(&self) -> bool {
        self.eof
    }
}

/// A memory-mapped source. `payload_offset` is the byte offset within
/// the mapping at which array data begins (the mapping itself always
/// starts at file offset 0, but the npy header precedes the payload).
#[cfg(feature = "mmap")]
pub struct MmapBackend {
    mmap: Mmap,
    payload_offset: usize,
    cursor: usize,
}

#[cfg(feature = "mmap")]
impl MmapBackend {
    pub fn new(mmap: Mmap, payload_offset: usize) -> Self {
        MmapBackend { mmap, payload_offset, cursor: 0 }
    }

    fn payload(&self) -> &[u8] {
        &self.mmap[self.payload_offset..]
    }
}

#[cfg(feature = "mmap")]
impl Backend for MmapBackend {
    fn read(&mut self, dest: &mut [u8]) -> io::Result<usize> {
        let available = &self.payload()[self.cursor..];
        let n = available.len().min(dest.len());
        dest[..n].copy_from_slice(&available[..n]);
        self.cursor += n;
        Ok(n)
    }

    fn seek(&mut self, whence: Whence) -> io::Result<u64> {
        let len = self.payload().len();
        let new_pos: i64 = match whence {
            Whence::Start(n) => n as i64,
            Whence::Current(n) => self.cursor as i64 + n,
            Whence::End(n) => len as i64 + n,
        };
        if new_pos < 0 || new_pos as usize > len {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "seek out of bounds"));
        }
        self.cursor = new_pos as usize;
        Ok(self.cursor as u64)
    }

    fn view(&self, n: usize) -> Option<&[u8]> {
        self.payload().get(self.cursor..self.cursor + n)
    }

    fn eof(&self) -> bool {
        self.cursor >= self.payload().len()
    }
}

/// The backing store an [`crate::ndarray::NdArray`] owns. A sum type,
/// not a trait object — see the module doc. Moves transfer the store;
/// there is no `Clone` impl, matching the "no copying, moves only"
/// memory-mapped lifetime rule.
pub enum Store {
    /// Heap-allocated, exclusively owned bytes.
    Owned(Vec<u8>),
    /// Memory-mapped region, read-only, released on drop.
    #[cfg(feature = "mmap")]
    Mmap { mmap: Mmap, payload_offset: usize },
    /// A raw boxed allocation with no `Vec` indirection (used when an
    /// array is constructed directly over bytes the caller already
    /// owns in a fixed-size buffer).
    Raw(Box<[u8]>),
}

impl Store {
    pub fn data_ptr(&self) -> *const u8 {
        self.data().as_ptr()
    }

    pub fn data_size(&self) -> usize {
        self.data().len()
    }

    pub fn data(&self) -> &[u8] {
        match self {
            Store::Owned(v) => v.as_slice(),
            #[cfg(feature = "mmap")]
            Store::Mmap { mmap, payload_offset } => &mmap[*payload_offset..],
            Store::Raw(b) => b.as_ref(),
        }
    }

    /// Mutable access to the bytes. Mmap-backed stores are read-only per
    /// spec §1's Non-goals and panic here — a caller hitting this has a
    /// contract bug (attempting to mutate a read-only array), not a
    /// recoverable I/O condition.
    pub fn data_mut(&mut self) -> &mut [u8] {
        match self {
            Store::Owned(v) => v.as_mut_slice(),
            #[cfg(feature = "mmap")]
            Store::Mmap { .. } => panic!("memory-mapped arrays are read-only"),
            Store::Raw(b) => b.as_mut(),
        }
    }

    pub fn is_read_only(&self) -> bool {
        match self {
            #[cfg(feature = "mmap")]
            Store::Mmap { .. } => true,
            _ => false,
        }
    }
}
