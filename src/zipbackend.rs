//! The narrow zip-backend collaborator contract (spec §6:
//! `make/release/open/close/get_file_list/read/write`) plus the one
//! shipped implementation over the `zip` crate.
//!
//! Spec §1 treats the zip codec as an external collaborator: the core
//! npz logic in [`crate::npz`] only ever talks to [`ZipBackend`], never
//! to `zip` directly, so a different backend could be substituted by
//! implementing the trait. Grounded on the teacher's `npz.rs`
//! (`NpzWriter`/`NpzReader` wrapping `ZipWriter`/`ZipArchive`) and the
//! original's `backend_interface` function-pointer struct, translated
//! to a Rust trait per the "polymorphism over backing stores" pattern —
//! here there genuinely is one shared behavior (open/read/write a named
//! member), so a trait (dispatched dynamically via `Box<dyn
//! ZipBackend>`) is the right fit, unlike [`crate::storage::Store`].

use std::fs::File;
use std::io::Read;
use std::path::Path;

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{NpyError, NpzError, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Read,
    Write,
}

/// The collaborator contract spec §6 names. `make`/`release` have no
/// Rust analogue (construction/drop do that job); the rest map
/// directly.
pub trait ZipBackend {
    fn open(&mut self, path: &Path, mode: FileMode) -> Result<(), NpzError>;
    fn close(&mut self) -> Result<(), NpzError>;
    fn get_file_list(&mut self) -> Result<Vec<String>, NpzError>;
    fn read(&mut self, name: &str) -> Result<Vec<u8>, NpzError>;
    fn write(&mut self, name: &str, bytes: Vec<u8>, compress: bool, level: u8) -> Result<(), NpzError>;
}

/// The shipped implementation, over the `zip` crate (`compressed_npz`
/// feature enables its `deflate` support).
#[derive(Default)]
pub struct ZipCrateBackend {
    reader: Option<ZipArchive<File>>,
    writer: Option<ZipWriter<File>>,
}

impl ZipCrateBackend {
    pub fn new() -> Self {
        ZipCrateBackend { reader: None, writer: None }
    }

    fn not_open() -> NpzError {
        NpzError::Zip(Status::READER_NOT_OPEN, "zip backend is not open".to_string())
    }
}

impl ZipBackend for ZipCrateBackend {
    fn open(&mut self, path: &Path, mode: FileMode) -> Result<(), NpzError> {
        match mode {
            FileMode::Read => {
                let file = File::open(path).map_err(NpyError::from)?;
                let archive = ZipArchive::new(file)
                    .map_err(|e| NpzError::Zip(Status::OPEN_FAILED, e.to_string()))?;
                self.reader = Some(archive);
            }
            FileMode::Write => {
                let file = File::create(path).map_err(NpyError::from)?;
                self.writer = Some(ZipWriter::new(file));
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), NpzError> {
        if let Some(mut writer) = self.writer.take() {
            // The writer retains its staged buffers until the archive is
            // finished (spec §5: "the zip backend retains write buffers
            // until the archive is closed to keep pointers valid across
            // deferred writes").
            writer.finish().map_err(|e| NpzError::Zip(Status::CLOSE_FAILED, e.to_string()))?;
        }
        self.reader = None;
        Ok(())
    }

    fn get_file_list(&mut self) -> Result<Vec<String>, NpzError> {
        // `file_names()` iterates the archive's internal name->index map
        // in unspecified order; walking by index via `by_index` preserves
        // the archive's actual listing order (spec §8 invariant 6),
        // matching the teacher's `NpzReader::names()`.
        let archive = self.reader.as_mut().ok_or_else(Self::not_open)?;
        (0..archive.len())
            .map(|i| {
                archive
                    .by_index(i)
                    .map(|entry| entry.name().to_string())
                    .map_err(|e| NpzError::Zip(Status::READ_FAILED, e.to_string()))
            })
            .collect()
    }

    fn read(&mut self, name: &str) -> Result<Vec<u8>, NpzError> {
        let archive = self.reader.as_mut().ok_or_else(Self::not_open)?;
        let mut entry = archive
            .by_name(name)
            .map_err(|e| NpzError::Zip(Status::NOT_FOUND, e.to_string()))?;
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes).map_err(NpyError::from)?;
        Ok(bytes)
    }

    fn write(&mut self, name: &str, bytes: Vec<u8>, compress: bool, level: u8) -> Result<(), NpzError> {
        use std::io::Write;

        let writer = self.writer.as_mut().ok_or_else(Self::not_open)?;
        let method = if compress { CompressionMethod::Deflated } else { CompressionMethod::Stored };
        let mut options = FileOptions::default().compression_method(method);
        if compress && level > 0 {
            options = options.compression_level(Some(level as i32));
        }
        writer
            .start_file(name, options)
            .map_err(|e| NpzError::Zip(Status::WRITE_FAILED, e.to_string()))?;
        writer.write_all(&bytes).map_err(NpyError::from)?;
        Ok(())
    }
}
