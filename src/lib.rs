#![cfg_attr(docsrs, feature(doc_cfg))]

//! Self-contained reader/writer for the NumPy on-disk array formats:
//! `.npy` single-array files and `.npz` zip archives of `.npy` members.
//!
//! This crate has no dependency on a numeric runtime — arrays are
//! exposed as a declared element type ([`Dtype`]), shape, storage
//! order, and raw bytes ([`NdArray`]), not as a generic container over
//! `f64`/`i32`/etc. Three subsystems do the work:
//!
//! - [`pyvalue`] — a Python-literal mini-parser for the array-descriptor
//!   dictionary embedded in every `.npy` header.
//! - [`dtype`] and [`layout`] — the dtype/record model and the
//!   shape/stride/index arithmetic.
//! - [`npy`] and [`npz`] (the latter behind the `npz` feature) — the
//!   codecs themselves, each able to read/write eagerly (whole-array)
//!   or lazily (item-by-item).
//!
//! # Reading
//!
//! - [`load`] / [`loadz`] — convenience, probing the file to dispatch
//!   between a bare `.npy` stream and a `.npz` archive.
//! - [`npy::from_npy_path`] (buffered) and, with the `mmap` feature,
//!   [`npy::from_npy_mmap_path`] — eager whole-array loads.
//! - [`npy::from_npy_generic`], [`npy::from_npy_typed`],
//!   [`npy::from_npy_typed_multi_index`], [`npy::from_npy_with_props`] —
//!   callback-driven lazy loads over any `Read` source.
//! - [`NpyReader`] — a reusable, seekable reader for ad hoc
//!   seek/view/iterate access.
//!
//! # Writing
//!
//! - [`npy::save`] / [`npy::write_npy`] — single-array writes.
//! - [`npz::savez`] / [`npz::savez_unnamed`] / [`npz::savez_compressed`]
//!   (behind the `npz` feature) — archive writes.
//!
//! # Byte order
//!
//! Endianness is recorded on [`Dtype`] and exposed, never swapped
//! implicitly on load. Use [`NdArray::apply`] with
//! [`bits::swap_elements`] to convert in place when the caller wants
//! host-native bytes.
//!
//! # Limitations
//!
//! Memory-mapped arrays are read-only; there is no streaming writer;
//! the `O` (Python object) type code is framed but its bytes are left
//! opaque (no runtime to interpret them against).

pub mod bits;
pub mod dtype;
pub mod error;
pub mod layout;
pub mod ndarray;
pub mod npy;
#[cfg(feature = "npz")]
pub mod npz;
pub mod pyvalue;
pub mod storage;
#[cfg(feature = "npz")]
pub mod zipbackend;

use std::io;
use std::path::Path;

pub use dtype::{Dtype, TypeCode};
pub use error::{Detail, Loaded, NpyError, NpzError, Status};
pub use layout::Order;
pub use ndarray::NdArray;
pub use npy::header::{Header, Version};
pub use npy::reader::{BackendChoice, NpyReader};
pub use npy::FileKind;
#[cfg(feature = "npz")]
pub use npz::NpzFile;

/// `load(path, &arr)` (spec §6): single-array convenience that probes
/// the file's leading bytes first so a `.npz` handed to `load` fails
/// with `wrong_filetype` instead of a confusing framing error.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Loaded<NdArray>, NpyError> {
    match npy::probe_path(path.as_ref()).map_err(NpyError::from)? {
        FileKind::Npy => npy::from_npy_path(path),
        FileKind::Npz | FileKind::Unknown => Err(NpyError::new(Status::WRONG_FILETYPE)),
    }
}

/// `loadz(path, &npz)` (spec §6): archive convenience, the `.npz`
/// counterpart of [`load`].
#[cfg(feature = "npz")]
pub fn loadz<P: AsRef<Path>>(path: P) -> Result<Loaded<NpzFile>, NpzError> {
    let kind = npy::probe_path(path.as_ref()).map_err(|e| NpzError::Npy(NpyError::from(e)))?;
    match kind {
        FileKind::Npz => npz::from_npz_path(path),
        FileKind::Npy | FileKind::Unknown => {
            Err(NpzError::Zip(Status::WRONG_FILETYPE, "not a zip archive".to_string()))
        }
    }
}
