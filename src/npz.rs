//! The `.npz` codec (spec §4.7): directory enumeration, per-member
//! decode, name-collision rejection on write, and compressed write —
//! all driven through the [`crate::zipbackend::ZipBackend`] contract.
//!
//! Grounded on the teacher's `npz.rs` (`NpzReader`/`NpzWriter`) for the
//! overall read/write shape, generalized from the teacher's
//! `ndarray`-typed members to this crate's own [`NdArray`]/[`Header`].

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{Loaded, NpyError, NpzError, Status};
use crate::ndarray::NdArray;
use crate::npy::{self, header::Header};
use crate::zipbackend::{FileMode, ZipBackend, ZipCrateBackend};

const MEMBER_SUFFIX: &str = ".npy";

/// An opened `.npz` archive: the member names in archive-listing order,
/// plus their parsed `.npy` framings and decoded payloads (spec §3).
pub struct NpzFile {
    names: Vec<String>,
    headers: HashMap<String, Header>,
    arrays: HashMap<String, NdArray>,
}

impl NpzFile {
    /// Member names, in the archive's listing order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Non-panicking lookup of a member's array by name.
    pub fn get(&self, name: &str) -> Option<&NdArray> {
        self.arrays.get(name)
    }

    /// Non-panicking lookup of a member's parsed `.npy` framing.
    pub fn header(&self, name: &str) -> Option<&Header> {
        self.headers.get(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Dynamic name lookup that panics on a missing member, per spec §7's
/// exception boundary ("failed dynamic name lookup in an npz container"
/// is a caller contract violation, not a recoverable error).
impl std::ops::Index<&str> for NpzFile {
    type Output = NdArray;

    fn index(&self, name: &str) -> &NdArray {
        self.arrays
            .get(name)
            .unwrap_or_else(|| panic!("npz archive has no member named {:?}", name))
    }
}

fn bare_member_name(entry_name: &str) -> Option<&str> {
    entry_name.strip_suffix(MEMBER_SUFFIX)
}

/// Reads every `<name>.npy` member of the archive at `path`, in the
/// archive's listing order (spec §4.7, testable property 6).
pub fn from_npz_path<P: AsRef<Path>>(path: P) -> Result<Loaded<NpzFile>, NpzError> {
    let mut backend = ZipCrateBackend::new();
    backend.open(path.as_ref(), FileMode::Read)?;

    let listing = backend.get_file_list()?;
    let mut names = Vec::new();
    let mut headers = HashMap::new();
    let mut arrays = HashMap::new();
    let mut warnings = Status::empty();

    for entry_name in &listing {
        let Some(bare) = bare_member_name(entry_name) else {
            log::warn!("npz member skipped (not a .npy entry): {}", entry_name);
            continue;
        };
        let bytes = backend.read(entry_name)?;
        let (header, loaded) = npy::read_npy_full(&bytes[..]).map_err(NpzError::Npy)?;
        warnings |= loaded.warnings;
        log::debug!("npz member loaded: {} (shape={:?})", bare, header.shape);
        names.push(bare.to_string());
        headers.insert(bare.to_string(), header);
        arrays.insert(bare.to_string(), loaded.value);
    }

    backend.close()?;
    Ok(Loaded::with_warnings(NpzFile { names, headers, arrays }, warnings))
}

fn write_members<P: AsRef<Path>>(
    path: P,
    arrays: &[(String, &NdArray)],
    overwrite: bool,
    compress: bool,
    level: u8,
) -> Result<(), NpzError> {
    let mut seen = HashSet::with_capacity(arrays.len());
    for (name, _) in arrays {
        if !seen.insert(name.as_str()) {
            return Err(NpzError::Zip(
                Status::DUPLICATE_ARRAY_NAME,
                format!("duplicate array name: {}", name),
            ));
        }
    }
    if !overwrite && path.as_ref().exists() {
        return Err(NpzError::Zip(Status::EXISTS, format!("{} already exists", path.as_ref().display())));
    }

    let mut backend = ZipCrateBackend::new();
    backend.open(path.as_ref(), FileMode::Write)?;
    for (name, array) in arrays {
        let bytes = npy::write_npy_bytes(array).map_err(NpzError::Npy)?;
        backend.write(&format!("{}{}", name, MEMBER_SUFFIX), bytes, compress, level)?;
    }
    backend.close()?;
    Ok(())
}

/// Writes named arrays uncompressed (zip `stored` method).
pub fn savez<P: AsRef<Path>>(path: P, arrays: Vec<(String, &NdArray)>, overwrite: bool) -> Result<(), NpzError> {
    write_members(path, &arrays, overwrite, false, 0)
}

/// Writes unnamed arrays with synthesized names `arr_0`, `arr_1`, ….
pub fn savez_unnamed<P: AsRef<Path>>(path: P, arrays: &[&NdArray], overwrite: bool) -> Result<(), NpzError> {
    let named: Vec<(String, &NdArray)> =
        arrays.iter().enumerate().map(|(i, a)| (format!("arr_{}", i), *a)).collect();
    write_members(path, &named, overwrite, false, 0)
}

/// Writes named arrays deflate-compressed. `level` is 0 (backend
/// default) or 1–9 per the zlib convention (spec §4.7).
pub fn savez_compressed<P: AsRef<Path>>(
    path: P,
    arrays: Vec<(String, &NdArray)>,
    overwrite: bool,
    level: u8,
) -> Result<(), NpzError> {
    write_members(path, &arrays, overwrite, true, level)
}
