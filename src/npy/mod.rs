//! The `.npy` codec: magic/version/header-length framing (delegated to
//! [`header`]), eager whole-array read/write, and the callback-driven
//! lazy paths (delegated to [`reader`]).
//!
//! Grounded on `npy.hpp`'s `from_npy`/`to_npy` family, rebuilt over this
//! crate's own [`Dtype`]/[`NdArray`] model instead of a static element
//! type. Control flow matches spec §2: probe first, then magic/version/
//! header-length/header/descr/fortran_order/shape/item-size/payload.

pub mod header;
pub mod reader;

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::error::{Detail, Loaded, NpyError, Status};
use crate::layout;
use crate::ndarray::NdArray;
use crate::storage::Store;

pub use header::{Header, Version, HEADER_DIVISOR, MAGIC};
pub use reader::NpyReader;

/// Local-file-header signature of a PKZIP archive (spec §6).
pub const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];

/// Result of probing a file's leading bytes to tell a bare `.npy` stream
/// apart from a `.npz` (zip) archive, per spec §2's control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Npy,
    Npz,
    Unknown,
}

pub fn probe_bytes(bytes: &[u8]) -> FileKind {
    if bytes.len() >= 4 && bytes[..4] == ZIP_SIGNATURE {
        FileKind::Npz
    } else if bytes.len() >= MAGIC.len() && &bytes[..MAGIC.len()] == MAGIC {
        FileKind::Npy
    } else {
        FileKind::Unknown
    }
}

pub fn probe_path<P: AsRef<Path>>(path: P) -> io::Result<FileKind> {
    let mut file = File::open(path)?;
    let mut buf = [0u8; 6];
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(probe_bytes(&buf[..filled]))
}

/// Reads exactly `buf.len()` bytes where possible, short-returning at a
/// clean EOF. Distinguishes "no bytes available" (`0`, clean EOF) from
/// "some but not enough" (a truncated tail), matching spec §4.8.
fn read_upto<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, NpyError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).map_err(NpyError::from)?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Walks every item in ascending flat-index order, invoking `per_item`
/// with `(flat_index, item_bytes)`. Stops when `per_item` returns
/// `false`, at a clean EOF, or fails with `file_truncated` on a short
/// final item (spec §4.8, invariants 7 and 8).
fn iterate_items<R: Read>(
    mut reader: R,
    header: &Header,
    mut per_item: impl FnMut(usize, &[u8]) -> bool,
) -> Result<(), NpyError> {
    let item_size = header.dtype.item_size as usize;
    let n_items = layout::element_count(&header.shape);
    if item_size == 0 {
        return Ok(());
    }
    let mut buf = vec![0u8; item_size];
    for i in 0..n_items {
        let filled = read_upto(&mut reader, &mut buf)?;
        if filled == 0 {
            break;
        }
        if filled < item_size {
            return Err(NpyError::with_detail(Status::TRUNCATED, Detail::FileTruncated));
        }
        if !per_item(i, &buf) {
            break;
        }
    }
    Ok(())
}

/// Generic callback load: `(dtype, shape, order, flat_index, item_bytes) -> continue?`.
pub fn from_npy_generic<R: Read>(
    mut reader: R,
    mut callback: impl FnMut(&crate::dtype::Dtype, &[usize], crate::layout::Order, usize, &[u8]) -> bool,
) -> Result<(Header, Status), NpyError> {
    let (header, warnings) = Header::read(&mut reader)?;
    iterate_items(reader, &header, |i, bytes| {
        callback(&header.dtype, &header.shape, header.order, i, bytes)
    })?;
    Ok((header, warnings))
}

/// Typed flat callback load: `(flat_index, T) -> continue?`. Panics if
/// `size_of::<T>()` doesn't match the parsed item size (a caller
/// contract violation, per spec §7).
pub fn from_npy_typed<T: Copy, R: Read>(
    mut reader: R,
    mut callback: impl FnMut(usize, T) -> bool,
) -> Result<(Header, Status), NpyError> {
    let (header, warnings) = Header::read(&mut reader)?;
    assert_eq!(
        std::mem::size_of::<T>(),
        header.dtype.item_size as usize,
        "T size does not match item_size"
    );
    iterate_items(reader, &header, |i, bytes| {
        let value = unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const T) };
        callback(i, value)
    })?;
    Ok((header, warnings))
}

/// Typed multi-index callback load: `(index_vector, T) -> continue?`,
/// unraveling each flat index internally against the parsed shape/order.
pub fn from_npy_typed_multi_index<T: Copy, R: Read>(
    mut reader: R,
    mut callback: impl FnMut(&[usize], T) -> bool,
) -> Result<(Header, Status), NpyError> {
    let (header, warnings) = Header::read(&mut reader)?;
    assert_eq!(
        std::mem::size_of::<T>(),
        header.dtype.item_size as usize,
        "T size does not match item_size"
    );
    iterate_items(reader, &header, |i, bytes| {
        let value = unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const T) };
        let multi = layout::unravel_index(i, &header.shape, header.order);
        callback(&multi, value)
    })?;
    Ok((header, warnings))
}

/// Typed flat callback load preceded by an array-properties callback
/// that can bail out before any item iteration happens (spec §4.8).
pub fn from_npy_with_props<T: Copy, R: Read>(
    mut reader: R,
    props_callback: impl FnOnce(&crate::dtype::Dtype, &[usize], crate::layout::Order) -> bool,
    mut data_callback: impl FnMut(usize, T) -> bool,
) -> Result<(Header, Status), NpyError> {
    let (header, warnings) = Header::read(&mut reader)?;
    if !props_callback(&header.dtype, &header.shape, header.order) {
        return Ok((header, warnings));
    }
    assert_eq!(
        std::mem::size_of::<T>(),
        header.dtype.item_size as usize,
        "T size does not match item_size"
    );
    iterate_items(reader, &header, |i, bytes| {
        let value = unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const T) };
        data_callback(i, value)
    })?;
    Ok((header, warnings))
}

/// Eager whole-array load: parses the header, then moves every
/// remaining byte into an owned-vector backing store (spec §4.5 step
/// 8, buffered path). Validates the payload length is an exact
/// multiple of the item size.
pub fn read_npy_full<R: Read>(mut reader: R) -> Result<(Header, Loaded<NdArray>), NpyError> {
    let (header, warnings) = Header::read(&mut reader)?;
    let mut payload = Vec::new();
    reader.read_to_end(&mut payload).map_err(NpyError::from)?;

    let item_size = header.dtype.item_size as usize;
    let n_items = layout::element_count(&header.shape);
    let expected = n_items * item_size;
    if item_size > 0 && payload.len() != expected {
        return Err(NpyError::with_detail(Status::DATA_SIZE_MISMATCH, Detail::DataSizeMismatch));
    }

    log::debug!(
        "npy buffered read: shape={:?} order={:?} item_size={} backend=buffer",
        header.shape,
        header.order,
        item_size
    );

    let mut arr = NdArray::empty();
    arr.assign(header.dtype.clone(), header.shape.clone(), header.order, Store::Owned(payload));
    Ok((header, Loaded::with_warnings(arr, warnings)))
}

pub fn read_npy<R: Read>(reader: R) -> Result<Loaded<NdArray>, NpyError> {
    read_npy_full(reader).map(|(_, loaded)| loaded)
}

/// Eager whole-array load from a file path via the buffered backend.
pub fn from_npy_path<P: AsRef<Path>>(path: P) -> Result<Loaded<NdArray>, NpyError> {
    let file = File::open(path).map_err(NpyError::from)?;
    read_npy(io::BufReader::new(file))
}

/// Eager whole-array load from a file path, backing the array with a
/// read-only memory-mapped region instead of a copied buffer (spec
/// §4.5 step 8, mmap path; spec §1's Non-goals: mmap arrays are
/// read-only).
#[cfg(feature = "mmap")]
pub fn from_npy_mmap_path<P: AsRef<Path>>(path: P) -> Result<Loaded<NdArray>, NpyError> {
    use memmap2::Mmap;

    let file = File::open(path).map_err(NpyError::from)?;
    let mut header_reader = io::BufReader::new(file.try_clone().map_err(NpyError::from)?);
    let (header, warnings) = Header::read(&mut header_reader)?;

    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| NpyError::io(Status::MMAP_FAILED, e))?;
    let item_size = header.dtype.item_size as usize;
    let n_items = layout::element_count(&header.shape);
    let payload_len = mmap.len().saturating_sub(header.data_offset);
    if item_size > 0 && payload_len != n_items * item_size {
        return Err(NpyError::with_detail(Status::DATA_SIZE_MISMATCH, Detail::DataSizeMismatch));
    }

    log::debug!(
        "npy mmap read: shape={:?} order={:?} item_size={} backend=mmap",
        header.shape,
        header.order,
        item_size
    );

    let mut arr = NdArray::empty();
    arr.assign(
        header.dtype.clone(),
        header.shape.clone(),
        header.order,
        Store::Mmap { mmap, payload_offset: header.data_offset },
    );
    Ok(Loaded::with_warnings(arr, warnings))
}

/// Writes `array`'s header and raw payload bytes (in the array's
/// current storage order, with no implicit transposition) to `writer`.
pub fn write_npy<W: Write>(array: &NdArray, mut writer: W) -> Result<(), NpyError> {
    Header::write(array.dtype(), array.shape(), array.order(), &mut writer)?;
    writer.write_all(array.data()).map_err(NpyError::from)?;
    Ok(())
}

/// Serializes `array` to an in-memory `.npy` byte buffer, used by the
/// npz writer to stage a member before handing it to the zip backend.
pub fn write_npy_bytes(array: &NdArray) -> Result<Vec<u8>, NpyError> {
    let mut buf = Vec::new();
    write_npy(array, &mut buf)?;
    Ok(buf)
}

/// Creates (or overwrites, if `overwrite`) the file at `path` and writes
/// `array` to it.
pub fn save<P: AsRef<Path>>(path: P, array: &NdArray, overwrite: bool) -> Result<(), NpyError> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true);
    if overwrite {
        options.truncate(true);
    } else {
        options.create_new(true);
    }
    let file = options.open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::AlreadyExists {
            NpyError::io(Status::EXISTS, e)
        } else {
            NpyError::from(e)
        }
    })?;
    let mut writer = io::BufWriter::new(file);
    write_npy(array, &mut writer)?;
    writer.flush().map_err(NpyError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::Dtype;
    use crate::layout::Order;
    use crate::pyvalue::PyValue;

    fn int64_dtype() -> Dtype {
        Dtype::from_descr(&PyValue::Str("<i8".to_string())).unwrap()
    }

    #[test]
    fn save_load_idempotence_s1() {
        let dtype = int64_dtype();
        let mut arr = NdArray::construct(dtype, vec![5], Order::RowMajor);
        for i in 0..5i64 {
            arr.set_value(&[i as usize], i);
        }
        let mut buf = Vec::new();
        write_npy(&arr, &mut buf).unwrap();
        let loaded = read_npy(&buf[..]).unwrap();
        assert_eq!(loaded.value.shape(), &[5]);
        assert_eq!(loaded.value.value::<i64>(&[3]), 3);
        assert_eq!(loaded.value.data(), arr.data());
    }

    #[test]
    fn probe_distinguishes_npy_and_npz() {
        let mut npy_bytes = MAGIC.to_vec();
        npy_bytes.extend_from_slice(&[2, 0]);
        assert_eq!(probe_bytes(&npy_bytes), FileKind::Npy);
        assert_eq!(probe_bytes(&ZIP_SIGNATURE), FileKind::Npz);
        assert_eq!(probe_bytes(b"xx"), FileKind::Unknown);
    }

    #[test]
    fn generic_callback_visits_every_item_in_order() {
        let dtype = int64_dtype();
        let mut arr = NdArray::construct(dtype, vec![4], Order::RowMajor);
        for i in 0..4i64 {
            arr.set_value(&[i as usize], i * 10);
        }
        let mut buf = Vec::new();
        write_npy(&arr, &mut buf).unwrap();

        let mut seen = Vec::new();
        let (_, warnings) = from_npy_typed::<i64, _>(&buf[..], |idx, v| {
            seen.push((idx, v));
            true
        })
        .unwrap();
        assert!(!warnings.is_error());
        assert_eq!(seen, vec![(0, 0), (1, 10), (2, 20), (3, 30)]);
    }

    #[test]
    fn typed_callback_cancellation_stops_after_kplus1() {
        let dtype = int64_dtype();
        let mut arr = NdArray::construct(dtype, vec![10], Order::RowMajor);
        for i in 0..10i64 {
            arr.set_value(&[i as usize], i);
        }
        let mut buf = Vec::new();
        write_npy(&arr, &mut buf).unwrap();

        let mut count = 0;
        from_npy_typed::<i64, _>(&buf[..], |idx, _v| {
            count += 1;
            idx < 2
        })
        .unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn props_callback_can_bail_before_iteration() {
        let dtype = int64_dtype();
        let arr = NdArray::construct(dtype, vec![3], Order::RowMajor);
        let mut buf = Vec::new();
        write_npy(&arr, &mut buf).unwrap();

        let mut item_calls = 0;
        from_npy_with_props::<i64, _>(
            &buf[..],
            |_dtype, shape, _order| {
                assert_eq!(shape, &[3]);
                false
            },
            |_idx, _v: i64| {
                item_calls += 1;
                true
            },
        )
        .unwrap();
        assert_eq!(item_calls, 0);
    }

    #[test]
    fn truncated_payload_is_reported() {
        let dtype = int64_dtype();
        let arr = NdArray::construct(dtype, vec![2], Order::RowMajor);
        let mut buf = Vec::new();
        write_npy(&arr, &mut buf).unwrap();
        buf.truncate(buf.len() - 3); // chop part of the last item
        let err = from_npy_typed::<i64, _>(&buf[..], |_, _: i64| true).unwrap_err();
        assert_eq!(err.detail, Some(Detail::FileTruncated));
    }
}
