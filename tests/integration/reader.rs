//! `NpyReader` lifecycle and probing, through the public API (spec
//! §4.9's `closed -> open -> (seek|read|iterate)* -> close -> closed`).

use ndpy::dtype::Dtype;
use ndpy::layout::Order;
use ndpy::ndarray::NdArray;
use ndpy::pyvalue::PyValue;
use ndpy::{npy, BackendChoice, FileKind, NpyReader};

fn write_i64_file(path: &std::path::Path, values: &[i64]) {
    let dtype = Dtype::from_descr(&PyValue::Str("<i8".to_string())).unwrap();
    let mut arr = NdArray::construct(dtype, vec![values.len()], Order::RowMajor);
    for (i, v) in values.iter().enumerate() {
        arr.set_value(&[i], *v);
    }
    npy::save(path, &arr, true).unwrap();
}

#[test]
fn probe_path_identifies_a_bare_npy_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.npy");
    write_i64_file(&path, &[1, 2, 3]);
    assert_eq!(npy::probe_path(&path).unwrap(), FileKind::Npy);
}

#[test]
fn reader_iterates_items_in_ascending_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.npy");
    let values: Vec<i64> = (0..20).map(|i| i * i).collect();
    write_i64_file(&path, &values);

    let mut reader = NpyReader::new();
    reader.open(&path).unwrap();
    let collected: Vec<i64> = reader.typed_items::<i64>().collect();
    assert_eq!(collected, values);
}

#[test]
fn reader_seek_jumps_to_an_arbitrary_item() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.npy");
    write_i64_file(&path, &[10, 20, 30, 40, 50]);

    let mut reader = NpyReader::new();
    reader.open(&path).unwrap();
    reader.seek_item(3).unwrap();
    assert_eq!(reader.view::<i64>().unwrap(), 40);
}

#[test]
fn reader_over_stream_backend_matches_buffer_backend() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.npy");
    let values: Vec<i64> = (0..10).collect();
    write_i64_file(&path, &values);

    let mut reader = NpyReader::new();
    reader.open_with(&path, BackendChoice::Stream).unwrap();
    let collected: Vec<i64> = reader.typed_items::<i64>().collect();
    assert_eq!(collected, values);
}

#[cfg(feature = "mmap")]
#[test]
fn mmap_loaded_array_is_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.npy");
    write_i64_file(&path, &[1, 2, 3]);

    let loaded = npy::from_npy_mmap_path(&path).unwrap();
    assert!(loaded.value.is_read_only());
    assert_eq!(loaded.value.value::<i64>(&[1]), 2);
}
