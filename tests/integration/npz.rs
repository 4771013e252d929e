//! `.npz` archive round trips through the public API (spec §4.7, S5).

use ndpy::dtype::Dtype;
use ndpy::layout::Order;
use ndpy::loadz;
use ndpy::ndarray::NdArray;
use ndpy::npz::{self, NpzFile};
use ndpy::pyvalue::PyValue;

fn int_array(values: &[i32]) -> NdArray {
    let dtype = Dtype::from_descr(&PyValue::Str("<i4".to_string())).unwrap();
    let mut arr = NdArray::construct(dtype, vec![values.len()], Order::RowMajor);
    for (i, v) in values.iter().enumerate() {
        arr.set_value(&[i], *v);
    }
    arr
}

/// S5: `savez_compressed` with two named arrays, then `loadz`.
#[test]
fn s5_npz_round_trip_preserves_names_and_bytes() {
    let arr1 = int_array(&[1, 3, 0, 4, 7, -1]);
    let arr2 = int_array(&[9, 6, -5, 2, 3, -1]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("s5.npz");
    npz::savez_compressed(
        &path,
        vec![("x".to_string(), &arr1), ("y".to_string(), &arr2)],
        true,
        6,
    )
    .unwrap();

    let loaded = loadz(&path).unwrap();
    let archive: NpzFile = loaded.value;
    assert_eq!(archive.names(), &["x".to_string(), "y".to_string()]);
    assert_eq!(archive.len(), 2);
    assert_eq!(archive["x"].data(), arr1.data());
    assert_eq!(archive["y"].data(), arr2.data());
    assert_eq!(archive.get("x").unwrap().data(), arr1.data());
}

#[test]
fn loadz_rejects_a_bare_npy_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("not_an_archive.npz");
    let arr = int_array(&[1, 2, 3]);
    ndpy::npy::save(&path, &arr, true).unwrap();

    let err = loadz(&path).unwrap_err();
    match err {
        ndpy::NpzError::Zip(status, _) => assert!(status.contains(ndpy::Status::WRONG_FILETYPE)),
        _ => panic!("expected a zip-level wrong-filetype error"),
    }
}

#[test]
fn savez_unnamed_then_loadz_synthesizes_names() {
    let arr1 = int_array(&[1]);
    let arr2 = int_array(&[2]);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unnamed.npz");
    npz::savez_unnamed(&path, &[&arr1, &arr2], true).unwrap();

    let loaded = loadz(&path).unwrap();
    assert_eq!(loaded.value.names(), &["arr_0".to_string(), "arr_1".to_string()]);
}
