//! Black-box save/load round trips against the public API, one file per
//! scenario the way the teacher's top-level `tests/round_trip.rs` does.

use ndpy::dtype::Dtype;
use ndpy::layout::Order;
use ndpy::ndarray::NdArray;
use ndpy::pyvalue::PyValue;
use ndpy::{load, npy};

fn dtype_of(descr: &str) -> Dtype {
    Dtype::from_descr(&PyValue::Str(descr.to_string())).unwrap()
}

fn round_trip<T: Copy + std::fmt::Debug + PartialEq>(descr: &str, shape: Vec<usize>, order: Order, values: &[T]) {
    let mut arr = NdArray::construct(dtype_of(descr), shape.clone(), order);
    for (i, v) in values.iter().enumerate() {
        let idx = ndpy::layout::unravel_index(i, &shape, order);
        arr.set_value(&idx, *v);
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("round_trip.npy");
    npy::save(&path, &arr, true).unwrap();

    let loaded = load(&path).unwrap();
    assert_eq!(loaded.value.shape(), shape.as_slice());
    assert_eq!(loaded.value.order(), order);
    for (i, v) in values.iter().enumerate() {
        let idx = ndpy::layout::unravel_index(i, &shape, order);
        assert_eq!(loaded.value.value::<T>(&idx), *v);
    }
}

#[test]
fn round_trip_i32() {
    round_trip::<i32>(
        "<i4",
        vec![2, 3, 2],
        Order::RowMajor,
        &[1, 8, -3, 4, 2, 9, -5, 0, 7, 38, -4, 1],
    );
}

#[test]
fn round_trip_f32() {
    round_trip::<f32>(
        "<f4",
        vec![2, 3, 2],
        Order::RowMajor,
        &[3., -1.4, -159., 26., 5., -3.5, -89.7, 93., 2., 384., -626.4, 3.],
    );
}

#[test]
fn round_trip_f64() {
    round_trip::<f64>(
        "<f8",
        vec![2, 6],
        Order::RowMajor,
        &[2.7, -40.4, -23., 27.8, -49., -43.3, -25.2, 11.8, -8.9, -17.8, 36.4, -25.6],
    );
}

#[test]
fn round_trip_bool() {
    round_trip::<u8>("|?1", vec![2, 3, 1], Order::RowMajor, &[1u8, 1, 0, 0, 1, 0]);
}

#[test]
fn round_trip_col_major() {
    round_trip::<i64>("<i8", vec![2, 3], Order::ColMajor, &[0, 1, 2, 3, 4, 5]);
}
