//! Dtype parsing and framing coverage across the primitive typestr
//! alphabet (`i u f c b B ? m M O S U V`).

use ndpy::dtype::{Dtype, TypeCode};
use ndpy::error::{NpyError, Status};
use ndpy::layout::Order;
use ndpy::ndarray::NdArray;
use ndpy::pyvalue::PyValue;
use ndpy::{bits::Endianness, npy};

fn dtype_of(descr: &str) -> Dtype {
    Dtype::from_descr(&PyValue::Str(descr.to_string())).unwrap()
}

#[test]
fn every_primitive_type_code_parses() {
    let cases: &[(&str, TypeCode, u64)] = &[
        ("<i4", TypeCode::Int, 4),
        ("<u8", TypeCode::Uint, 8),
        ("<f8", TypeCode::Float, 8),
        ("<c16", TypeCode::Complex, 16),
        ("|?1", TypeCode::Bool, 1),
        ("|b1", TypeCode::Byte, 1),
        ("<m8", TypeCode::TimeDelta, 8),
        ("<M8", TypeCode::DateTime, 8),
        ("|O8", TypeCode::Object, 8 * 8),
        ("|S10", TypeCode::ByteString, 10),
        ("<U4", TypeCode::Unicode, 16),
    ];
    for (descr, code, item_size) in cases {
        let dtype = dtype_of(descr);
        assert_eq!(dtype.type_code, *code, "descr {}", descr);
        assert_eq!(dtype.item_size, *item_size, "descr {}", descr);
    }
}

#[test]
fn object_dtype_frames_without_interpreting_bytes() {
    // spec open question: `O` is framed (multiplier 8) but left opaque.
    let dtype = dtype_of("|O1");
    let mut arr = NdArray::construct(dtype, vec![3], Order::RowMajor);
    // opaque payload: just raw bytes a real runtime would later interpret
    // as pointers/handles. We only assert framing survives a round trip.
    for i in 0..3usize {
        arr.set_value(&[i], (i as u64 + 100).to_ne_bytes());
    }
    let mut buf = Vec::new();
    npy::write_npy(&arr, &mut buf).unwrap();
    let loaded = npy::read_npy(&buf[..]).unwrap();
    assert_eq!(loaded.value.item_size(), 8);
    assert_eq!(loaded.value.data(), arr.data());
}

#[test]
fn native_and_invalid_endianness_chars() {
    assert_eq!(Endianness::from_char('='), Endianness::Native);
    assert_eq!(Endianness::from_char('%'), Endianness::Invalid);
}

#[test]
fn unsupported_typestr_is_a_descr_error_not_a_panic() {
    let err = Dtype::from_descr(&PyValue::Str("bad".to_string())).unwrap_err();
    let NpyError { status, .. } = err;
    assert!(status.contains(Status::DESCR_ERROR));
}
