//! Magic/version/header-length framing and the header dict itself:
//! parsing `descr`/`fortran_order`/`shape` out of a parsed Python dict,
//! and emitting the equivalent bytes on write.
//!
//! Grounded on the teacher's `npy/header.rs` (`Version`, `HEADER_DIVISOR`,
//! `Header::{from_py_value,from_reader,to_py_value,to_bytes,write}`) for
//! the overall shape of this module, with the header *content* itself
//! (descr parsing, in particular) replaced by our own [`Dtype`] model
//! instead of the teacher's static element-type system.

use std::io::{self, Read, Write};

use crate::bits;
use crate::dtype::Dtype;
use crate::error::{Detail, NpyError, Status};
use crate::layout::Order;
use crate::pyvalue::{self, PyValue};

pub const MAGIC: &[u8; 6] = b"\x93NUMPY";
pub const HEADER_DIVISOR: usize = 64;

/// `.npy` format version. Only `(1,0)` and `(2,0)` are accepted on read;
/// the writer always emits `(2,0)` — see the Open Question this carries
/// forward from the source design (numpy itself emits 1.0 when the
/// header fits in a 16-bit length, but this crate does not replicate
/// that optimization).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V1_0,
    V2_0,
}

impl Version {
    pub fn from_bytes(major: u8, minor: u8) -> Result<Self, NpyError> {
        match (major, minor) {
            (1, 0) => Ok(Version::V1_0),
            (2, 0) => Ok(Version::V2_0),
            _ => Err(NpyError::new(Status::VERSION_NOT_SUPPORTED)),
        }
    }

    pub fn as_bytes(self) -> (u8, u8) {
        match self {
            Version::V1_0 => (1, 0),
            Version::V2_0 => (2, 0),
        }
    }

    /// Width in bytes of the header-length field for this version: 2 for
    /// 1.0, 4 for 2.0.
    pub fn header_len_field_width(self) -> usize {
        match self {
            Version::V1_0 => 2,
            Version::V2_0 => 4,
        }
    }

    /// Length of the fixed prelude (magic + version + header-length
    /// field) preceding the header bytes.
    pub fn prelude_len(self) -> usize {
        MAGIC.len() + 2 + self.header_len_field_width()
    }
}

/// Parsed framing metadata for a `.npy` stream: everything up to (and
/// including the position of) the payload, per spec §3's `NpyFile`.
#[derive(Debug, Clone)]
pub struct Header {
    pub version: Version,
    pub dtype: Dtype,
    pub order: Order,
    pub shape: Vec<usize>,
    /// Offset of the payload from the start of the stream: prelude +
    /// header_len.
    pub data_offset: usize,
    pub header_len: usize,
}

impl Header {
    /// Reads and validates the magic bytes, version, and header-length
    /// field, then parses the header bytes into a `Header`. Missing
    /// `descr`/`fortran_order`/`shape` keys are reported as warning bits
    /// in the returned `Status`, not fatal — per spec §4.5 step 5.
    pub fn read<R: Read>(mut reader: R) -> Result<(Header, Status), NpyError> {
        let mut magic = [0u8; 6];
        reader.read_exact(&mut magic).map_err(|e| io_to_npy(e, Status::MAGIC_STRING_INVALID))?;
        if &magic != MAGIC {
            return Err(NpyError::new(Status::MAGIC_STRING_INVALID));
        }

        let mut version_bytes = [0u8; 2];
        reader.read_exact(&mut version_bytes).map_err(|e| io_to_npy(e, Status::VERSION_NOT_SUPPORTED))?;
        let version = Version::from_bytes(version_bytes[0], version_bytes[1])?;

        let width = version.header_len_field_width();
        let mut len_bytes = vec![0u8; width];
        reader.read_exact(&mut len_bytes).map_err(|e| io_to_npy(e, Status::HEADER_TRUNCATED))?;
        let header_len = if width == 2 {
            bits::read_u16_le(&len_bytes) as usize
        } else {
            bits::read_u32_le(&len_bytes) as usize
        };

        let prelude_len = version.prelude_len();
        if (prelude_len + header_len) % HEADER_DIVISOR != 0 {
            return Err(NpyError::new(Status::HEADER_INVALID_LENGTH));
        }

        if header_len == 0 {
            return Err(NpyError::new(Status::HEADER_EMPTY));
        }
        let mut header_bytes = vec![0u8; header_len];
        reader.read_exact(&mut header_bytes).map_err(|e| io_to_npy(e, Status::HEADER_TRUNCATED))?;

        let value = pyvalue::parse(&header_bytes)
            .map_err(|_| NpyError::new(Status::HEADER_PARSING_ERROR))?;
        let dict = value.as_dict().ok_or_else(|| NpyError::new(Status::HEADER_INVALID))?;

        let mut warnings = Status::empty();

        let descr = value.get("descr");
        if descr.is_none() {
            warnings |= Status::MISSING_DESCR;
        }
        let dtype = match descr {
            Some(v) => Dtype::from_descr(v)?,
            None => Dtype::int64(),
        };

        let fortran_order = value.get("fortran_order");
        if fortran_order.is_none() {
            warnings |= Status::MISSING_FORTRAN_ORDER;
        }
        let order = match fortran_order {
            Some(v) => {
                let b = v
                    .as_bool()
                    .ok_or_else(|| NpyError::with_detail(Status::DESCR_ERROR, Detail::FortranOrderInvalidValue))?;
                Order::from_fortran_order(b)
            }
            None => Order::RowMajor,
        };

        let shape_value = value.get("shape");
        if shape_value.is_none() {
            warnings |= Status::MISSING_SHAPE;
        }
        let shape = match shape_value {
            Some(v) => {
                let tuple = v
                    .as_tuple()
                    .ok_or_else(|| NpyError::with_detail(Status::DESCR_ERROR, Detail::ShapeInvalidValue))?;
                let mut dims = Vec::with_capacity(tuple.len());
                for dim in tuple {
                    let n = dim
                        .as_int()
                        .ok_or_else(|| NpyError::with_detail(Status::DESCR_ERROR, Detail::ShapeInvalidShapeValue))?;
                    dims.push(n as usize);
                }
                dims
            }
            None => Vec::new(),
        };
        let _ = dict.len();

        log::debug!(
            "parsed npy header: shape={:?} order={:?} item_size={}",
            shape,
            order,
            dtype.item_size
        );
        if !warnings.is_empty() {
            log::warn!("npy header missing keys: {}", warnings);
        }

        let data_offset = prelude_len + header_len;
        Ok((Header { version, dtype, order, shape, data_offset, header_len }, warnings))
    }

    /// Serializes this header's dict content (`descr`, `fortran_order`,
    /// `shape`) as a Python literal, not yet padded or length-prefixed.
    fn to_dict_literal(&self) -> String {
        let mut s = String::new();
        s.push('{');
        s.push_str("'descr': ");
        s.push_str(&self.dtype.to_descr_string());
        s.push_str(", 'fortran_order': ");
        s.push_str(if self.order.is_fortran() { "True" } else { "False" });
        s.push_str(", 'shape': (");
        for dim in &self.shape {
            s.push_str(&dim.to_string());
            s.push(',');
        }
        s.push_str("), }");
        s
    }

    /// Writes the full prelude + padded header, always as version 2.0,
    /// per the Open Question this carries from the source.
    pub fn write<W: Write>(dtype: &Dtype, shape: &[usize], order: Order, mut writer: W) -> Result<(), NpyError> {
        let version = Version::V2_0;
        let (major, minor) = version.as_bytes();
        let literal = Header { version, dtype: dtype.clone(), order, shape: shape.to_vec(), data_offset: 0, header_len: 0 }
            .to_dict_literal();

        let prelude_len = version.prelude_len();
        // total = prelude + header_len must be a multiple of 64, and the
        // last header byte must be '\n' (spec invariant 1).
        let unpadded_len = literal.len() + 1; // +1 for trailing '\n'
        let total_unpadded = prelude_len + unpadded_len;
        let padding = (HEADER_DIVISOR - (total_unpadded % HEADER_DIVISOR)) % HEADER_DIVISOR;
        let header_len = unpadded_len + padding;

        writer.write_all(MAGIC).map_err(NpyError::from)?;
        writer.write_all(&[major, minor]).map_err(NpyError::from)?;

        let mut len_bytes = [0u8; 4];
        bits::write_u32_le(&mut len_bytes, header_len as u32);
        writer.write_all(&len_bytes).map_err(NpyError::from)?;

        writer.write_all(literal.as_bytes()).map_err(NpyError::from)?;
        for _ in 0..padding {
            writer.write_all(b" ").map_err(NpyError::from)?;
        }
        writer.write_all(b"\n").map_err(NpyError::from)?;

        debug_assert_eq!((prelude_len + header_len) % HEADER_DIVISOR, 0);
        Ok(())
    }
}

fn io_to_npy(err: io::Error, status: Status) -> NpyError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        NpyError::new(Status::HEADER_TRUNCATED)
    } else {
        NpyError::io(status, err)
    }
}
