//! The recursive dtype tree: construction from a parsed `descr`,
//! item-size computation, field lookup, and serialization back to a
//! descriptor string.
//!
//! Grounded on `dtype.hpp`'s `dtype` struct and its free functions
//! (`is_structured_array`, `find_field`, `get_nested_dtype`,
//! `serialize_dtype*`). Per the "recursive dtype" design note, fields
//! are owned by value in a `Vec` (insertion order is binary layout) with
//! a side `HashMap<String, usize>` for O(1) named lookup — both kept,
//! neither alone.

use std::collections::HashMap;

use crate::bits::Endianness;
use crate::error::{Detail, NpyError, Status};
use crate::pyvalue::PyValue;

/// Single-character type code from the descriptor alphabet. Only the
/// variants the format's encoding actually drives branch on
/// (`i u f c O U`); everything else is framed but its bytes are opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Int,
    Uint,
    Float,
    Complex,
    Bool,
    Byte,
    DateTime,
    TimeDelta,
    Object,
    ByteString,
    Unicode,
    Void,
    Other(u8),
}

impl TypeCode {
    pub fn from_char(c: u8) -> Self {
        match c {
            b'i' => TypeCode::Int,
            b'u' => TypeCode::Uint,
            b'f' => TypeCode::Float,
            b'c' => TypeCode::Complex,
            b'?' => TypeCode::Bool,
            b'b' | b'B' => TypeCode::Byte,
            b'M' => TypeCode::DateTime,
            b'm' => TypeCode::TimeDelta,
            b'O' => TypeCode::Object,
            b'S' => TypeCode::ByteString,
            b'U' => TypeCode::Unicode,
            b'V' => TypeCode::Void,
            other => TypeCode::Other(other),
        }
    }

    pub fn to_char(self) -> u8 {
        match self {
            TypeCode::Int => b'i',
            TypeCode::Uint => b'u',
            TypeCode::Float => b'f',
            TypeCode::Complex => b'c',
            TypeCode::Bool => b'?',
            TypeCode::Byte => b'b',
            TypeCode::DateTime => b'M',
            TypeCode::TimeDelta => b'm',
            TypeCode::Object => b'O',
            TypeCode::ByteString => b'S',
            TypeCode::Unicode => b'U',
            TypeCode::Void => b'V',
            TypeCode::Other(c) => c,
        }
    }

    /// Per-unit byte multiplier used in item-size computation: 4 for
    /// UCS-4 `U`, 8 for object-slot pointers, 1 for everything else
    /// (numeric `size` is already in bytes).
    fn multiplier(self) -> u64 {
        match self {
            TypeCode::Unicode => 4,
            TypeCode::Object => 8,
            _ => 1,
        }
    }
}

/// A node in the recursive dtype tree. A leaf (`fields.is_empty()`)
/// describes a scalar or a fixed-shape sub-array of scalars; a
/// structured node has non-empty `fields` and its own `type_code`/`size`
/// are not meaningful.
#[derive(Debug, Clone, PartialEq)]
pub struct Dtype {
    pub name: String,
    pub endianness: Endianness,
    pub type_code: TypeCode,
    pub size: u32,
    pub item_size: u64,
    pub offset: u64,
    pub shape: Vec<u64>,
    pub fields: Vec<Dtype>,
    field_index: HashMap<String, usize>,
}

impl Dtype {
    fn leaf(endianness: Endianness, type_code: TypeCode, size: u32) -> Self {
        let item_size = type_code.multiplier() * size as u64;
        Dtype {
            name: String::new(),
            endianness,
            type_code,
            size,
            item_size,
            offset: 0,
            shape: Vec::new(),
            fields: Vec::new(),
            field_index: HashMap::new(),
        }
    }

    pub fn int64() -> Self {
        Dtype::leaf(Endianness::Native, TypeCode::Int, 8)
    }

    pub fn is_structured_array(&self) -> bool {
        !self.fields.is_empty()
    }

    /// O(1) lookup of a direct child field by name.
    pub fn find_field(&self, name: &str) -> Option<&Dtype> {
        self.field_index.get(name).map(|&i| &self.fields[i])
    }

    /// Chained field lookup through multiple levels of nested records,
    /// e.g. `find_path(&["countries", "c2", "gdp"])`. Mirrors
    /// `get_nested_dtype`'s variadic recursion. The returned dtype's own
    /// `offset` is local to its immediate parent, per invariant 3; use
    /// [`Dtype::offset_of`] for the cumulative byte offset from the root.
    pub fn find_path(&self, path: &[&str]) -> Option<&Dtype> {
        let mut current = self;
        for name in path {
            current = current.find_field(name)?;
        }
        Some(current)
    }

    /// Cumulative byte offset of the field reached by `path`, summing
    /// each level's parent-local `offset` along the way.
    pub fn offset_of(&self, path: &[&str]) -> Option<u64> {
        let mut current = self;
        let mut total = 0u64;
        for name in path {
            current = current.find_field(name)?;
            total += current.offset;
        }
        Some(total)
    }

    /// Checks invariant 3 recursively: a record's `item_size` equals the
    /// sum of its fields' `item_size`, and each field's `offset` equals
    /// the running sum of its preceding siblings' `item_size`.
    pub fn validate(&self) -> bool {
        if !self.is_structured_array() {
            return true;
        }
        let mut expected_offset = 0u64;
        for field in &self.fields {
            if field.offset != expected_offset || !field.validate() {
                return false;
            }
            expected_offset += field.item_size;
        }
        expected_offset == self.item_size
    }

    /// Reconstructs this dtype's `descr` entry as a Python-literal
    /// string, matching `operator<<`/`serialize_dtype_descr` in shape
    /// (a bare typestr for scalars, a list of `(name, type[, shape])`
    /// tuples for records).
    pub fn to_descr_string(&self) -> String {
        let mut s = String::new();
        self.write_descr(&mut s);
        s
    }

    fn write_descr(&self, out: &mut String) {
        if self.is_structured_array() {
            out.push('[');
            for (i, field) in self.fields.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                field.write_field_tuple(out);
            }
            out.push(']');
        } else {
            self.write_typestr(out);
        }
    }

    fn write_field_tuple(&self, out: &mut String) {
        out.push('(');
        out.push('\'');
        out.push_str(&self.name);
        out.push_str("', ");
        self.write_descr(out);
        if !self.shape.is_empty() && !self.is_structured_array() {
            out.push_str(", (");
            for dim in &self.shape {
                out.push_str(&dim.to_string());
                out.push(',');
            }
            out.push(')');
        }
        out.push(')');
    }

    fn write_typestr(&self, out: &mut String) {
        out.push('\'');
        out.push(self.endianness.to_char());
        out.push(self.type_code.to_char() as char);
        out.push_str(&self.size.to_string());
        out.push('\'');
    }

    /// Builds a `Dtype` tree from an already-parsed `descr` value (either
    /// a bare typestr `PyValue::Str` or a `PyValue::List` of field
    /// tuples), per spec §4.2.
    pub fn from_descr(value: &PyValue) -> Result<Dtype, NpyError> {
        match value {
            PyValue::Str(s) => parse_typestr(s, String::new()),
            PyValue::List(items) => parse_record(items, String::new()),
            _ => Err(NpyError::with_detail(Status::DESCR_ERROR, Detail::DescrInvalid)),
        }
    }
}

fn parse_typestr(s: &str, name: String) -> Result<Dtype, NpyError> {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() < 3 {
        return Err(NpyError::with_detail(Status::DESCR_ERROR, Detail::DescrInvalidString));
    }
    let endianness = Endianness::from_char(chars[0]);
    let type_code = TypeCode::from_char(chars[1] as u8);
    let size_str: String = chars[2..].iter().collect();
    let size: u32 = size_str
        .parse()
        .map_err(|_| NpyError::with_detail(Status::DESCR_ERROR, Detail::DescrInvalidString))?;
    let mut dtype = Dtype::leaf(endianness, type_code, size);
    dtype.name = name;
    Ok(dtype)
}

fn parse_record(items: &[PyValue], name: String) -> Result<Dtype, NpyError> {
    if items.is_empty() {
        return Err(NpyError::with_detail(Status::DESCR_ERROR, Detail::DescrListEmpty));
    }
    let mut fields = Vec::with_capacity(items.len());
    let mut field_index = HashMap::with_capacity(items.len());
    let mut offset: u64 = 0;
    let mut total_item_size: u64 = 0;
    for item in items {
        let tuple = item
            .as_tuple()
            .ok_or_else(|| NpyError::with_detail(Status::DESCR_ERROR, Detail::DescrListInvalidType))?;
        if tuple.len() != 2 && tuple.len() != 3 {
            return Err(NpyError::with_detail(Status::DESCR_ERROR, Detail::DescrListIncompleteValue));
        }
        let field_name = tuple[0]
            .as_str()
            .ok_or_else(|| NpyError::with_detail(Status::DESCR_ERROR, Detail::DescrListInvalidValue))?
            .to_string();
        let mut field = match &tuple[1] {
            PyValue::Str(s) => parse_typestr(s, field_name.clone())?,
            PyValue::List(sub) => parse_record(sub, field_name.clone())?,
            _ => return Err(NpyError::with_detail(Status::DESCR_ERROR, Detail::DescrListSubtypeNotSupported)),
        };
        if tuple.len() == 3 {
            let shape_tuple = tuple[2]
                .as_tuple()
                .ok_or_else(|| NpyError::with_detail(Status::DESCR_ERROR, Detail::DescrListInvalidShape))?;
            let mut shape = Vec::with_capacity(shape_tuple.len());
            for dim in shape_tuple {
                let n = dim
                    .as_int()
                    .ok_or_else(|| NpyError::with_detail(Status::DESCR_ERROR, Detail::DescrListInvalidShapeValue))?;
                shape.push(n as u64);
            }
            let multiplier: u64 = shape.iter().product::<u64>().max(1);
            field.item_size *= multiplier;
            field.shape = shape;
        }
        field.offset = offset;
        offset += field.item_size;
        total_item_size += field.item_size;
        field_index.insert(field_name, fields.len());
        fields.push(field);
    }
    Ok(Dtype {
        name,
        endianness: Endianness::NotRelevant,
        type_code: TypeCode::Void,
        size: 0,
        item_size: total_item_size,
        offset: 0,
        shape: Vec::new(),
        fields,
        field_index,
    })
}
