//! Layout-directed serializer.
//!
//! The [`Serializer`] writes one value into a byte range whose meaning is
//! fixed by a [`RecordLayout`]: a whole record, a nested record, an array, a
//! byte sequence or a single atomic field. Compound values descend into child
//! serializers scoped to each field's own sub-range, so offsets, padding and
//! trailing bytes all come from the layout and never from the value.
//!
//! ## Wire format summary
//! - The output is always exactly `layout.size()` bytes
//! - Padding (explicit, alignment and trailing) is zero
//! - Integers: the field's width, two's complement, in the record byte order
//! - Floats: IEEE 754 binary16/32/64
//! - Booleans: one byte, 0 or 1
//! - Byte sequences: copied, truncated or zero-filled to the declared length
//! - Records, arrays: fields/elements at their planned offsets, row-major
//!
//! Values are matched to fields by position. Serde structs, tuples, tuple
//! structs and sequences all map onto records and arrays.

use crate::atomic::{self, BYTE_ELEMENT, FloatWidth, ValueDomain};
use crate::error::{Error, Result};
use crate::field::Slot;
use crate::layout::RecordLayout;
use crate::options::ByteOrder;
use crate::validate::float_fits;
use crate::value::Value;
use serde::ser::{self, Impossible, Serialize, Serializer as _};
use std::io::Write;

// ── Public entry points ────────────────────────────────────────────────────

/// Serialize `value` into a freshly allocated buffer of `layout.size()` bytes.
///
/// On error no buffer is returned.
pub fn to_bytes<T: Serialize + ?Sized>(layout: &RecordLayout, value: &T) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; layout.size()];
    value.serialize(Serializer::new(layout, &mut buf)?)?;
    Ok(buf)
}

/// Serialize `value` and write the packed record to `writer`.
///
/// The record is packed in full before anything is written, so a value that
/// fails to serialize never produces partial output.
pub fn to_writer<W: Write, T: Serialize + ?Sized>(
    mut writer: W,
    layout: &RecordLayout,
    value: &T,
) -> Result<()> {
    let buf = to_bytes(layout, value)?;
    writer.write_all(&buf).map_err(|e| Error::Io(e.to_string()))
}

/// Pack a dynamic [`Value::Record`] according to `layout`.
pub fn pack(layout: &RecordLayout, value: &Value) -> Result<Vec<u8>> {
    to_bytes(layout, value)
}

// ── Serializer ─────────────────────────────────────────────────────────────

/// Serializer for one slot of a record layout.
///
/// Obtain one via [`to_bytes`] / [`pack`], or construct directly to pack into
/// a caller-owned buffer:
///
/// ```rust
/// use cstruct_serde::{AtomicTag, ByteOrder, RecordLayout, RecordOptions};
/// use cstruct_serde::ser::Serializer;
/// use serde::Serialize;
///
/// let layout = RecordLayout::builder("Id")
///     .options(RecordOptions::std(ByteOrder::Big))
///     .field("id", AtomicTag::U32)
///     .build()
///     .unwrap();
///
/// let mut buf = [0xFFu8; 6];
/// (42u32,).serialize(Serializer::new(&layout, &mut buf).unwrap()).unwrap();
/// assert_eq!(buf, [0, 0, 0, 42, 0xFF, 0xFF]);
/// ```
pub struct Serializer<'a> {
    out: &'a mut [u8],
    slot: Slot<'a>,
    order: ByteOrder,
    field: &'a str,
}

impl<'a> Serializer<'a> {
    /// Create a serializer that packs a whole `layout` record into the start
    /// of `out`. The record's bytes are zeroed first; bytes past
    /// `layout.size()` are left untouched.
    ///
    /// If serialization then fails, the first `layout.size()` bytes of `out`
    /// hold a zeroed, partly written record and must not be used. Use
    /// [`to_bytes`] or [`to_writer`] when a failed pack must leave nothing
    /// behind.
    pub fn new(layout: &'a RecordLayout, out: &'a mut [u8]) -> Result<Self> {
        let have = out.len();
        let out = out.get_mut(..layout.size()).ok_or(Error::TruncatedBuffer {
            need: layout.size(),
            have,
        })?;
        out.fill(0);
        Ok(Serializer {
            out,
            slot: Slot::Record(layout),
            order: layout.byte_order(),
            field: layout.name(),
        })
    }

    // ── Internal helpers ───────────────────────────────────────────────────

    fn mismatch(&self, got: &'static str) -> Error {
        Error::InvalidType {
            field: self.field.to_string(),
            expected: self.slot.expected(),
            got,
        }
    }

    fn out_of_range(&self, domain: ValueDomain, value: impl ToString) -> Error {
        Error::Range {
            field: self.field.to_string(),
            domain,
            value: value.to_string(),
        }
    }

    /// Integer into an integer, char or float field.
    fn write_integer(self, v: i128) -> Result<()> {
        let Slot::Atomic(kind) = self.slot else {
            return Err(self.mismatch("integer"));
        };
        match kind.domain() {
            ValueDomain::Float(_) => self.write_float(v as f64),
            ValueDomain::Bool => Err(self.mismatch("integer")),
            domain => {
                if !domain.contains(v) {
                    return Err(self.out_of_range(domain, v));
                }
                atomic::write_uint(self.out, v as u64, self.order);
                Ok(())
            }
        }
    }

    /// Float (or integer promoted to float) into a float field.
    fn write_float(self, v: f64) -> Result<()> {
        let Slot::Atomic(kind) = self.slot else {
            return Err(self.mismatch("float"));
        };
        let ValueDomain::Float(width) = kind.domain() else {
            return Err(self.mismatch("float"));
        };
        if !float_fits(width, v) {
            return Err(self.out_of_range(kind.domain(), v));
        }
        let bits = match width {
            FloatWidth::Half => u64::from(half::f16::from_f64(v).to_bits()),
            FloatWidth::Single => u64::from((v as f32).to_bits()),
            FloatWidth::Double => v.to_bits(),
        };
        atomic::write_uint(self.out, bits, self.order);
        Ok(())
    }

    fn compound(self) -> Result<Compound<'a>> {
        match self.slot {
            Slot::Record(_) | Slot::Array { .. } | Slot::Bytes(_) => Ok(Compound {
                ser: self,
                index: 0,
            }),
            Slot::Atomic(_) => Err(self.mismatch("sequence")),
        }
    }
}

// ── serde::Serializer impl ─────────────────────────────────────────────────

impl<'a> ser::Serializer for Serializer<'a> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = Compound<'a>;
    type SerializeTuple = Compound<'a>;
    type SerializeTupleStruct = Compound<'a>;
    type SerializeTupleVariant = Impossible<(), Error>;
    type SerializeMap = Impossible<(), Error>;
    type SerializeStruct = Compound<'a>;
    type SerializeStructVariant = Impossible<(), Error>;

    // ── Primitives ─────────────────────────────────────────────────────────

    /// Bool → one byte, 0 or 1
    fn serialize_bool(self, v: bool) -> Result<()> {
        match self.slot {
            Slot::Atomic(kind) if kind.domain() == ValueDomain::Bool => {
                atomic::write_uint(self.out, u64::from(v), self.order);
                Ok(())
            }
            _ => Err(self.mismatch("bool")),
        }
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.write_integer(i128::from(v))
    }
    fn serialize_i16(self, v: i16) -> Result<()> {
        self.write_integer(i128::from(v))
    }
    fn serialize_i32(self, v: i32) -> Result<()> {
        self.write_integer(i128::from(v))
    }
    fn serialize_i64(self, v: i64) -> Result<()> {
        self.write_integer(i128::from(v))
    }
    fn serialize_i128(self, v: i128) -> Result<()> {
        self.write_integer(v)
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.write_integer(i128::from(v))
    }
    fn serialize_u16(self, v: u16) -> Result<()> {
        self.write_integer(i128::from(v))
    }
    fn serialize_u32(self, v: u32) -> Result<()> {
        self.write_integer(i128::from(v))
    }
    fn serialize_u64(self, v: u64) -> Result<()> {
        self.write_integer(i128::from(v))
    }
    fn serialize_u128(self, v: u128) -> Result<()> {
        match i128::try_from(v) {
            Ok(v) => self.write_integer(v),
            Err(_) => match self.slot {
                Slot::Atomic(kind) => Err(self.out_of_range(kind.domain(), v)),
                _ => Err(self.mismatch("integer")),
            },
        }
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.write_float(f64::from(v))
    }
    fn serialize_f64(self, v: f64) -> Result<()> {
        self.write_float(v)
    }

    /// char → one byte; only U+0000..=U+00FF fit
    fn serialize_char(mut self, v: char) -> Result<()> {
        match self.slot {
            Slot::Atomic(kind) if kind.domain() == ValueDomain::Char => match u8::try_from(v) {
                Ok(b) => {
                    self.out[0] = b;
                    Ok(())
                }
                Err(_) => Err(self.out_of_range(ValueDomain::Char, format!("{:?}", v))),
            },
            _ => Err(self.mismatch("char")),
        }
    }

    /// UTF-8 text into a byte sequence (or a one-byte string into a char)
    fn serialize_str(self, v: &str) -> Result<()> {
        self.serialize_bytes(v.as_bytes())
    }

    /// Byte sequence → first `len` bytes, zero-filled when shorter
    fn serialize_bytes(mut self, v: &[u8]) -> Result<()> {
        match self.slot {
            Slot::Bytes(len) => {
                let n = len.min(v.len());
                self.out[..n].copy_from_slice(&v[..n]);
                Ok(())
            }
            Slot::Atomic(kind) if kind.domain() == ValueDomain::Char => {
                if v.len() != 1 {
                    return Err(Error::Shape {
                        field: self.field.to_string(),
                        expected: 1,
                        got: v.len(),
                    });
                }
                self.out[0] = v[0];
                Ok(())
            }
            _ => Err(self.mismatch("bytes")),
        }
    }

    fn serialize_none(self) -> Result<()> {
        Err(Error::Unsupported("optional values"))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _value: &T) -> Result<()> {
        Err(Error::Unsupported("optional values"))
    }

    fn serialize_unit(self) -> Result<()> {
        Err(Error::Unsupported("unit values"))
    }
    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        Err(Error::Unsupported("unit values"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<()> {
        Err(Error::Unsupported("enums"))
    }

    /// Newtype structs are transparent
    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<()> {
        Err(Error::Unsupported("enums"))
    }

    /// Sequence → record fields, array elements or bytes, in order
    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        self.compound()
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        self.compound()
    }
    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        self.compound()
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(Error::Unsupported("enums"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(Error::Unsupported("maps"))
    }

    /// Struct → record fields by position; field names are not consulted
    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        self.compound()
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(Error::Unsupported("enums"))
    }
}

// ── Compound serializer ────────────────────────────────────────────────────

/// Writes the elements of a record, array or byte sequence one by one.
pub struct Compound<'a> {
    ser: Serializer<'a>,
    index: usize,
}

impl<'a> Compound<'a> {
    fn element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let index = self.index;
        self.index += 1;
        let order = self.ser.order;
        let field = self.ser.field;

        match self.ser.slot {
            Slot::Record(layout) => {
                let Some(f) = layout.fields().get(index) else {
                    return Err(Error::Shape {
                        field: field.to_string(),
                        expected: layout.fields().len(),
                        got: index + 1,
                    });
                };
                let start = f.offset();
                value.serialize(Serializer {
                    out: &mut self.ser.out[start..start + f.size()],
                    slot: Slot::from(f.shape()),
                    order,
                    field: f.name(),
                })
            }
            Slot::Array { element, count } => {
                if index >= count {
                    return Err(Error::Shape {
                        field: field.to_string(),
                        expected: count,
                        got: index + 1,
                    });
                }
                let size = element.size();
                let start = index * size;
                value.serialize(Serializer {
                    out: &mut self.ser.out[start..start + size],
                    slot: Slot::from(element),
                    order,
                    field,
                })
            }
            // Surplus bytes are dropped.
            Slot::Bytes(len) if index >= len => Ok(()),
            Slot::Bytes(_) => value.serialize(Serializer {
                out: &mut self.ser.out[index..index + 1],
                slot: Slot::Atomic(&BYTE_ELEMENT),
                order,
                field,
            }),
            Slot::Atomic(_) => Err(self.ser.mismatch("sequence")),
        }
    }

    fn finish(self) -> Result<()> {
        let expected = match self.ser.slot {
            Slot::Record(layout) => layout.fields().len(),
            Slot::Array { count, .. } => count,
            Slot::Bytes(_) | Slot::Atomic(_) => return Ok(()),
        };
        if self.index != expected {
            return Err(Error::Shape {
                field: self.ser.field.to_string(),
                expected,
                got: self.index,
            });
        }
        Ok(())
    }
}

macro_rules! forward_serialize_element {
    ($t:ty, $method:ident) => {
        impl<'a> $t for Compound<'a> {
            type Ok = ();
            type Error = Error;
            fn $method<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
                self.element(value)
            }
            fn end(self) -> Result<()> {
                self.finish()
            }
        }
    };
}

forward_serialize_element!(ser::SerializeSeq, serialize_element);
forward_serialize_element!(ser::SerializeTuple, serialize_element);
forward_serialize_element!(ser::SerializeTupleStruct, serialize_field);

impl<'a> ser::SerializeStruct for Compound<'a> {
    type Ok = ();
    type Error = Error;
    fn serialize_field<T: Serialize + ?Sized>(&mut self, _key: &'static str, value: &T) -> Result<()> {
        self.element(value)
    }
    /// A skipped field keeps its slot, left as zero bytes.
    fn skip_field(&mut self, _key: &'static str) -> Result<()> {
        self.index += 1;
        Ok(())
    }
    fn end(self) -> Result<()> {
        self.finish()
    }
}
