//! Layout-directed deserializer.
//!
//! Reads one packed record back into any `Deserialize` type. Like the
//! serializer, every [`Deserializer`] is scoped to a single byte range and a
//! single slot of the layout: records and arrays hand out child deserializers
//! over each field's own bytes, so padding is never looked at.
//!
//! Self-describing consumers (such as [`Value`]) go through `deserialize_any`,
//! which presents records as maps keyed by field name, arrays as sequences,
//! byte sequences as borrowed bytes and scalars with the visitor method that
//! matches their width. Derived structs and tuples read records positionally.

use crate::atomic::{self, FloatWidth, ValueDomain};
use crate::error::{Error, Result};
use crate::field::{FieldShape, Slot};
use crate::layout::RecordLayout;
use crate::options::ByteOrder;
use crate::value::Value;
use serde::de::value::{SeqDeserializer, StrDeserializer};
use serde::de::{
    self, Deserialize, DeserializeOwned, DeserializeSeed, Deserializer as _, Visitor,
};
use std::io::{ErrorKind, Read};

// ── Public entry points ────────────────────────────────────────────────────

/// Deserialize a `T` from a packed `layout` record.
///
/// `input` must hold at least `layout.size()` bytes; anything after the
/// record is ignored. Use [`from_bytes_partial`] to get the rest back.
pub fn from_bytes<'de, T: Deserialize<'de>>(layout: &RecordLayout, input: &'de [u8]) -> Result<T> {
    from_bytes_partial(layout, input).map(|(value, _)| value)
}

/// Like [`from_bytes`], but also returns the bytes following the record.
///
/// Handy for reading records laid out back to back in one buffer.
pub fn from_bytes_partial<'de, T: Deserialize<'de>>(
    layout: &RecordLayout,
    input: &'de [u8],
) -> Result<(T, &'de [u8])> {
    let de = Deserializer::new(layout, input)?;
    let value = T::deserialize(de)?;
    Ok((value, &input[layout.size()..]))
}

/// Read exactly one record from `reader` and deserialize it.
pub fn from_reader<R: Read, T: DeserializeOwned>(mut reader: R, layout: &RecordLayout) -> Result<T> {
    let need = layout.size();
    let mut buf = vec![0u8; need];
    let mut have = 0;
    while have < need {
        match reader.read(&mut buf[have..]) {
            Ok(0) => return Err(Error::TruncatedBuffer { need, have }),
            Ok(n) => have += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e.to_string())),
        }
    }
    from_bytes(layout, &buf)
}

/// Unpack a packed `layout` record into a dynamic [`Value::Record`].
pub fn unpack(layout: &RecordLayout, input: &[u8]) -> Result<Value> {
    from_bytes(layout, input)
}

// ── Deserializer ───────────────────────────────────────────────────────────

/// Deserializer for one slot of a record layout.
pub struct Deserializer<'a, 'de> {
    input: &'de [u8],
    slot: Slot<'a>,
    order: ByteOrder,
    field: &'a str,
}

impl<'a, 'de> Deserializer<'a, 'de> {
    /// Create a deserializer for a whole `layout` record at the start of `input`.
    pub fn new(layout: &'a RecordLayout, input: &'de [u8]) -> Result<Self> {
        let input = input.get(..layout.size()).ok_or(Error::TruncatedBuffer {
            need: layout.size(),
            have: input.len(),
        })?;
        Ok(Deserializer {
            input,
            slot: Slot::Record(layout),
            order: layout.byte_order(),
            field: layout.name(),
        })
    }

    fn mismatch(&self, wanted: &'static str) -> Error {
        Error::InvalidType {
            field: self.field.to_string(),
            expected: wanted,
            got: self.slot.expected(),
        }
    }

    fn visit_atomic<V: Visitor<'de>>(self, domain: ValueDomain, visitor: V) -> Result<V::Value> {
        let bytes = self.input;
        match domain {
            // Any non-zero byte reads as true.
            ValueDomain::Bool => visitor.visit_bool(bytes[0] != 0),
            ValueDomain::Char => visitor.visit_char(char::from(bytes[0])),
            ValueDomain::Signed { bits, .. } => {
                let v = atomic::read_int(bytes, self.order);
                match bits {
                    8 => visitor.visit_i8(v as i8),
                    16 => visitor.visit_i16(v as i16),
                    32 => visitor.visit_i32(v as i32),
                    _ => visitor.visit_i64(v),
                }
            }
            ValueDomain::Unsigned { bits, .. } => {
                let v = atomic::read_uint(bytes, self.order);
                match bits {
                    8 => visitor.visit_u8(v as u8),
                    16 => visitor.visit_u16(v as u16),
                    32 => visitor.visit_u32(v as u32),
                    _ => visitor.visit_u64(v),
                }
            }
            ValueDomain::Float(width) => {
                let bits = atomic::read_uint(bytes, self.order);
                match width {
                    FloatWidth::Half => visitor.visit_f32(half::f16::from_bits(bits as u16).to_f32()),
                    FloatWidth::Single => visitor.visit_f32(f32::from_bits(bits as u32)),
                    FloatWidth::Double => visitor.visit_f64(f64::from_bits(bits)),
                }
            }
        }
    }

    /// Integers are read by their field width; a char field reads as its byte.
    fn deserialize_integer<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.slot {
            Slot::Atomic(kind) if kind.domain() == ValueDomain::Char => visitor.visit_u8(self.input[0]),
            _ => self.deserialize_any(visitor),
        }
    }

    fn visit_elements<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.slot {
            Slot::Record(layout) => {
                let mut access = RecordAccess::new(layout, self.input, self.order);
                let value = visitor.visit_seq(&mut access)?;
                access.finish(self.field)?;
                Ok(value)
            }
            Slot::Array { element, count } => {
                let mut access = ArrayAccess {
                    input: self.input,
                    element,
                    count,
                    index: 0,
                    order: self.order,
                    field: self.field,
                };
                let value = visitor.visit_seq(&mut access)?;
                access.finish()?;
                Ok(value)
            }
            Slot::Bytes(_) => {
                let mut seq = SeqDeserializer::<_, Error>::new(self.input.iter().copied());
                let value = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(value)
            }
            Slot::Atomic(_) => Err(self.mismatch("sequence")),
        }
    }
}

// ── serde::Deserializer impl ───────────────────────────────────────────────

impl<'a, 'de> de::Deserializer<'de> for Deserializer<'a, 'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.slot {
            Slot::Record(layout) => {
                let mut access = RecordAccess::new(layout, self.input, self.order);
                visitor.visit_map(&mut access)
            }
            Slot::Atomic(kind) => self.visit_atomic(kind.domain(), visitor),
            Slot::Bytes(_) => visitor.visit_borrowed_bytes(self.input),
            Slot::Array { .. } => self.visit_elements(visitor),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_any(visitor)
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_integer(visitor)
    }
    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_integer(visitor)
    }
    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_integer(visitor)
    }
    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_integer(visitor)
    }
    fn deserialize_i128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_integer(visitor)
    }
    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_integer(visitor)
    }
    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_integer(visitor)
    }
    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_integer(visitor)
    }
    fn deserialize_u128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_any(visitor)
    }
    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_any(visitor)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_any(visitor)
    }

    /// A byte sequence read as text stops at its first NUL, like a C string.
    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.slot {
            Slot::Bytes(_) => {
                let end = self
                    .input
                    .iter()
                    .position(|&b| b == 0)
                    .unwrap_or(self.input.len());
                let text = &self.input[..end];
                match std::str::from_utf8(text) {
                    Ok(s) => visitor.visit_borrowed_str(s),
                    Err(_) => Err(de::Error::invalid_value(de::Unexpected::Bytes(text), &visitor)),
                }
            }
            _ => self.deserialize_any(visitor),
        }
    }
    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.slot {
            Slot::Bytes(_) | Slot::Atomic(_) => visitor.visit_borrowed_bytes(self.input),
            _ => Err(self.mismatch("bytes")),
        }
    }
    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::Unsupported("optional values"))
    }

    fn deserialize_unit<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::Unsupported("unit values"))
    }
    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _visitor: V,
    ) -> Result<V::Value> {
        Err(Error::Unsupported("unit values"))
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.visit_elements(visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.visit_elements(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.visit_elements(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.slot {
            Slot::Record(_) => self.deserialize_any(visitor),
            _ => Err(self.mismatch("record")),
        }
    }

    /// Structs read record fields by position.
    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.slot {
            Slot::Record(_) => self.visit_elements(visitor),
            _ => Err(self.mismatch("record")),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value> {
        Err(Error::Unsupported("enums"))
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

// ── Access helpers ─────────────────────────────────────────────────────────

/// Walks the fields of a record, as a sequence or as a name → value map.
struct RecordAccess<'a, 'de> {
    layout: &'a RecordLayout,
    input: &'de [u8],
    order: ByteOrder,
    index: usize,
}

impl<'a, 'de> RecordAccess<'a, 'de> {
    fn new(layout: &'a RecordLayout, input: &'de [u8], order: ByteOrder) -> Self {
        RecordAccess {
            layout,
            input,
            order,
            index: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.layout.fields().len() - self.index
    }

    fn next_field(&mut self) -> Deserializer<'a, 'de> {
        let f = &self.layout.fields()[self.index];
        self.index += 1;
        Deserializer {
            input: &self.input[f.offset()..f.offset() + f.size()],
            slot: Slot::from(f.shape()),
            order: self.order,
            field: f.name(),
        }
    }

    fn finish(&self, field: &str) -> Result<()> {
        if self.remaining() != 0 {
            return Err(Error::Shape {
                field: field.to_string(),
                expected: self.layout.fields().len(),
                got: self.index,
            });
        }
        Ok(())
    }
}

impl<'a, 'de> de::SeqAccess<'de> for RecordAccess<'a, 'de> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        if self.remaining() == 0 {
            return Ok(None);
        }
        seed.deserialize(self.next_field()).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining())
    }
}

impl<'a, 'de> de::MapAccess<'de> for RecordAccess<'a, 'de> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        if self.remaining() == 0 {
            return Ok(None);
        }
        let name = self.layout.fields()[self.index].name();
        seed.deserialize(StrDeserializer::<Error>::new(name)).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        if self.remaining() == 0 {
            return Err(Error::Message("record value requested past the last field".into()));
        }
        seed.deserialize(self.next_field())
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining())
    }
}

/// Walks the elements of a fixed-length array.
struct ArrayAccess<'a, 'de> {
    input: &'de [u8],
    element: &'a FieldShape,
    count: usize,
    index: usize,
    order: ByteOrder,
    field: &'a str,
}

impl<'a, 'de> ArrayAccess<'a, 'de> {
    fn finish(&self) -> Result<()> {
        if self.index != self.count {
            return Err(Error::Shape {
                field: self.field.to_string(),
                expected: self.count,
                got: self.index,
            });
        }
        Ok(())
    }
}

impl<'a, 'de> de::SeqAccess<'de> for ArrayAccess<'a, 'de> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        if self.index >= self.count {
            return Ok(None);
        }
        let size = self.element.size();
        let start = self.index * size;
        self.index += 1;
        seed.deserialize(Deserializer {
            input: &self.input[start..start + size],
            slot: Slot::from(self.element),
            order: self.order,
            field: self.field,
        })
        .map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.count - self.index)
    }
}
