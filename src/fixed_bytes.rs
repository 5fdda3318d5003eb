//! Serde helper module for `[u8; N]` byte-sequence fields.
//!
//! Serde implements arrays only up to 32 elements, and as tuples of `u8`.
//! Annotating a field with `#[serde(with = "cstruct_serde::fixed_bytes")]`
//! instead routes it through `serialize_bytes` / `deserialize_bytes`, so any
//! `N` works and the field maps straight onto a `Bytes(len)` field of the
//! layout.
//!
//! # Usage
//!
//! ```rust
//! use cstruct_serde::{AtomicTag, ByteOrder, FieldType, RecordLayout, RecordOptions};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Label {
//!     id: u16,
//!     #[serde(with = "cstruct_serde::fixed_bytes")]
//!     text: [u8; 40],
//! }
//!
//! let layout = RecordLayout::builder("Label")
//!     .options(RecordOptions::std(ByteOrder::Little))
//!     .field("id", AtomicTag::U16)
//!     .field("text", FieldType::bytes(40))
//!     .build()
//!     .unwrap();
//!
//! let mut text = [0u8; 40];
//! text[..5].copy_from_slice(b"hello");
//! let label = Label { id: 3, text };
//!
//! let bytes = layout.to_bytes(&label).unwrap();
//! assert_eq!(bytes.len(), 42);
//! assert_eq!(&bytes[2..7], b"hello");
//!
//! let decoded: Label = layout.from_bytes(&bytes).unwrap();
//! assert_eq!(decoded, label);
//! ```
//!
//! # Length mismatch
//!
//! The array length does not have to match the field's declared length.
//! Packing truncates or zero-fills to the field; unpacking truncates or
//! zero-fills to `N`.

// ── Sealed trait ──────────────────────────────────────────────────────────

mod private {
    pub trait Sealed {}
}

/// Marker trait for fixed-size byte containers.
///
/// This trait is sealed: only `[u8; N]` implements it.
pub trait FixedBytes: private::Sealed + Sized {
    fn fixed_len() -> usize;
    fn as_bytes(&self) -> &[u8];
    /// Build from `bytes`, truncating or zero-filling to `fixed_len()`.
    fn from_prefix(bytes: &[u8]) -> Self;
}

impl<const N: usize> private::Sealed for [u8; N] {}

impl<const N: usize> FixedBytes for [u8; N] {
    fn fixed_len() -> usize {
        N
    }
    fn as_bytes(&self) -> &[u8] {
        self.as_slice()
    }
    fn from_prefix(bytes: &[u8]) -> Self {
        let mut out = [0u8; N];
        let n = N.min(bytes.len());
        out[..n].copy_from_slice(&bytes[..n]);
        out
    }
}

// ── serde `with` module functions ─────────────────────────────────────────

pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: FixedBytes,
    S: serde::Serializer,
{
    serializer.serialize_bytes(value.as_bytes())
}

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: FixedBytes,
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_bytes(FixedBytesVisitor::<T>(std::marker::PhantomData))
}

// ── Internal types ─────────────────────────────────────────────────────────

struct FixedBytesVisitor<T>(std::marker::PhantomData<T>);

impl<'de, T: FixedBytes> serde::de::Visitor<'de> for FixedBytesVisitor<T> {
    type Value = T;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "a byte sequence of at most {} bytes", T::fixed_len())
    }

    fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<T, E> {
        Ok(T::from_prefix(v))
    }
    fn visit_byte_buf<E: serde::de::Error>(self, v: Vec<u8>) -> Result<T, E> {
        self.visit_bytes(&v)
    }
    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<T, E> {
        self.visit_bytes(v.as_bytes())
    }

    // Formats without a native bytes type hand the field over as a sequence.
    fn visit_seq<A: serde::de::SeqAccess<'de>>(self, mut seq: A) -> Result<T, A::Error> {
        let mut buf = Vec::with_capacity(T::fixed_len());
        while let Some(b) = seq.next_element::<u8>()? {
            buf.push(b);
        }
        Ok(T::from_prefix(&buf))
    }
}
