//! # cstruct-serde
//!
//! Fixed-layout binary records compatible with C structs, built on top of the
//! `serde` framework.
//!
//! ## Overview
//!
//! A record is declared once as an ordered list of typed fields. Declaring it
//! produces an immutable [`RecordLayout`]: the byte offset of every field, the
//! record's alignment and its exact total size. Values are then packed into,
//! and unpacked from, buffers of exactly that size.
//!
//! Two size modes are available:
//!
//! - **native**: field widths and alignment follow the host C ABI (`int`,
//!   `long`, `size_t`, ...). Fields are aligned and the record is padded at
//!   the end, the way a C compiler lays out a struct.
//! - **std**: fixed-width integers (`i8` through `u64`), no implicit padding,
//!   and a selectable byte order (`little`, `big`, `network`, `native`).
//!
//! Fields can be scalars, fixed-length byte sequences, fixed-length arrays
//! (nestable for multi-dimensional arrays) or other records of the same mode
//! and byte order. Explicit padding can be added before and after any field.
//!
//! ## Serde type mapping
//!
//! Values are matched to fields **by position**.
//!
//! | Rust / serde type | Field kind |
//! |-------------------|------------|
//! | `bool`            | `Bool`: one byte, 0 or 1 |
//! | any integer       | integer kinds, range-checked against the field width |
//! | `u8`, `char` ≤ U+00FF | `Char`: one byte |
//! | `f32`, `f64`      | `F16`, `F32`, `F64` |
//! | `&[u8]`, `&str`, `ByteBuf` | byte sequences, truncated or zero-filled |
//! | `[u8; N]` with [`fixed_bytes`] | byte sequences of any `N` |
//! | struct, tuple, tuple struct | records |
//! | `Vec<T>`, `[T; N]`, tuple | arrays |
//! | newtype struct    | its inner value |
//!
//! `Option`, unit, maps and enums have no fixed-layout meaning and fail with
//! [`Error::Unsupported`]. For layouts only known at run time, the dynamic
//! [`Value`] type goes through the same codec via [`pack`] and [`unpack`].
//!
//! ## Example
//!
//! ```rust
//! use cstruct_serde::{AtomicTag, ByteOrder, FieldType, RecordLayout, RecordOptions};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Sample {
//!     x: i32,
//!     y: f64,
//!     z: u16,
//!     #[serde(with = "serde_bytes")]
//!     s: Vec<u8>,
//! }
//!
//! let layout = RecordLayout::builder("Sample")
//!     .options(RecordOptions::std(ByteOrder::Little))
//!     .field("x", AtomicTag::I32)
//!     .field("y", AtomicTag::F64)
//!     .field("z", AtomicTag::U16)
//!     .field("s", FieldType::bytes(10))
//!     .build()
//!     .unwrap();
//! assert_eq!(layout.size(), 24);
//!
//! let sample = Sample { x: 100, y: -0.25, z: 255, s: b"12345".to_vec() };
//! let bytes = layout.to_bytes(&sample).unwrap();
//! assert_eq!(bytes.len(), 24);
//! assert_eq!(&bytes[..4], [100, 0, 0, 0]);
//!
//! // Byte fields come back at their full declared length.
//! let decoded: Sample = layout.from_bytes(&bytes).unwrap();
//! assert_eq!(decoded.s, b"12345\0\0\0\0\0");
//! ```

pub mod atomic;
pub mod de;
pub mod error;
pub mod field;
pub mod fixed_bytes;
pub mod layout;
pub mod options;
pub mod ser;
pub mod validate;
pub mod value;

pub use atomic::{AtomicKind, AtomicTag, FloatWidth, ValueDomain};
pub use de::{Deserializer, from_bytes, from_bytes_partial, from_reader, unpack};
pub use error::{Error, Result};
pub use field::{FieldDecl, FieldDefault, FieldDescriptor, FieldShape, FieldType, resolve_field};
pub use layout::{LayoutField, RecordBuilder, RecordLayout, resolve_layout};
pub use options::{ByteOrder, RecordOptions, SizeMode};
pub use ser::{Serializer, pack, to_bytes, to_writer};
pub use validate::{validate, validate_default};
pub use value::Value;

pub use serde::{Deserialize, Serialize};
