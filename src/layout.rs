//! Record layout planning.
//!
//! [`resolve_layout`] turns an ordered list of [`FieldDecl`]s into an
//! immutable [`RecordLayout`]: the byte offset of every field, the record's
//! alignment and its total size.
//!
//! For each field, in declaration order, a cursor starting at zero is
//! advanced by:
//!
//! 1. the field's explicit `pad_before` bytes,
//! 2. in native mode, rounding up to the field's natural alignment,
//! 3. the field's size (which is where its offset is taken),
//! 4. the field's explicit `pad_after` bytes.
//!
//! Explicit padding is applied before alignment rounding, so a manual pad can
//! be used to satisfy or defeat alignment just like in C. Native records are
//! aligned to their most-aligned field and their size is rounded up to that
//! alignment (trailing padding). Standard records are packed: alignment 1, no
//! implicit padding anywhere.

use crate::de;
use crate::error::{Error, Result};
use crate::field::{FieldDecl, FieldDescriptor, FieldShape, FieldType, resolve_field};
use crate::options::{ByteOrder, RecordOptions, SizeMode};
use crate::ser;
use crate::validate;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A field together with its byte offset in the record.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutField {
    descriptor: FieldDescriptor,
    offset: usize,
}

impl LayoutField {
    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn shape(&self) -> &FieldShape {
        self.descriptor.shape()
    }

    /// Byte offset of the field's first byte (after `pad_before` and alignment).
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Size of the field itself, excluding any padding.
    pub fn size(&self) -> usize {
        self.descriptor.shape().size()
    }
}

/// The immutable byte layout of a declared record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordLayout {
    name: String,
    size_mode: SizeMode,
    byte_order: ByteOrder,
    fields: Vec<LayoutField>,
    size: usize,
    align: usize,
}

impl RecordLayout {
    /// Start declaring a record named `name`.
    pub fn builder(name: impl Into<String>) -> RecordBuilder {
        RecordBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_mode(&self) -> SizeMode {
        self.size_mode
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn fields(&self) -> &[LayoutField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&LayoutField> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Total size in bytes, including trailing padding.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Record alignment; always 1 in standard mode.
    pub fn align(&self) -> usize {
        self.align
    }

    /// A full record value built from the declared defaults.
    ///
    /// Nested fields without an explicit default fall back to the nested
    /// record's own defaults. Returns `None` if any field has no default.
    pub fn default_value(&self) -> Option<Value> {
        self.fields
            .iter()
            .map(|f| match (f.descriptor.default(), f.shape()) {
                (Some(v), _) => Some(v.clone()),
                (None, FieldShape::Nested(inner)) => inner.default_value(),
                (None, _) => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(Value::Record)
    }

    /// Check a record value against every field's domain and shape.
    pub fn validate(&self, value: &Value) -> Result<()> {
        validate::validate_record(self, value)
    }

    /// Pack a dynamic value. See [`ser::pack`].
    pub fn pack(&self, value: &Value) -> Result<Vec<u8>> {
        ser::pack(self, value)
    }

    /// Unpack a dynamic value. See [`de::unpack`].
    pub fn unpack(&self, input: &[u8]) -> Result<Value> {
        de::unpack(self, input)
    }

    /// Pack any serializable value. See [`ser::to_bytes`].
    pub fn to_bytes<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        ser::to_bytes(self, value)
    }

    /// Unpack into any deserializable type. See [`de::from_bytes`].
    pub fn from_bytes<'de, T: Deserialize<'de>>(&self, input: &'de [u8]) -> Result<T> {
        de::from_bytes(self, input)
    }
}

/// Resolve and plan a record named `name` from its ordered fields.
///
/// Every field is resolved (catalog lookup, nesting checks, default
/// validation) before any offset is computed, so an invalid declaration never
/// yields a partial layout.
pub fn resolve_layout(
    name: impl Into<String>,
    fields: Vec<FieldDecl>,
    options: RecordOptions,
) -> Result<RecordLayout> {
    let name = name.into();
    options.check()?;

    let mut descriptors: Vec<FieldDescriptor> = Vec::with_capacity(fields.len());
    for decl in fields {
        if descriptors.iter().any(|d| d.name() == decl.name()) {
            return Err(Error::DuplicateField {
                record: name,
                field: decl.name().to_string(),
            });
        }
        descriptors.push(resolve_field(&name, decl, &options)?);
    }

    let (fields, size, align) = plan(&name, descriptors, options.size_mode)?;
    log::debug!(
        "resolved record `{}` ({}/{}): {} fields, size {}, align {}",
        name,
        options.size_mode,
        options.byte_order,
        fields.len(),
        size,
        align
    );
    for f in &fields {
        log::trace!(
            "  `{}`.{}: offset {}, size {}",
            name,
            f.name(),
            f.offset(),
            f.size()
        );
    }

    Ok(RecordLayout {
        name,
        size_mode: options.size_mode,
        byte_order: options.byte_order,
        fields,
        size,
        align,
    })
}

/// Assign offsets; returns `(fields, size, align)`.
///
/// Field sizes were checked when each shape was resolved; only the running
/// cursor can still overflow here.
fn plan(
    record: &str,
    descriptors: Vec<FieldDescriptor>,
    mode: SizeMode,
) -> Result<(Vec<LayoutField>, usize, usize)> {
    let mut fields = Vec::with_capacity(descriptors.len());
    let mut cursor = 0usize;
    let mut max_align = 1usize;

    for descriptor in descriptors {
        let overflow = || Error::SizeOverflow {
            record: record.to_string(),
            field: descriptor.name().to_string(),
        };
        cursor = cursor.checked_add(descriptor.pad_before()).ok_or_else(overflow)?;
        if mode == SizeMode::Native {
            let align = descriptor.shape().align();
            max_align = max_align.max(align);
            cursor = align_up(cursor, align).ok_or_else(overflow)?;
        }
        let offset = cursor;
        cursor = cursor
            .checked_add(descriptor.shape().size())
            .and_then(|c| c.checked_add(descriptor.pad_after()))
            .ok_or_else(overflow)?;
        fields.push(LayoutField { descriptor, offset });
    }

    match mode {
        SizeMode::Native => {
            let size = align_up(cursor, max_align).ok_or_else(|| Error::SizeOverflow {
                record: record.to_string(),
                field: fields.last().map(|f| f.name().to_string()).unwrap_or_default(),
            })?;
            Ok((fields, size, max_align))
        }
        SizeMode::Std => Ok((fields, cursor, 1)),
    }
}

/// Round `offset` up to a multiple of `align`, or `None` on overflow.
fn align_up(offset: usize, align: usize) -> Option<usize> {
    offset.div_ceil(align).checked_mul(align)
}

// ── Builder ────────────────────────────────────────────────────────────────

/// Fluent declaration of a record layout.
///
/// ```rust
/// use cstruct_serde::{AtomicTag, ByteOrder, FieldDecl, FieldType, RecordLayout, SizeMode};
///
/// let point = RecordLayout::builder("Point")
///     .size_mode(SizeMode::Std)
///     .byte_order(ByteOrder::Big)
///     .field("x", AtomicTag::I32)
///     .field("y", AtomicTag::I32)
///     .build()
///     .unwrap();
///
/// let path = RecordLayout::builder("Path")
///     .size_mode(SizeMode::Std)
///     .byte_order(ByteOrder::Network)
///     .field_decl(FieldDecl::new("len", AtomicTag::U8).pad_after(3))
///     .field("points", FieldType::array(&point, 4))
///     .build()
///     .unwrap();
///
/// assert_eq!(path.size(), 4 + 4 * 8);
/// assert_eq!(path.field("points").unwrap().offset(), 4);
/// ```
#[derive(Debug)]
pub struct RecordBuilder {
    name: String,
    options: RecordOptions,
    fields: Vec<FieldDecl>,
}

impl RecordBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        RecordBuilder {
            name: name.into(),
            options: RecordOptions::default(),
            fields: Vec::new(),
        }
    }

    pub fn options(mut self, options: RecordOptions) -> Self {
        self.options = options;
        self
    }

    pub fn size_mode(mut self, mode: SizeMode) -> Self {
        self.options.size_mode = mode;
        self
    }

    pub fn byte_order(mut self, order: ByteOrder) -> Self {
        self.options.byte_order = order;
        self
    }

    /// Enable or disable validation of declared defaults.
    pub fn validate(mut self, validate: bool) -> Self {
        self.options.validate = validate;
        self
    }

    /// Add a field with no padding and no default.
    pub fn field(self, name: impl Into<String>, ty: impl Into<FieldType>) -> Self {
        self.field_decl(FieldDecl::new(name, ty))
    }

    pub fn field_decl(mut self, decl: FieldDecl) -> Self {
        self.fields.push(decl);
        self
    }

    pub fn build(self) -> Result<Arc<RecordLayout>> {
        resolve_layout(self.name, self.fields, self.options).map(Arc::new)
    }
}
