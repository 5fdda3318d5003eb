//! Field declarations and their resolution into [`FieldDescriptor`]s.
//!
//! A [`FieldDecl`] is what a caller writes: a name, a [`FieldType`], optional
//! explicit padding and an optional default. Resolving it against the
//! enclosing record's [`RecordOptions`] looks up atomic kinds in the catalog,
//! checks nested records for compatibility, rejects empty arrays and runs the
//! default (or default factory) exactly once.

use crate::atomic::{AtomicKind, AtomicTag, ValueDomain};
use crate::error::{Error, Result};
use crate::layout::RecordLayout;
use crate::options::RecordOptions;
use crate::validate;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// The declared type of a field.
#[derive(Debug, Clone)]
pub enum FieldType {
    Atomic(AtomicTag),
    /// Fixed-length byte sequence, zero-padded or truncated on pack.
    Bytes(usize),
    /// Fixed-length array; nest for multi-dimensional arrays.
    Array(Box<FieldType>, usize),
    Nested(Arc<RecordLayout>),
}

impl FieldType {
    pub fn atomic(tag: AtomicTag) -> Self {
        FieldType::Atomic(tag)
    }

    pub fn bytes(len: usize) -> Self {
        FieldType::Bytes(len)
    }

    pub fn array(element: impl Into<FieldType>, len: usize) -> Self {
        FieldType::Array(Box::new(element.into()), len)
    }

    pub fn nested(layout: &Arc<RecordLayout>) -> Self {
        FieldType::Nested(Arc::clone(layout))
    }
}

impl From<AtomicTag> for FieldType {
    fn from(tag: AtomicTag) -> Self {
        FieldType::Atomic(tag)
    }
}

impl From<Arc<RecordLayout>> for FieldType {
    fn from(layout: Arc<RecordLayout>) -> Self {
        FieldType::Nested(layout)
    }
}

impl From<&Arc<RecordLayout>> for FieldType {
    fn from(layout: &Arc<RecordLayout>) -> Self {
        FieldType::nested(layout)
    }
}

/// A declared default: either a value or a factory called once at declaration.
pub enum FieldDefault {
    Value(Value),
    Factory(Box<dyn FnOnce() -> Value + Send>),
}

impl FieldDefault {
    fn evaluate(self) -> Value {
        match self {
            FieldDefault::Value(v) => v,
            FieldDefault::Factory(f) => f(),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefault::Value(v) => f.debug_tuple("Value").field(v).finish(),
            FieldDefault::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// One field as declared by the caller.
///
/// ```rust
/// use cstruct_serde::{AtomicTag, FieldDecl};
///
/// let decl = FieldDecl::new("flags", AtomicTag::U16)
///     .pad_before(2)
///     .pad_after(1)
///     .pad_before(1)
///     .default_value(0u16);
/// assert_eq!(decl.padding(), (3, 1));
/// ```
#[derive(Debug)]
pub struct FieldDecl {
    name: String,
    ty: FieldType,
    pad_before: usize,
    pad_after: usize,
    default: Option<FieldDefault>,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: impl Into<FieldType>) -> Self {
        FieldDecl {
            name: name.into(),
            ty: ty.into(),
            pad_before: 0,
            pad_after: 0,
            default: None,
        }
    }

    /// Add `n` zero bytes before the field. Repeated calls accumulate.
    pub fn pad_before(mut self, n: usize) -> Self {
        self.pad_before = self.pad_before.saturating_add(n);
        self
    }

    /// Add `n` zero bytes after the field. Repeated calls accumulate.
    pub fn pad_after(mut self, n: usize) -> Self {
        self.pad_after = self.pad_after.saturating_add(n);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(FieldDefault::Value(value.into()));
        self
    }

    /// Use `factory` to produce the default. It runs once, when the record is built.
    pub fn default_with<F>(mut self, factory: F) -> Self
    where
        F: FnOnce() -> Value + Send + 'static,
    {
        self.default = Some(FieldDefault::Factory(Box::new(factory)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accumulated `(before, after)` padding.
    pub fn padding(&self) -> (usize, usize) {
        (self.pad_before, self.pad_after)
    }
}

/// Resolved shape of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldShape {
    Atomic(AtomicKind),
    /// `len` raw bytes.
    Bytes(usize),
    /// `count` consecutive elements, row-major when nested.
    Array {
        element: Box<FieldShape>,
        count: usize,
    },
    Nested(Arc<RecordLayout>),
}

impl FieldShape {
    /// Size in bytes.
    pub fn size(&self) -> usize {
        match self {
            FieldShape::Atomic(kind) => kind.size(),
            FieldShape::Bytes(len) => *len,
            FieldShape::Array { element, count } => element.size() * count,
            FieldShape::Nested(layout) => layout.size(),
        }
    }

    /// Natural alignment; 1 for every shape of a standard-mode record.
    pub fn align(&self) -> usize {
        match self {
            FieldShape::Atomic(kind) => kind.align(),
            FieldShape::Bytes(_) => 1,
            FieldShape::Array { element, .. } => element.align(),
            FieldShape::Nested(layout) => layout.align(),
        }
    }
}

/// Borrowed view of what occupies a byte range: a whole record or one shape.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Slot<'a> {
    Record(&'a RecordLayout),
    Atomic(&'a AtomicKind),
    Bytes(usize),
    Array {
        element: &'a FieldShape,
        count: usize,
    },
}

impl<'a> Slot<'a> {
    /// What a value written to this slot should look like.
    pub(crate) fn expected(&self) -> &'static str {
        match self {
            Slot::Record(_) => "record",
            Slot::Atomic(kind) => match kind.domain() {
                ValueDomain::Bool => "bool",
                ValueDomain::Char => "single byte",
                ValueDomain::Signed { .. } | ValueDomain::Unsigned { .. } => "integer",
                ValueDomain::Float(_) => "float",
            },
            Slot::Bytes(_) => "bytes",
            Slot::Array { .. } => "array",
        }
    }
}

impl<'a> From<&'a FieldShape> for Slot<'a> {
    fn from(shape: &'a FieldShape) -> Self {
        match shape {
            FieldShape::Atomic(kind) => Slot::Atomic(kind),
            FieldShape::Bytes(len) => Slot::Bytes(*len),
            FieldShape::Array { element, count } => Slot::Array {
                element: element.as_ref(),
                count: *count,
            },
            FieldShape::Nested(layout) => Slot::Record(layout.as_ref()),
        }
    }
}

/// A fully resolved field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: String,
    shape: FieldShape,
    pad_before: usize,
    pad_after: usize,
    default: Option<Value>,
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &FieldShape {
        &self.shape
    }

    pub fn pad_before(&self) -> usize {
        self.pad_before
    }

    pub fn pad_after(&self) -> usize {
        self.pad_after
    }

    /// The effective default, already evaluated (and validated when enabled).
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Resolve one declared field of record `record` under `options`.
pub fn resolve_field(
    record: &str,
    decl: FieldDecl,
    options: &RecordOptions,
) -> Result<FieldDescriptor> {
    let FieldDecl {
        name,
        ty,
        pad_before,
        pad_after,
        default,
    } = decl;

    let shape = resolve_shape(record, &name, &ty, options)?;
    let mut descriptor = FieldDescriptor {
        name,
        shape,
        pad_before,
        pad_after,
        default: None,
    };

    if let Some(default) = default {
        let value = default.evaluate();
        if options.validate {
            validate::validate_default(&descriptor, &value)?;
        }
        descriptor.default = Some(value);
    }
    Ok(descriptor)
}

fn resolve_shape(
    record: &str,
    field: &str,
    ty: &FieldType,
    options: &RecordOptions,
) -> Result<FieldShape> {
    match ty {
        FieldType::Atomic(tag) => AtomicKind::resolve(*tag, options.size_mode)
            .map(FieldShape::Atomic)
            .map_err(|e| e.in_field(field)),
        FieldType::Bytes(len) => {
            if *len == 0 {
                return Err(Error::InvalidLength {
                    field: field.to_string(),
                    length: 0,
                });
            }
            Ok(FieldShape::Bytes(*len))
        }
        FieldType::Array(element, count) => {
            if *count == 0 {
                return Err(Error::InvalidLength {
                    field: field.to_string(),
                    length: 0,
                });
            }
            let element = resolve_shape(record, field, element, options)?;
            if element.size().checked_mul(*count).is_none() {
                return Err(Error::SizeOverflow {
                    record: record.to_string(),
                    field: field.to_string(),
                });
            }
            Ok(FieldShape::Array {
                element: Box::new(element),
                count: *count,
            })
        }
        FieldType::Nested(layout) => {
            let expected = (options.size_mode, options.byte_order);
            let found = (layout.size_mode(), layout.byte_order());
            if expected != found {
                return Err(Error::IncompatibleNesting {
                    record: record.to_string(),
                    nested: layout.name().to_string(),
                    expected,
                    found,
                });
            }
            Ok(FieldShape::Nested(Arc::clone(layout)))
        }
    }
}
