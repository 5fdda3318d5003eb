//! Value validation against field descriptors.
//!
//! Integers must fit their kind's domain, floats must not overflow a narrower
//! float kind, arrays and nested records must have exactly the declared number
//! of elements. Byte sequences are never rejected for their length: packing
//! truncates or zero-pads them.

use crate::atomic::{AtomicKind, FloatWidth, ValueDomain};
use crate::error::{Error, Result};
use crate::field::{FieldDescriptor, FieldShape};
use crate::layout::RecordLayout;
use crate::value::Value;

/// Check `value` against one field's shape and domain.
pub fn validate(descriptor: &FieldDescriptor, value: &Value) -> Result<()> {
    check_shape(descriptor.name(), descriptor.shape(), value)
}

/// Check a declared default. Called once per field while a record is built.
pub fn validate_default(descriptor: &FieldDescriptor, value: &Value) -> Result<()> {
    validate(descriptor, value)
}

pub(crate) fn validate_record(layout: &RecordLayout, value: &Value) -> Result<()> {
    check_record(layout.name(), layout, value)
}

/// Returns `false` if a finite `v` would overflow to infinity in `width`.
pub(crate) fn float_fits(width: FloatWidth, v: f64) -> bool {
    if !v.is_finite() {
        return true;
    }
    match width {
        FloatWidth::Half => half::f16::from_f64(v).is_finite(),
        FloatWidth::Single => (v as f32).is_finite(),
        FloatWidth::Double => true,
    }
}

fn check_shape(field: &str, shape: &FieldShape, value: &Value) -> Result<()> {
    match shape {
        FieldShape::Atomic(kind) => check_atomic(field, kind, value),
        FieldShape::Bytes(_) => match value {
            Value::Bytes(_) => Ok(()),
            other => Err(invalid_type(field, "bytes", other)),
        },
        FieldShape::Array { element, count } => match value {
            Value::Array(items) => {
                if items.len() != *count {
                    return Err(Error::Shape {
                        field: field.to_string(),
                        expected: *count,
                        got: items.len(),
                    });
                }
                items
                    .iter()
                    .try_for_each(|item| check_shape(field, element, item))
            }
            other => Err(invalid_type(field, "array", other)),
        },
        FieldShape::Nested(layout) => check_record(field, layout, value),
    }
}

fn check_record(field: &str, layout: &RecordLayout, value: &Value) -> Result<()> {
    let Value::Record(values) = value else {
        return Err(invalid_type(field, "record", value));
    };
    if values.len() != layout.fields().len() {
        return Err(Error::Shape {
            field: field.to_string(),
            expected: layout.fields().len(),
            got: values.len(),
        });
    }
    layout
        .fields()
        .iter()
        .zip(values)
        .try_for_each(|(f, v)| check_shape(f.name(), f.shape(), v))
}

fn check_atomic(field: &str, kind: &AtomicKind, value: &Value) -> Result<()> {
    let domain = kind.domain();
    match (domain, value) {
        (ValueDomain::Bool, Value::Bool(_)) => Ok(()),
        (ValueDomain::Char, Value::Char(_)) => Ok(()),
        (ValueDomain::Char, Value::Bytes(b)) if b.len() == 1 => Ok(()),
        (ValueDomain::Char, Value::Bytes(b)) => Err(Error::Shape {
            field: field.to_string(),
            expected: 1,
            got: b.len(),
        }),
        (
            ValueDomain::Char | ValueDomain::Signed { .. } | ValueDomain::Unsigned { .. },
            Value::Int(_) | Value::UInt(_),
        ) => {
            match value.as_integer() {
                Some(v) if domain.contains(v) => Ok(()),
                Some(v) => Err(Error::Range {
                    field: field.to_string(),
                    domain,
                    value: v.to_string(),
                }),
                None => Err(invalid_type(field, "integer", value)),
            }
        }
        (ValueDomain::Float(width), Value::Float(v)) => {
            if float_fits(width, *v) {
                Ok(())
            } else {
                Err(Error::Range {
                    field: field.to_string(),
                    domain,
                    value: v.to_string(),
                })
            }
        }
        (ValueDomain::Float(width), Value::Int(_) | Value::UInt(_)) => match value.as_integer() {
            Some(v) if float_fits(width, v as f64) => Ok(()),
            Some(v) => Err(Error::Range {
                field: field.to_string(),
                domain,
                value: v.to_string(),
            }),
            None => Err(invalid_type(field, "float", value)),
        },
        (domain, other) => Err(invalid_type(field, expected_kind(domain), other)),
    }
}

fn expected_kind(domain: ValueDomain) -> &'static str {
    match domain {
        ValueDomain::Bool => "bool",
        ValueDomain::Char => "single byte",
        ValueDomain::Signed { .. } | ValueDomain::Unsigned { .. } => "integer",
        ValueDomain::Float(_) => "float",
    }
}

fn invalid_type(field: &str, expected: &'static str, got: &Value) -> Error {
    Error::InvalidType {
        field: field.to_string(),
        expected,
        got: got.kind_name(),
    }
}
