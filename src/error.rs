use crate::atomic::{AtomicTag, ValueDomain};
use crate::options::{ByteOrder, SizeMode};
use serde::{de, ser};
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while declaring a record layout or converting values.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A custom error message from serde
    Message(String),

    /// The type tag is not available in the record's size mode
    Domain {
        field: String,
        tag: AtomicTag,
        mode: SizeMode,
    },

    /// A nested record was declared with a different size mode or byte order
    IncompatibleNesting {
        record: String,
        nested: String,
        expected: (SizeMode, ByteOrder),
        found: (SizeMode, ByteOrder),
    },

    /// A fixed-length array or byte sequence was declared with length zero
    InvalidLength { field: String, length: usize },

    /// A field's size or the record's total size does not fit in `usize`
    SizeOverflow { record: String, field: String },

    /// An array or record value had the wrong number of elements
    Shape {
        field: String,
        expected: usize,
        got: usize,
    },

    /// A value lies outside the legal domain of its field
    Range {
        field: String,
        domain: ValueDomain,
        value: String,
    },

    /// A value of the wrong kind was supplied for a field
    InvalidType {
        field: String,
        expected: &'static str,
        got: &'static str,
    },

    /// Two fields of one record share a name
    DuplicateField { record: String, field: String },

    /// The input buffer is shorter than the record size
    TruncatedBuffer { need: usize, have: usize },

    /// An unknown size mode / byte order, or an invalid combination of the two
    InvalidOption(String),

    /// This serde data model item has no fixed-layout representation
    Unsupported(&'static str),

    /// An I/O error occurred while writing or reading a record
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Message(msg) => write!(f, "{}", msg),
            Error::Domain { field, tag, mode } => write!(
                f,
                "field `{}`: type {} is not supported in {} size mode",
                field, tag, mode
            ),
            Error::IncompatibleNesting {
                record,
                nested,
                expected,
                found,
            } => write!(
                f,
                "record `{}` cannot contain `{}`: expected {}/{} layout, got {}/{}",
                record, nested, expected.0, expected.1, found.0, found.1
            ),
            Error::InvalidLength { field, length } => {
                write!(f, "field `{}`: length must be positive, got {}", field, length)
            }
            Error::SizeOverflow { record, field } => write!(
                f,
                "record `{}`: size overflows at field `{}`",
                record, field
            ),
            Error::Shape {
                field,
                expected,
                got,
            } => write!(
                f,
                "field `{}`: expected {} elements, got {}",
                field, expected, got
            ),
            Error::Range {
                field,
                domain,
                value,
            } => write!(
                f,
                "field `{}`: value {} out of range for {}",
                field, value, domain
            ),
            Error::InvalidType {
                field,
                expected,
                got,
            } => write!(f, "field `{}`: expected {}, got {}", field, expected, got),
            Error::DuplicateField { record, field } => {
                write!(f, "record `{}` declares field `{}` twice", record, field)
            }
            Error::TruncatedBuffer { need, have } => {
                write!(f, "buffer too small: need {} bytes, have {}", need, have)
            }
            Error::InvalidOption(msg) => write!(f, "invalid option: {}", msg),
            Error::Unsupported(t) => write!(f, "fixed-size records do not support {}", t),
            Error::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl Error {
    /// Attach a field name to a catalog error raised without one.
    pub(crate) fn in_field(self, name: &str) -> Self {
        match self {
            Error::Domain { field, tag, mode } if field.is_empty() => Error::Domain {
                field: name.to_string(),
                tag,
                mode,
            },
            other => other,
        }
    }
}

impl std::error::Error for Error {}

impl ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}
