//! Atomic type catalog.
//!
//! Every scalar a record can hold is an [`AtomicKind`]: a tag plus its size,
//! alignment and legal value domain for one [`SizeMode`].
//!
//! Standard-mode kinds have fixed widths and alignment 1. Native-mode kinds
//! mirror the host C ABI: the widths and alignments of `short`, `int`, `long`,
//! `long long`, `size_t`, pointers and the floating point types are measured
//! from the compiler's view of the target the first time a native kind is
//! resolved, then cached for the life of the process.

use crate::error::{Error, Result};
use crate::options::{ByteOrder, SizeMode};
use std::ffi::{c_int, c_long, c_longlong, c_schar, c_short, c_void};
use std::fmt;
use std::mem::{align_of, size_of};
use std::sync::OnceLock;

/// Scalar type tags accepted in a field declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicTag {
    // ── Both modes ─────────────────────────────────────────────────────────
    Bool,
    /// A single raw byte.
    Char,
    F16,
    F32,
    F64,

    // ── Standard mode only ─────────────────────────────────────────────────
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,

    // ── Native mode only ───────────────────────────────────────────────────
    SignedChar,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    /// `ssize_t`
    SignedSize,
    /// `size_t`
    UnsignedSize,
    /// `void *`, treated as an unsigned integer.
    Pointer,
}

impl AtomicTag {
    pub fn name(self) -> &'static str {
        match self {
            AtomicTag::Bool => "bool",
            AtomicTag::Char => "char",
            AtomicTag::F16 => "f16",
            AtomicTag::F32 => "f32",
            AtomicTag::F64 => "f64",
            AtomicTag::I8 => "i8",
            AtomicTag::U8 => "u8",
            AtomicTag::I16 => "i16",
            AtomicTag::U16 => "u16",
            AtomicTag::I32 => "i32",
            AtomicTag::U32 => "u32",
            AtomicTag::I64 => "i64",
            AtomicTag::U64 => "u64",
            AtomicTag::SignedChar => "signed char",
            AtomicTag::UnsignedChar => "unsigned char",
            AtomicTag::Short => "short",
            AtomicTag::UnsignedShort => "unsigned short",
            AtomicTag::Int => "int",
            AtomicTag::UnsignedInt => "unsigned int",
            AtomicTag::Long => "long",
            AtomicTag::UnsignedLong => "unsigned long",
            AtomicTag::LongLong => "long long",
            AtomicTag::UnsignedLongLong => "unsigned long long",
            AtomicTag::SignedSize => "ssize_t",
            AtomicTag::UnsignedSize => "size_t",
            AtomicTag::Pointer => "pointer",
        }
    }

    /// Returns `true` if the tag can be used in the given size mode.
    pub fn is_allowed_in(self, mode: SizeMode) -> bool {
        use AtomicTag::*;
        match self {
            Bool | Char | F16 | F32 | F64 => true,
            I8 | U8 | I16 | U16 | I32 | U32 | I64 | U64 => mode == SizeMode::Std,
            _ => mode == SizeMode::Native,
        }
    }
}

impl fmt::Display for AtomicTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// IEEE‑754 interchange format of a float kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    Half,
    Single,
    Double,
}

impl FloatWidth {
    pub fn bits(self) -> u32 {
        match self {
            FloatWidth::Half => 16,
            FloatWidth::Single => 32,
            FloatWidth::Double => 64,
        }
    }
}

/// The set of values an atomic field can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueDomain {
    Bool,
    /// One raw byte.
    Char,
    Signed { bits: u32, min: i64, max: i64 },
    Unsigned { bits: u32, max: u64 },
    Float(FloatWidth),
}

impl ValueDomain {
    fn signed(bytes: usize) -> Self {
        let bits = (bytes * 8) as u32;
        let max = (1i128 << (bits - 1)) - 1;
        ValueDomain::Signed {
            bits,
            min: (-max - 1) as i64,
            max: max as i64,
        }
    }

    fn unsigned(bytes: usize) -> Self {
        let bits = (bytes * 8) as u32;
        ValueDomain::Unsigned {
            bits,
            max: ((1u128 << bits) - 1) as u64,
        }
    }

    /// Returns `true` if `value` is representable in this integer domain.
    /// Always `false` for non-integer domains.
    pub fn contains(&self, value: i128) -> bool {
        match *self {
            ValueDomain::Signed { min, max, .. } => (min as i128..=max as i128).contains(&value),
            ValueDomain::Unsigned { max, .. } => (0..=max as i128).contains(&value),
            ValueDomain::Char => (0..=u8::MAX as i128).contains(&value),
            ValueDomain::Bool | ValueDomain::Float(_) => false,
        }
    }
}

impl fmt::Display for ValueDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueDomain::Bool => write!(f, "bool"),
            ValueDomain::Char => write!(f, "single byte [0, 255]"),
            ValueDomain::Signed { bits, min, max } => {
                write!(f, "{}-bit signed integer [{}, {}]", bits, min, max)
            }
            ValueDomain::Unsigned { bits, max } => {
                write!(f, "{}-bit unsigned integer [0, {}]", bits, max)
            }
            ValueDomain::Float(w) => write!(f, "{}-bit float", w.bits()),
        }
    }
}

/// A resolved scalar: tag, width, alignment and value domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtomicKind {
    tag: AtomicTag,
    size: usize,
    align: usize,
    domain: ValueDomain,
}

/// Element kind of fixed byte sequences.
pub(crate) const BYTE_ELEMENT: AtomicKind = AtomicKind {
    tag: AtomicTag::Char,
    size: 1,
    align: 1,
    domain: ValueDomain::Char,
};

impl AtomicKind {
    /// Look up `tag` in the catalog for `mode`.
    ///
    /// Fails with [`Error::Domain`] if the tag is not available in that mode;
    /// the error's field name is left empty for the caller to fill in.
    pub fn resolve(tag: AtomicTag, mode: SizeMode) -> Result<Self> {
        if !tag.is_allowed_in(mode) {
            return Err(Error::Domain {
                field: String::new(),
                tag,
                mode,
            });
        }
        Ok(match mode {
            SizeMode::Std => Self::std_kind(tag),
            SizeMode::Native => Self::native_kind(tag, native_widths()),
        })
    }

    fn std_kind(tag: AtomicTag) -> Self {
        use AtomicTag::*;
        let (size, domain) = match tag {
            Bool => (1, ValueDomain::Bool),
            Char => (1, ValueDomain::Char),
            F16 => (2, ValueDomain::Float(FloatWidth::Half)),
            F32 => (4, ValueDomain::Float(FloatWidth::Single)),
            F64 => (8, ValueDomain::Float(FloatWidth::Double)),
            I8 | I16 | I32 | I64 => {
                let n = match tag {
                    I8 => 1,
                    I16 => 2,
                    I32 => 4,
                    _ => 8,
                };
                (n, ValueDomain::signed(n))
            }
            U8 | U16 | U32 | U64 => {
                let n = match tag {
                    U8 => 1,
                    U16 => 2,
                    U32 => 4,
                    _ => 8,
                };
                (n, ValueDomain::unsigned(n))
            }
            _ => unreachable!("native-only tag {} in std catalog", tag),
        };
        AtomicKind {
            tag,
            size,
            align: 1,
            domain,
        }
    }

    fn native_kind(tag: AtomicTag, w: &NativeWidths) -> Self {
        use AtomicTag::*;
        let (c, domain) = match tag {
            Bool => (w.bool_, ValueDomain::Bool),
            Char => (w.schar, ValueDomain::Char),
            F16 => (w.half, ValueDomain::Float(FloatWidth::Half)),
            F32 => (w.float, ValueDomain::Float(FloatWidth::Single)),
            F64 => (w.double, ValueDomain::Float(FloatWidth::Double)),
            SignedChar => (w.schar, ValueDomain::signed(w.schar.size)),
            UnsignedChar => (w.schar, ValueDomain::unsigned(w.schar.size)),
            Short => (w.short, ValueDomain::signed(w.short.size)),
            UnsignedShort => (w.short, ValueDomain::unsigned(w.short.size)),
            Int => (w.int, ValueDomain::signed(w.int.size)),
            UnsignedInt => (w.int, ValueDomain::unsigned(w.int.size)),
            Long => (w.long, ValueDomain::signed(w.long.size)),
            UnsignedLong => (w.long, ValueDomain::unsigned(w.long.size)),
            LongLong => (w.long_long, ValueDomain::signed(w.long_long.size)),
            UnsignedLongLong => (w.long_long, ValueDomain::unsigned(w.long_long.size)),
            SignedSize => (w.size, ValueDomain::signed(w.size.size)),
            UnsignedSize => (w.size, ValueDomain::unsigned(w.size.size)),
            Pointer => (w.pointer, ValueDomain::unsigned(w.pointer.size)),
            _ => unreachable!("std-only tag {} in native catalog", tag),
        };
        AtomicKind {
            tag,
            size: c.size,
            align: c.align,
            domain,
        }
    }

    pub fn tag(&self) -> AtomicTag {
        self.tag
    }

    /// Width in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Natural alignment in bytes; always 1 in standard mode.
    pub fn align(&self) -> usize {
        self.align
    }

    pub fn domain(&self) -> ValueDomain {
        self.domain
    }
}

// ── Native widths ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct CType {
    size: usize,
    align: usize,
}

macro_rules! ctype {
    ($t:ty) => {
        CType {
            size: size_of::<$t>(),
            align: align_of::<$t>(),
        }
    };
}

/// Host C type widths and alignments.
#[derive(Debug)]
struct NativeWidths {
    bool_: CType,
    schar: CType,
    short: CType,
    int: CType,
    long: CType,
    long_long: CType,
    size: CType,
    pointer: CType,
    half: CType,
    float: CType,
    double: CType,
}

impl NativeWidths {
    fn detect() -> Self {
        NativeWidths {
            bool_: ctype!(bool),
            schar: ctype!(c_schar),
            short: ctype!(c_short),
            int: ctype!(c_int),
            long: ctype!(c_long),
            long_long: ctype!(c_longlong),
            size: ctype!(usize),
            pointer: ctype!(*const c_void),
            // _Float16 is 2-byte aligned on every ABI that defines it.
            half: CType { size: 2, align: 2 },
            float: ctype!(f32),
            double: ctype!(f64),
        }
    }
}

static NATIVE_WIDTHS: OnceLock<NativeWidths> = OnceLock::new();

fn native_widths() -> &'static NativeWidths {
    NATIVE_WIDTHS.get_or_init(|| {
        let widths = NativeWidths::detect();
        log::debug!("detected native C type widths: {:?}", widths);
        widths
    })
}

// ── Byte helpers ───────────────────────────────────────────────────────────

/// Write the low `out.len()` bytes of `value` in `order`.
pub(crate) fn write_uint(out: &mut [u8], value: u64, order: ByteOrder) {
    let n = out.len();
    let le = value.to_le_bytes();
    if order.is_little() {
        out.copy_from_slice(&le[..n]);
    } else {
        for (i, b) in out.iter_mut().enumerate() {
            *b = le[n - 1 - i];
        }
    }
}

/// Read an unsigned integer of `bytes.len()` bytes (at most 8) in `order`.
pub(crate) fn read_uint(bytes: &[u8], order: ByteOrder) -> u64 {
    let fold = |acc: u64, b: &u8| (acc << 8) | u64::from(*b);
    if order.is_little() {
        bytes.iter().rev().fold(0, fold)
    } else {
        bytes.iter().fold(0, fold)
    }
}

/// Read a two's complement integer of `bytes.len()` bytes, sign-extended.
pub(crate) fn read_int(bytes: &[u8], order: ByteOrder) -> i64 {
    let shift = 64 - 8 * bytes.len() as u32;
    if shift == 64 {
        return 0;
    }
    ((read_uint(bytes, order) << shift) as i64) >> shift
}
