//! Per-record configuration: size mode, byte order and default validation.
//!
//! Options can be built in code, parsed from the short names used by C
//! struct tooling (`"native"`, `"std"`, `"little"`, `"big"`, `"network"`),
//! or loaded from any serde format:
//!
//! ```rust
//! use cstruct_serde::{ByteOrder, RecordOptions, SizeMode};
//!
//! let opts = RecordOptions::std(ByteOrder::Little);
//! assert_eq!(opts.size_mode, SizeMode::Std);
//! assert_eq!("network".parse::<ByteOrder>().unwrap(), ByteOrder::Network);
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How field widths and alignment are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeMode {
    /// Host C ABI: detected integer widths, natural alignment, trailing padding.
    Native,
    /// Fixed 8/16/32/64-bit widths, no implicit padding.
    Std,
}

impl fmt::Display for SizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SizeMode::Native => "native",
            SizeMode::Std => "std",
        })
    }
}

impl FromStr for SizeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "native" => Ok(SizeMode::Native),
            "std" => Ok(SizeMode::Std),
            other => Err(Error::InvalidOption(format!(
                "unknown size mode `{}` (expected `native` or `std`)",
                other
            ))),
        }
    }
}

/// Endianness of multi-byte atomic values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Host byte order.
    Native,
    Little,
    Big,
    /// Encodes like [`ByteOrder::Big`], but only nests with other `Network` records.
    Network,
}

impl ByteOrder {
    /// Returns `true` if multi-byte values are stored least significant byte first.
    pub fn is_little(self) -> bool {
        match self {
            ByteOrder::Native => cfg!(target_endian = "little"),
            ByteOrder::Little => true,
            ByteOrder::Big | ByteOrder::Network => false,
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ByteOrder::Native => "native",
            ByteOrder::Little => "little",
            ByteOrder::Big => "big",
            ByteOrder::Network => "network",
        })
    }
}

impl FromStr for ByteOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "native" => Ok(ByteOrder::Native),
            "little" => Ok(ByteOrder::Little),
            "big" => Ok(ByteOrder::Big),
            "network" => Ok(ByteOrder::Network),
            other => Err(Error::InvalidOption(format!(
                "unknown byte order `{}` (expected `native`, `little`, `big` or `network`)",
                other
            ))),
        }
    }
}

/// Configuration applied to one record declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordOptions {
    pub size_mode: SizeMode,
    pub byte_order: ByteOrder,
    /// Check declared defaults against their field domains.
    pub validate: bool,
}

impl Default for RecordOptions {
    fn default() -> Self {
        RecordOptions {
            size_mode: SizeMode::Native,
            byte_order: ByteOrder::Native,
            validate: true,
        }
    }
}

impl RecordOptions {
    /// Native size mode with host byte order.
    pub fn native() -> Self {
        RecordOptions::default()
    }

    /// Standard size mode with the given byte order.
    pub fn std(byte_order: ByteOrder) -> Self {
        RecordOptions {
            size_mode: SizeMode::Std,
            byte_order,
            validate: true,
        }
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Native size mode only makes sense with the host byte order.
    pub(crate) fn check(&self) -> Result<()> {
        if self.size_mode == SizeMode::Native && self.byte_order != ByteOrder::Native {
            return Err(Error::InvalidOption(format!(
                "native size mode requires native byte order, got `{}`",
                self.byte_order
            )));
        }
        Ok(())
    }
}
