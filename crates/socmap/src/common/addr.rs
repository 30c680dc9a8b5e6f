//! Register addresses, declared placements, and address ranges.
//!
//! This module defines the value types that every memory map is built from. It provides:
//! 1. **Resolved Addresses:** A byte address plus bit offset and bit length.
//! 2. **Declared Placements:** `AddressSpec` parses "unset", an integer, or a full address.
//! 3. **Ranges:** Half-open byte ranges used by the peripheral overlap check.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A bit-granular location in the register address space.
///
/// `address` is a byte address; the register starts `bit_offset` bits into that byte and spans
/// `bit_len` bits. Addresses inside a memory map are relative until the map is placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address {
    /// Byte address of the first byte touched by the register.
    pub address: u64,
    /// Offset in bits from `address` to the register's first bit.
    #[serde(default)]
    pub bit_offset: u64,
    /// Length of the register in bits.
    pub bit_len: u64,
}

impl Address {
    /// Creates an address from its three components.
    #[inline]
    pub const fn new(address: u64, bit_offset: u64, bit_len: u64) -> Self {
        Self {
            address,
            bit_offset,
            bit_len,
        }
    }

    /// Creates a byte-aligned address spanning `bit_len` bits.
    #[inline]
    pub const fn bits(address: u64, bit_len: u64) -> Self {
        Self::new(address, 0, bit_len)
    }

    /// Returns the absolute position of the first bit.
    ///
    /// Only meaningful for map-relative addresses, which memory maps keep below `u64::MAX` bits
    /// (see [`Address::checked_end_bit`]).
    #[inline]
    pub const fn start_bit(&self) -> u64 {
        self.address * 8 + self.bit_offset
    }

    /// Returns the position one past the last bit.
    #[inline]
    pub const fn end_bit(&self) -> u64 {
        self.start_bit() + self.bit_len
    }

    /// Returns the first byte address past the register.
    #[inline]
    pub const fn byte_end(&self) -> u64 {
        self.end_bit().div_ceil(8)
    }

    /// Returns the position one past the last bit, or `None` if it does not fit in 64 bits.
    pub fn checked_end_bit(&self) -> Option<u64> {
        self.address
            .checked_mul(8)?
            .checked_add(self.bit_offset)?
            .checked_add(self.bit_len)
    }

    /// Returns this address moved by `base` bytes, or `None` past the end of the address space.
    pub fn checked_translate(&self, base: u64) -> Option<Self> {
        Some(Self::new(
            self.address.checked_add(base)?,
            self.bit_offset,
            self.bit_len,
        ))
    }

    /// Returns `true` if the two registers share at least one bit.
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start_bit() < other.end_bit() && self.end_bit() > other.start_bit()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#010x}.{} ({} bits)",
            self.address, self.bit_offset, self.bit_len
        )
    }
}

/// Error returned when an address literal cannot be parsed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid address literal `{0}`")]
pub struct ParseAddressError(pub String);

/// Parses an unsigned integer literal in decimal, `0x` hex, or `0b` binary form.
///
/// Underscores are accepted as digit separators, so `"0x4000_0000"` is valid.
pub fn parse_literal(text: &str) -> Result<u64, ParseAddressError> {
    let cleaned: String = text.trim().chars().filter(|c| *c != '_').collect();
    let parsed = if let Some(hex) = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16)
    } else if let Some(bin) = cleaned.strip_prefix("0b") {
        u64::from_str_radix(bin, 2)
    } else {
        cleaned.parse()
    };
    parsed.map_err(|_| ParseAddressError(text.to_owned()))
}

/// An integer that may be written as a JSON number or as a literal string.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum Literal {
    Int(u64),
    Text(String),
}

/// Deserializes an optional address literal (`null`, a number, or `"0x..."`).
pub(crate) fn deserialize_opt_literal<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Literal>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Literal::Int(value)) => Ok(Some(value)),
        Some(Literal::Text(text)) => parse_literal(&text).map(Some).map_err(de::Error::custom),
    }
}

/// Deserializes a required address literal (a number or `"0x..."`).
pub(crate) fn deserialize_literal<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Literal::deserialize(deserializer)? {
        Literal::Int(value) => Ok(value),
        Literal::Text(text) => parse_literal(&text).map_err(de::Error::custom),
    }
}

/// Where a register was declared to live.
///
/// A field either leaves its address to the allocator (`Unset`), names a byte offset inside its
/// bank (`Offset`, bit length taken from the field), or pins a complete address (`Exact`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AddressSpec {
    /// Auto-assigned by the bank allocator.
    #[default]
    Unset,
    /// Explicit byte offset inside the owning bank.
    Offset(u64),
    /// Explicit literal address including bit offset and length.
    Exact(Address),
}

impl AddressSpec {
    /// Parses anything convertible into a placement: `None`, an integer, or an [`Address`].
    pub fn parse<T: Into<Self>>(value: T) -> Self {
        value.into()
    }

    /// Returns `true` unless the allocator is free to choose the address.
    pub const fn is_explicit(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// Returns the bit length carried by an exact address, if any.
    pub const fn bit_len(&self) -> Option<u64> {
        match self {
            Self::Exact(address) => Some(address.bit_len),
            Self::Unset | Self::Offset(_) => None,
        }
    }

    /// Resolves the declared placement for a register of `bit_len` bits.
    ///
    /// # Returns
    ///
    /// `None` for `Unset`; otherwise the pinned bank-relative address.
    pub const fn resolve(&self, bit_len: u64) -> Option<Address> {
        match self {
            Self::Unset => None,
            Self::Offset(offset) => Some(Address::bits(*offset, bit_len)),
            Self::Exact(address) => Some(*address),
        }
    }
}

impl From<u64> for AddressSpec {
    fn from(offset: u64) -> Self {
        Self::Offset(offset)
    }
}

impl From<Address> for AddressSpec {
    fn from(address: Address) -> Self {
        Self::Exact(address)
    }
}

impl<T: Into<Self>> From<Option<T>> for AddressSpec {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Unset, Into::into)
    }
}

impl FromStr for AddressSpec {
    type Err = ParseAddressError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim() {
            "" | "unset" | "auto" | "none" => Ok(Self::Unset),
            literal => parse_literal(literal).map(Self::Offset),
        }
    }
}

impl<'de> Deserialize<'de> for AddressSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Offset(u64),
            Text(String),
            Exact(Address),
        }

        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(Self::Unset),
            Some(Raw::Offset(offset)) => Ok(Self::Offset(offset)),
            Some(Raw::Text(text)) => text.parse().map_err(de::Error::custom),
            Some(Raw::Exact(address)) => Ok(Self::Exact(address)),
        }
    }
}

/// A half-open byte range `[start, stop)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AddressRange {
    /// First byte in the range.
    pub start: u64,
    /// First byte past the range.
    pub stop: u64,
}

impl AddressRange {
    /// Creates the range `[start, stop)`.
    pub const fn new(start: u64, stop: u64) -> Self {
        Self { start, stop }
    }

    /// Creates the range of `len` bytes starting at `start`.
    ///
    /// Returns `None` when the end does not fit in 64 bits.
    pub fn checked_with_len(start: u64, len: u64) -> Option<Self> {
        Some(Self::new(start, start.checked_add(len)?))
    }

    /// Returns the number of bytes in the range.
    pub const fn len(&self) -> u64 {
        self.stop.saturating_sub(self.start)
    }

    /// Returns `true` if the range covers no bytes.
    pub const fn is_empty(&self) -> bool {
        self.start >= self.stop
    }

    /// Returns `true` if both ranges are non-empty and share at least one byte.
    ///
    /// A zero-length range never overlaps anything, even when it sits inside another range.
    pub const fn overlaps(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.start < other.stop && self.stop > other.start
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.start, self.stop)
    }
}
