//! Error definitions for builds, loaders, and register bank transactions.
//!
//! This module defines every way a build can fail. It provides:
//! 1. **Build Errors:** `MapError`, the fatal taxonomy raised by the passes. No pass attempts
//!    partial repair; the first violation aborts the build.
//! 2. **Loader Errors:** `LoadError` for reading configuration and design descriptions.
//! 3. **Bus Errors:** `BusError`, the error response a register bank answers a transaction with.

use thiserror::Error;

use super::addr::AddressRange;

/// Result type alias for build operations.
pub type Result<T> = std::result::Result<T, MapError>;

/// Result type alias for register bank transactions and driver method calls.
pub type BusResult<T> = std::result::Result<T, BusError>;

/// Fatal build errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MapError {
    /// A register field's width or address is unusable (e.g. an event register without a width,
    /// or wider than one bus word).
    #[error("invalid register `{field}`: {reason}")]
    InvalidRegisterConfig {
        /// Name of the offending field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A field was classified as something other than Control, Status, or Event.
    #[error("register `{field}` has unsupported kind `{kind}` (expected Control, Status or Event)")]
    UnsupportedRegisterKind {
        /// Name of the offending field.
        field: String,
        /// The kind it was declared with.
        kind: String,
    },

    /// Address assignment ran without a base address for the top map.
    #[error("address assignment needs a base address for the top memory map")]
    MissingBaseAddress,

    /// Two independently-addressed peripherals claim overlapping address ranges.
    #[error("{first} {first_range} overlaps with {second} {second_range}")]
    PeripheralRangeConflict {
        /// Path of the first peripheral.
        first: String,
        /// Absolute range of the first peripheral.
        first_range: AddressRange,
        /// Path of the second peripheral.
        second: String,
        /// Absolute range of the second peripheral.
        second_range: AddressRange,
    },

    /// Two driver methods share one fully-qualified name.
    #[error("driver method `{name}` is defined more than once")]
    DuplicateDriverMethodName {
        /// The colliding name.
        name: String,
    },

    /// Two entries share one name inside a memory map.
    #[error("name `{name}` is already used in this memory map")]
    DuplicateNamespaceEntry {
        /// The colliding name.
        name: String,
    },

    /// An alias points at a register field that was never given an address.
    #[error("alias `{name}` points at a register that was never placed")]
    UnresolvedAlias {
        /// Fully-qualified name of the alias.
        name: String,
    },

    /// A region or register runs past the end of the 64-bit address space.
    #[error("`{name}` at {start:#x} spanning {len:#x} bytes runs past the end of the address space")]
    AddressOverflow {
        /// Path or label of the offending entry.
        name: String,
        /// Where it starts.
        start: u64,
        /// How many bytes it spans.
        len: u64,
    },

    /// The component tree itself is malformed (dangling ids, cycles, unknown names).
    #[error("invalid design: {reason}")]
    InvalidDesign {
        /// What is wrong with the design.
        reason: String,
    },

    /// A pass ran before the annotation it consumes was produced.
    #[error("pass `{pass}` ran before `{missing}` was available")]
    PassOrder {
        /// The pass that could not run.
        pass: &'static str,
        /// The missing annotation.
        missing: &'static str,
    },
}

impl MapError {
    /// Creates an `InvalidRegisterConfig` error.
    pub fn invalid_register(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRegisterConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `AddressOverflow` error.
    pub fn overflow(name: impl Into<String>, start: u64, len: u64) -> Self {
        Self::AddressOverflow {
            name: name.into(),
            start,
            len,
        }
    }

    /// Creates an `InvalidDesign` error.
    pub fn invalid_design(reason: impl Into<String>) -> Self {
        Self::InvalidDesign {
            reason: reason.into(),
        }
    }

    /// Creates a `DuplicateNamespaceEntry` error.
    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::DuplicateNamespaceEntry { name: name.into() }
    }
}

/// Errors raised while loading configuration or design descriptions.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The file is not valid JSON for the expected schema.
    #[error("malformed description: {source}")]
    Json {
        /// Underlying parse error.
        #[from]
        source: serde_json::Error,
    },

    /// The description parsed but does not describe a valid design.
    #[error(transparent)]
    Design(#[from] MapError),
}

/// Error responses a register bank answers a bus transaction with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BusError {
    /// The register answered with an error response.
    #[error("register access faulted")]
    Fault,

    /// No register decodes the word at this bank offset.
    #[error("no register at offset {0:#x}")]
    Unmapped(u64),

    /// The word at this bank offset holds no host-writable bits.
    #[error("register at offset {0:#x} is read-only")]
    ReadOnly(u64),

    /// A driver method was declared without a body.
    #[error("driver method has no body")]
    NoHandler,
}
