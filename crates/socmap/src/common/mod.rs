//! Common utilities and types used throughout the map builder.
//!
//! This module provides the building blocks shared by every pass. It includes:
//! 1. **Address Types:** Bit-granular register addresses, declared placements, and byte ranges.
//! 2. **Constants:** Bus word geometry and register width limits.
//! 3. **Error Handling:** The fatal build error taxonomy plus loader and bus errors.

/// Address type definitions (resolved addresses, declared placements, ranges).
pub mod addr;

/// Common constants used throughout the builder.
pub mod constants;

/// Error types for builds, loaders, and register bank transactions.
pub mod error;

pub use addr::{Address, AddressRange, AddressSpec};
pub use constants::{WORD_BITS, WORD_BYTES};
pub use error::{BusError, BusResult, LoadError, MapError, Result};
