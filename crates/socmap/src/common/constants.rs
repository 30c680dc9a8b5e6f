//! Bus geometry and register limits.

/// Width of one bus word in bits; every register bank decodes 32-bit words.
pub const WORD_BITS: u64 = 32;

/// Width of one bus word in bytes.
pub const WORD_BYTES: u64 = WORD_BITS / 8;

/// Widest event register that can still be accessed atomically.
pub const MAX_EVENT_BITS: u64 = WORD_BITS;

/// Widest control or status register a bank can hold.
pub const MAX_SIGNAL_BITS: u64 = 64;

/// Name of the child injected at a node that owns a synthesized register bank.
pub const BANK_NAME: &str = "csr_bank";

/// Name of the single region reserved by [`Peripheral::with_footprint`](crate::design::Peripheral::with_footprint).
pub const FOOTPRINT_REGION: &str = "regs";

/// Separator between path segments in fully-qualified names.
pub const PATH_SEPARATOR: char = '.';
