//! Register classification.
//!
//! This module defines the host-visible registers a component can declare. It provides:
//! 1. **Kinds:** Control (host-writable), Status (host-readable), and Event (stateful, with
//!    fault-by-default access).
//! 2. **Fields:** `RegisterField` carries a width, an optional explicit address, strobe flags,
//!    and for events an optional custom handler.
//! 3. **Identity:** Fields are identified by their arena index (`FieldId`), never by name.
//! 4. **Banks:** The bus-facing logic synthesized for a node's newly owned fields.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::common::addr::AddressSpec;
use crate::common::constants::{MAX_EVENT_BITS, MAX_SIGNAL_BITS, WORD_BITS};
use crate::common::error::{BusError, BusResult, MapError, Result};

/// Synthesized register banks.
pub mod bank;

pub use bank::{BankRegister, RegisterBank, Strobes};

/// Stable arena index of a register field; two paths reach the same field iff the ids match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub usize);

/// Declared access kind of a register field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegisterKind {
    /// Written by the host, read by the hardware.
    Control,
    /// Driven by the hardware, read by the host.
    Status,
    /// Not backed by storage; every access runs a handler.
    Event,
}

impl RegisterKind {
    /// Parses a textual classification.
    ///
    /// Accepts the kind names case-insensitively, plus the `ControlSignal`, `StatusSignal`, and
    /// `EventReg` spellings used by hardware descriptions.
    ///
    /// # Arguments
    ///
    /// * `field` - Name of the field, used in the error.
    /// * `kind` - The classification text.
    pub fn parse(field: &str, kind: &str) -> Result<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "control" | "controlsignal" => Ok(Self::Control),
            "status" | "statussignal" => Ok(Self::Status),
            "event" | "eventreg" => Ok(Self::Event),
            _ => Err(MapError::UnsupportedRegisterKind {
                field: field.to_owned(),
                kind: kind.to_owned(),
            }),
        }
    }

    /// Returns `true` for kinds the host may write.
    pub const fn is_host_writable(self) -> bool {
        matches!(self, Self::Control | Self::Event)
    }

    /// Returns the kind name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Control => "Control",
            Self::Status => "Status",
            Self::Event => "Event",
        }
    }
}

impl fmt::Display for RegisterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bus-side behavior of an event register.
///
/// Both methods answer with an error response unless overridden; an event register without a
/// custom handler is a placeholder that faults on every access.
pub trait EventHandler: Send + Sync {
    /// Answers a read transaction.
    fn handle_read(&self) -> BusResult<u32> {
        Err(BusError::Fault)
    }

    /// Answers a write transaction.
    fn handle_write(&self, _value: u32) -> BusResult<()> {
        Err(BusError::Fault)
    }
}

/// The handler installed on event registers that have none of their own.
#[derive(Clone, Copy, Debug, Default)]
pub struct FaultingEvent;

impl EventHandler for FaultingEvent {}

/// A named, host-visible piece of state declared by a component.
#[derive(Clone)]
pub struct RegisterField {
    name: String,
    kind: RegisterKind,
    width: Option<u64>,
    address: AddressSpec,
    read_strobe: bool,
    write_strobe: bool,
    handler: Option<Arc<dyn EventHandler>>,
}

impl RegisterField {
    fn with_kind(name: impl Into<String>, kind: RegisterKind, width: Option<u64>) -> Self {
        Self {
            name: name.into(),
            kind,
            width,
            address: AddressSpec::Unset,
            read_strobe: false,
            write_strobe: false,
            handler: None,
        }
    }

    /// Creates a host-writable control register of `width` bits.
    pub fn control(name: impl Into<String>, width: u64) -> Self {
        Self::with_kind(name, RegisterKind::Control, Some(width))
    }

    /// Creates a host-readable status register of `width` bits.
    pub fn status(name: impl Into<String>, width: u64) -> Self {
        Self::with_kind(name, RegisterKind::Status, Some(width))
    }

    /// Creates an event register.
    ///
    /// `bits` may be omitted when the field is given an exact address, which then supplies the
    /// length.
    pub fn event(name: impl Into<String>, bits: Option<u64>) -> Self {
        Self::with_kind(name, RegisterKind::Event, bits)
    }

    /// Creates a field of any kind, as read from a textual description.
    pub fn of_kind(name: impl Into<String>, kind: RegisterKind, width: Option<u64>) -> Self {
        Self::with_kind(name, kind, width)
    }

    /// Pins the field to an explicit address inside its bank.
    #[must_use]
    pub fn at(mut self, address: impl Into<AddressSpec>) -> Self {
        self.address = address.into();
        self
    }

    /// Counts host reads of this register.
    #[must_use]
    pub const fn with_read_strobe(mut self) -> Self {
        self.read_strobe = true;
        self
    }

    /// Counts host writes of this register.
    #[must_use]
    pub const fn with_write_strobe(mut self) -> Self {
        self.write_strobe = true;
        self
    }

    /// Installs a custom handler on an event register.
    #[must_use]
    pub fn with_handler(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Returns the declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the access kind.
    pub const fn kind(&self) -> RegisterKind {
        self.kind
    }

    /// Returns the declared width, if any.
    pub const fn width(&self) -> Option<u64> {
        self.width
    }

    /// Returns the declared placement.
    pub const fn address(&self) -> AddressSpec {
        self.address
    }

    /// Returns `true` if host reads are counted.
    pub const fn read_strobe(&self) -> bool {
        self.read_strobe
    }

    /// Returns `true` if host writes are counted.
    pub const fn write_strobe(&self) -> bool {
        self.write_strobe
    }

    /// Returns the custom event handler, if one was installed.
    pub fn handler(&self) -> Option<&Arc<dyn EventHandler>> {
        self.handler.as_ref()
    }

    /// Returns the register length: an exact address's length wins over the declared width.
    ///
    /// An event pinned at a byte offset with no width spans one bus word.
    pub fn bit_len(&self) -> Option<u64> {
        self.address.bit_len().or(self.width).or_else(|| {
            (self.kind == RegisterKind::Event && matches!(self.address, AddressSpec::Offset(_)))
                .then_some(WORD_BITS)
        })
    }

    /// Checks the field's configuration.
    ///
    /// # Returns
    ///
    /// `InvalidRegisterConfig` when the length is missing, zero, inconsistent, or too wide for
    /// the kind, when a pinned address does not fit in 64 bits, or when a non-event field
    /// carries an event handler.
    pub fn validate(&self) -> Result<()> {
        if let (Some(exact), Some(width)) = (self.address.bit_len(), self.width) {
            if exact != width {
                return Err(MapError::invalid_register(
                    &self.name,
                    format!("address spans {exact} bits but the field is {width} bits wide"),
                ));
            }
        }
        if self.handler.is_some() && self.kind != RegisterKind::Event {
            return Err(MapError::invalid_register(
                &self.name,
                "only event registers take a custom handler",
            ));
        }

        if let Some(pinned) = self.bit_len().and_then(|bits| self.address.resolve(bits)) {
            if pinned.checked_end_bit().is_none() {
                return Err(MapError::invalid_register(
                    &self.name,
                    format!("address {:#x} lies past the end of the address space", pinned.address),
                ));
            }
        }

        let (limit, why) = match self.kind {
            RegisterKind::Event => (MAX_EVENT_BITS, "event register access would not be atomic"),
            RegisterKind::Control | RegisterKind::Status => {
                (MAX_SIGNAL_BITS, "register is wider than a bank can hold")
            }
        };
        match self.bit_len() {
            None if self.kind == RegisterKind::Event => Err(MapError::invalid_register(
                &self.name,
                "event register needs an explicit address or bit width",
            )),
            None => Err(MapError::invalid_register(&self.name, "missing width")),
            Some(0) => Err(MapError::invalid_register(&self.name, "zero-width register")),
            Some(bits) if bits > limit => Err(MapError::invalid_register(
                &self.name,
                format!("{why} ({bits} bits > {limit})"),
            )),
            Some(_) => Ok(()),
        }
    }
}

impl fmt::Debug for RegisterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterField")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("width", &self.width)
            .field("address", &self.address)
            .field("read_strobe", &self.read_strobe)
            .field("write_strobe", &self.write_strobe)
            .field("custom_handler", &self.handler.is_some())
            .finish()
    }
}
