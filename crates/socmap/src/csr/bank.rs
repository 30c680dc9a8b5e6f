//! Synthesized register banks.
//!
//! A register bank is the bus-facing decode logic generated for the fields a component owns.
//! It provides:
//! 1. **Allocation:** Explicitly addressed fields are pinned first; the rest follow in declaration
//!    order, each starting on a fresh 32-bit word. There is no bit packing.
//! 2. **Decode:** 32-bit word reads and writes at bank-relative byte offsets.
//! 3. **Events:** Event registers dispatch to their handler and fault when none is installed.
//! 4. **Strobes:** Optional per-register counters of host reads and writes.

use std::fmt;
use std::sync::Arc;

use crate::common::addr::Address;
use crate::common::constants::{WORD_BITS, WORD_BYTES};
use crate::common::error::{BusError, BusResult, MapError, Result};
use crate::csr::{EventHandler, FieldId, RegisterField, RegisterKind};
use crate::map::MemoryMap;

/// Host access counters of one register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Strobes {
    /// Number of host reads seen (only counted with a read strobe).
    pub reads: u64,
    /// Number of host writes seen (only counted with a write strobe).
    pub writes: u64,
}

/// One register inside a bank.
pub struct BankRegister {
    name: String,
    field: FieldId,
    kind: RegisterKind,
    address: Address,
    handler: Option<Arc<dyn EventHandler>>,
    read_strobe: bool,
    write_strobe: bool,
    value: u64,
    strobes: Strobes,
}

impl BankRegister {
    /// Returns the register's name inside the owning component.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field this register implements.
    pub const fn field(&self) -> FieldId {
        self.field
    }

    /// Returns the access kind.
    pub const fn kind(&self) -> RegisterKind {
        self.kind
    }

    /// Returns the bank-relative address.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Returns the stored value (control) or the last driven value (status).
    pub const fn value(&self) -> u64 {
        self.value
    }

    /// Returns the access counters.
    pub const fn strobes(&self) -> Strobes {
        self.strobes
    }

    /// Returns the inclusive range of bus words this register touches.
    const fn words(&self) -> (u64, u64) {
        (
            self.address.start_bit() / WORD_BITS,
            (self.address.end_bit() - 1) / WORD_BITS,
        )
    }

    /// Returns the part of this register that falls into the word `[lo, lo + 32)`.
    ///
    /// # Returns
    ///
    /// (shift inside the word, first register bit, bit count)
    fn slice(&self, lo: u64) -> (u64, u64, u64) {
        let start = self.address.start_bit().max(lo);
        let end = self.address.end_bit().min(lo.saturating_add(WORD_BITS));
        (start - lo, start - self.address.start_bit(), end - start)
    }
}

impl fmt::Debug for BankRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BankRegister")
            .field("name", &self.name)
            .field("field", &self.field)
            .field("kind", &self.kind)
            .field("address", &self.address)
            .field("value", &self.value)
            .field("strobes", &self.strobes)
            .finish_non_exhaustive()
    }
}

const fn low_mask(bits: u64) -> u64 {
    if bits >= 64 { u64::MAX } else { (1 << bits) - 1 }
}

/// First bit of the bus word holding byte `offset`, if it is addressable in bits.
const fn word_start(offset: u64) -> Option<u64> {
    (offset / WORD_BYTES).checked_mul(WORD_BITS)
}

/// Read/write decode logic for the fields owned by one component.
#[derive(Debug)]
pub struct RegisterBank {
    label: String,
    map: MemoryMap,
    registers: Vec<BankRegister>,
}

impl RegisterBank {
    /// Synthesizes a bank covering exactly `fields`.
    ///
    /// # Arguments
    ///
    /// * `label` - Path of the bank, used as its identity in diagnostics.
    /// * `fields` - (local name, id, declaration) of every field the bank owns, in declaration order.
    ///
    /// # Returns
    ///
    /// The bank with its bank-relative memory map, or `InvalidRegisterConfig` if a field is
    /// malformed or two registers collide.
    pub fn synthesize(
        label: impl Into<String>,
        fields: &[(&str, FieldId, &RegisterField)],
    ) -> Result<Self> {
        let mut pinned = Vec::with_capacity(fields.len());
        let mut high_bit = 0;
        for (_, _, field) in fields {
            field.validate()?;
            let address = field.address().resolve(field.bit_len().unwrap_or(0));
            if let Some(address) = address {
                high_bit = high_bit.max(address.end_bit());
            }
            pinned.push(address);
        }

        let mut registers: Vec<BankRegister> = Vec::with_capacity(fields.len());
        for ((name, id, field), pinned) in fields.iter().zip(pinned) {
            let address = match pinned {
                Some(address) => address,
                None => {
                    let bits = field.bit_len().unwrap_or(0);
                    let overflow = || MapError::overflow(*name, high_bit / 8, bits.div_ceil(8));
                    let start = high_bit
                        .checked_next_multiple_of(WORD_BITS)
                        .ok_or_else(overflow)?;
                    high_bit = start.checked_add(bits).ok_or_else(overflow)?;
                    Address::bits(start / 8, bits)
                }
            };
            let register = BankRegister {
                name: (*name).to_owned(),
                field: *id,
                kind: field.kind(),
                address,
                handler: field.handler().cloned(),
                read_strobe: field.read_strobe(),
                write_strobe: field.write_strobe(),
                value: 0,
                strobes: Strobes::default(),
            };
            check_collisions(&registers, &register)?;
            registers.push(register);
        }

        let label = label.into();
        let mut map = MemoryMap::new();
        for register in &registers {
            map.add_register(&register.name, register.address, Some(register.field))?;
        }
        map.set_label(label.clone());

        tracing::debug!(
            bank = %label,
            registers = registers.len(),
            bytes = map.byte_len(),
            "synthesized register bank"
        );
        Ok(Self {
            label,
            map,
            registers,
        })
    }

    /// Returns the bank's path.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the bank-relative memory map.
    pub const fn map(&self) -> &MemoryMap {
        &self.map
    }

    /// Returns the registers in declaration order.
    pub fn registers(&self) -> &[BankRegister] {
        &self.registers
    }

    /// Looks up a register by its local name.
    pub fn register(&self, name: &str) -> Option<&BankRegister> {
        self.registers.iter().find(|r| r.name == name)
    }

    /// Returns `true` if the bank implements `field`.
    pub fn owns(&self, field: FieldId) -> bool {
        self.registers.iter().any(|r| r.field == field)
    }

    /// Returns the bank's footprint in bytes.
    pub const fn footprint(&self) -> u64 {
        self.map.byte_len()
    }

    /// Returns the value held for `field`.
    pub fn value(&self, field: FieldId) -> Option<u64> {
        self.registers
            .iter()
            .find(|r| r.field == field)
            .map(BankRegister::value)
    }

    /// Returns the access counters for `field`.
    pub fn strobes(&self, field: FieldId) -> Option<Strobes> {
        self.registers
            .iter()
            .find(|r| r.field == field)
            .map(BankRegister::strobes)
    }

    /// Sets the value the hardware drives onto a status register.
    ///
    /// # Returns
    ///
    /// `false` if `field` is not a status register of this bank.
    pub fn drive_status(&mut self, field: FieldId, value: u64) -> bool {
        match self
            .registers
            .iter_mut()
            .find(|r| r.field == field && r.kind == RegisterKind::Status)
        {
            Some(register) => {
                register.value = value & low_mask(register.address.bit_len);
                true
            }
            None => false,
        }
    }

    fn covering(&self, lo: u64) -> Vec<usize> {
        let hi = lo.saturating_add(WORD_BITS);
        self.registers
            .iter()
            .enumerate()
            .filter(|(_, r)| r.address.start_bit() < hi && r.address.end_bit() > lo)
            .map(|(i, _)| i)
            .collect()
    }

    /// Answers a read of the 32-bit word containing bank offset `offset`.
    pub fn read(&mut self, offset: u64) -> BusResult<u32> {
        let lo = word_start(offset).ok_or(BusError::Unmapped(offset))?;
        let hits = self.covering(lo);
        if hits.is_empty() {
            return Err(BusError::Unmapped(offset));
        }

        let mut word = 0u64;
        for i in hits {
            let register = &mut self.registers[i];
            if register.read_strobe {
                register.strobes.reads += 1;
            }
            if register.kind == RegisterKind::Event {
                return match &register.handler {
                    Some(handler) => handler.handle_read(),
                    None => Err(BusError::Fault),
                };
            }
            let (shift, first, count) = register.slice(lo);
            word |= ((register.value >> first) & low_mask(count)) << shift;
        }
        Ok(word as u32)
    }

    /// Answers a write of the 32-bit word containing bank offset `offset`.
    ///
    /// Status bits in the word are left untouched; a word without any control bits answers
    /// [`BusError::ReadOnly`].
    pub fn write(&mut self, offset: u64, value: u32) -> BusResult<()> {
        let lo = word_start(offset).ok_or(BusError::Unmapped(offset))?;
        let hits = self.covering(lo);
        if hits.is_empty() {
            return Err(BusError::Unmapped(offset));
        }

        let mut wrote = false;
        for i in hits {
            let register = &mut self.registers[i];
            match register.kind {
                RegisterKind::Event => {
                    if register.write_strobe {
                        register.strobes.writes += 1;
                    }
                    return match &register.handler {
                        Some(handler) => handler.handle_write(value),
                        None => Err(BusError::Fault),
                    };
                }
                RegisterKind::Status => {}
                RegisterKind::Control => {
                    let (shift, first, count) = register.slice(lo);
                    let bits = (u64::from(value) >> shift) & low_mask(count);
                    let keep = !(low_mask(count) << first);
                    register.value = (register.value & keep) | (bits << first);
                    if register.write_strobe {
                        register.strobes.writes += 1;
                    }
                    wrote = true;
                }
            }
        }
        if wrote {
            Ok(())
        } else {
            Err(BusError::ReadOnly(offset))
        }
    }
}

fn check_collisions(existing: &[BankRegister], register: &BankRegister) -> Result<()> {
    for other in existing {
        if other.address.overlaps(&register.address) {
            return Err(MapError::invalid_register(
                &register.name,
                format!("overlaps register `{}` at {}", other.name, other.address),
            ));
        }
        let events = register.kind == RegisterKind::Event || other.kind == RegisterKind::Event;
        let (a_lo, a_hi) = register.words();
        let (b_lo, b_hi) = other.words();
        if events && a_lo <= b_hi && b_lo <= a_hi {
            return Err(MapError::invalid_register(
                &register.name,
                format!("shares a bus word with event register `{}`", other.name),
            ));
        }
    }
    Ok(())
}
