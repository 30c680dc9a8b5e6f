//! Hierarchical memory maps.
//!
//! A `MemoryMap` is an ordered namespace of registers, nested submaps, aliases, and driver
//! methods. It provides:
//! 1. **Allocation:** Word-aligned placement of registers and submaps in declaration order.
//! 2. **Namespacing:** Unique names per map; inlined (unnamed) submaps merge their names into
//!    the parent.
//! 3. **Placement:** Pinning a map to an absolute base, and collecting the absolute ranges of
//!    every labelled submap.
//! 4. **Flattening:** See [`flat`] for the fully-qualified name view.

use crate::common::addr::{Address, AddressRange};
use crate::common::constants::{PATH_SEPARATOR, WORD_BITS, WORD_BYTES};
use crate::common::error::{MapError, Result};
use crate::csr::FieldId;
use crate::driver::DriverMethod;

/// Fully-qualified view of a placed map.
pub mod flat;

pub use flat::{FlatEntry, FlatMap, FlatTarget};

/// Joins a dotted path and one more segment.
pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}{PATH_SEPARATOR}{name}")
    }
}

/// What a map entry points at.
#[derive(Clone, Debug)]
pub enum EntryKind {
    /// A leaf register; `field` is `None` for plain footprint reservations.
    Register {
        /// Map-relative address.
        address: Address,
        /// The field implemented here.
        field: Option<FieldId>,
    },
    /// A nested map.
    Subrange {
        /// Byte offset inside the parent; ignored when the submap is pinned.
        offset: u64,
        /// The nested map.
        map: MemoryMap,
    },
    /// A second name for a register that is placed elsewhere.
    Alias {
        /// The field whose canonical register this name resolves to.
        field: FieldId,
    },
    /// A host-callable operation; occupies no address space.
    DriverMethod(DriverMethod),
}

/// One named entry of a map. Only inlined subranges are unnamed.
#[derive(Clone, Debug)]
pub struct MapEntry {
    name: Option<String>,
    kind: EntryKind,
}

impl MapEntry {
    /// Returns the entry name, or `None` for an inlined subrange.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns what the entry points at.
    pub const fn kind(&self) -> &EntryKind {
        &self.kind
    }

    const fn is_driver_method(&self) -> bool {
        matches!(self.kind, EntryKind::DriverMethod(_))
    }
}

/// Absolute byte range claimed by a labelled map after placement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Label of the map (peripheral or bank path).
    pub label: String,
    /// Absolute byte range.
    pub range: AddressRange,
    /// `true` if the map holds no registers.
    pub is_empty: bool,
    /// `true` if the map was merged into its parent's namespace.
    pub was_inlined: bool,
}

/// An ordered, hierarchical register namespace.
#[derive(Clone, Debug, Default)]
pub struct MemoryMap {
    entries: Vec<MapEntry>,
    len_bits: u64,
    is_top: bool,
    was_inlined: bool,
    place_at: Option<u64>,
    label: Option<String>,
}

impl MemoryMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map with an identity label.
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    /// Creates a map holding one opaque region of `bytes` at offset 0.
    ///
    /// A zero-byte region adds nothing, so the map stays empty.
    ///
    /// # Returns
    ///
    /// `AddressOverflow` if `bytes` cannot be expressed in bits.
    pub fn with_region(name: impl Into<String>, bytes: u64) -> Result<Self> {
        let mut map = Self::new();
        if bytes > 0 {
            let name = name.into();
            let bits = bytes
                .checked_mul(8)
                .ok_or_else(|| MapError::overflow(name.as_str(), 0, bytes))?;
            map.len_bits = bits;
            map.push(
                Some(name),
                EntryKind::Register {
                    address: Address::bits(0, bits),
                    field: None,
                },
            );
        }
        Ok(map)
    }

    /// Returns the entries in insertion order.
    pub fn entries(&self) -> &[MapEntry] {
        &self.entries
    }

    /// Returns the footprint in bytes, rounded up to a whole bus word.
    pub const fn byte_len(&self) -> u64 {
        self.len_bits.div_ceil(WORD_BITS) * WORD_BYTES
    }

    /// Returns `true` if neither this map nor any submap holds anything but aliases.
    ///
    /// A map exporting only driver methods is not empty, though it spans no bytes.
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|entry| match &entry.kind {
            EntryKind::Register { .. } | EntryKind::DriverMethod(_) => false,
            EntryKind::Subrange { map, .. } => map.is_empty(),
            EntryKind::Alias { .. } => true,
        })
    }

    /// Marks this map as the root of the composition.
    pub const fn set_top(&mut self) {
        self.is_top = true;
    }

    /// Returns `true` for the root map.
    pub const fn is_top(&self) -> bool {
        self.is_top
    }

    /// Pins the map at an absolute base address.
    pub const fn place(&mut self, base: u64) {
        self.place_at = Some(base);
    }

    /// Returns the absolute base the map is pinned at, if any.
    pub const fn place_at(&self) -> Option<u64> {
        self.place_at
    }

    /// Returns the identity label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Sets the identity label.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = Some(label.into());
    }

    /// Returns `true` if the map was added to its parent without a name.
    pub const fn was_inlined(&self) -> bool {
        self.was_inlined
    }

    /// Finds an entry by name in the merged namespace (inlined submaps included).
    pub fn find(&self, name: &str) -> Option<&MapEntry> {
        self.entries.iter().find_map(|entry| match (&entry.name, &entry.kind) {
            (Some(own), _) if own == name => Some(entry),
            (None, EntryKind::Subrange { map, .. }) => map.find(name),
            _ => None,
        })
    }

    /// Returns every name of the merged namespace in order.
    pub fn names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for entry in &self.entries {
            match (&entry.name, &entry.kind) {
                (Some(name), _) => names.push(name.as_str()),
                (None, EntryKind::Subrange { map, .. }) => names.extend(map.names()),
                (None, _) => {}
            }
        }
        names
    }

    fn check_name(&self, name: &str, is_driver_method: bool) -> Result<()> {
        match self.find(name) {
            Some(existing) if is_driver_method && existing.is_driver_method() => {
                Err(MapError::DuplicateDriverMethodName {
                    name: name.to_owned(),
                })
            }
            Some(_) => Err(MapError::duplicate(name)),
            None => Ok(()),
        }
    }

    fn push(&mut self, name: Option<String>, kind: EntryKind) {
        self.entries.push(MapEntry { name, kind });
    }

    /// Adds a register at a fixed map-relative address.
    pub fn add_register(
        &mut self,
        name: &str,
        address: Address,
        field: Option<FieldId>,
    ) -> Result<()> {
        self.check_name(name, false)?;
        let end = address.checked_end_bit().ok_or_else(|| {
            MapError::overflow(name, address.address, address.bit_len.div_ceil(8))
        })?;
        self.len_bits = self.len_bits.max(end);
        self.push(Some(name.to_owned()), EntryKind::Register { address, field });
        Ok(())
    }

    /// Allocates a register of `bit_len` bits at the next free word.
    pub fn allocate(
        &mut self,
        name: &str,
        bit_len: u64,
        field: Option<FieldId>,
    ) -> Result<Address> {
        let start = self
            .len_bits
            .checked_next_multiple_of(WORD_BITS)
            .ok_or_else(|| MapError::overflow(name, self.len_bits / 8, bit_len.div_ceil(8)))?;
        let address = Address::bits(start / 8, bit_len);
        self.add_register(name, address, field)?;
        Ok(address)
    }

    /// Reserves `bytes` of opaque address space under `name`.
    pub fn reserve(&mut self, name: &str, bytes: u64) -> Result<Address> {
        let bits = bytes
            .checked_mul(8)
            .ok_or_else(|| MapError::overflow(name, self.len_bits / 8, bytes))?;
        self.allocate(name, bits, None)
    }

    /// Adds a submap.
    ///
    /// A pinned submap (see [`MemoryMap::place`]) consumes no space in this map; otherwise it is
    /// placed at the next word boundary and the cursor advances by its footprint.
    ///
    /// # Arguments
    ///
    /// * `map` - The submap.
    /// * `name` - Its name, or `None` to inline it into this map's namespace.
    ///
    /// # Returns
    ///
    /// The submap's byte offset inside this map (0 when pinned).
    pub fn allocate_subrange(&mut self, mut map: Self, name: Option<&str>) -> Result<u64> {
        match name {
            Some(name) => self.check_name(name, false)?,
            None => {
                map.was_inlined = true;
                for merged in map.names() {
                    let is_method = map.find(merged).is_some_and(MapEntry::is_driver_method);
                    self.check_name(merged, is_method)?;
                }
            }
        }

        let offset = if map.place_at.is_some() {
            0
        } else {
            let len = map.byte_len();
            let overflow = || {
                let what = name.or(map.label()).unwrap_or_default();
                MapError::overflow(what, self.len_bits / 8, len)
            };
            let offset = self
                .len_bits
                .checked_next_multiple_of(WORD_BITS)
                .ok_or_else(overflow)?
                / 8;
            self.len_bits = offset
                .checked_add(len)
                .and_then(|end| end.checked_mul(8))
                .ok_or_else(overflow)?;
            offset
        };
        self.push(name.map(str::to_owned), EntryKind::Subrange { offset, map });
        Ok(offset)
    }

    /// Adds a second name for the register implementing `field`.
    pub fn add_alias(&mut self, name: &str, field: FieldId) -> Result<()> {
        self.check_name(name, false)?;
        self.push(Some(name.to_owned()), EntryKind::Alias { field });
        Ok(())
    }

    /// Exports a driver method under its own name.
    pub fn add_driver_method(&mut self, method: DriverMethod) -> Result<()> {
        let name = method.name().to_owned();
        self.check_name(&name, true)?;
        self.push(Some(name), EntryKind::DriverMethod(method));
        Ok(())
    }

    /// Collects the absolute range of this map and every labelled submap.
    ///
    /// An unpinned root is treated as placed at 0.
    ///
    /// # Returns
    ///
    /// `AddressOverflow` if a map would end past the top of the 64-bit address space.
    pub fn placements(&self) -> Result<Vec<Placement>> {
        let mut out = Vec::new();
        self.collect_placements(self.place_at.unwrap_or(0), &mut out)?;
        Ok(out)
    }

    fn collect_placements(&self, base: u64, out: &mut Vec<Placement>) -> Result<()> {
        if let Some(label) = &self.label {
            let len = self.byte_len();
            let range = AddressRange::checked_with_len(base, len)
                .ok_or_else(|| MapError::overflow(label.as_str(), base, len))?;
            out.push(Placement {
                label: label.clone(),
                range,
                is_empty: self.is_empty(),
                was_inlined: self.was_inlined,
            });
        }
        for entry in &self.entries {
            if let EntryKind::Subrange { offset, map } = &entry.kind {
                let sub_base = match map.place_at {
                    Some(pinned) => pinned,
                    None => base.checked_add(*offset).ok_or_else(|| {
                        let what = entry.name().or(map.label()).unwrap_or_default();
                        MapError::overflow(what, base, *offset)
                    })?,
                };
                map.collect_placements(sub_base, out)?;
            }
        }
        Ok(())
    }
}
