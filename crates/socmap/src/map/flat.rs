//! Fully-qualified name view of a placed memory map.
//!
//! Flattening walks a placed [`MemoryMap`] and gives every register, alias, and driver method
//! its dotted path. Inlined submaps add no path segment. Aliases resolve to the address of the
//! first register placed for their field.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use serde::Serialize;

use super::{EntryKind, MemoryMap, join_path};
use crate::common::addr::Address;
use crate::common::error::{MapError, Result};
use crate::csr::FieldId;
use crate::driver::DriverMethod;

/// What a fully-qualified name resolves to.
#[derive(Clone, Debug)]
pub enum FlatTarget {
    /// The canonical register of a field (or a footprint reservation).
    Register {
        /// Absolute address.
        address: Address,
    },
    /// A second name for a register placed elsewhere.
    Alias {
        /// Absolute address of the canonical register.
        address: Address,
        /// Fully-qualified name of the canonical register.
        canonical: String,
    },
    /// A host-callable operation.
    DriverMethod(DriverMethod),
}

/// One fully-qualified entry.
#[derive(Clone, Debug)]
pub struct FlatEntry {
    /// Dotted path from the root.
    pub name: String,
    /// What the path resolves to.
    pub target: FlatTarget,
}

/// The flattened map, in traversal order.
#[derive(Clone, Debug, Default)]
pub struct FlatMap {
    entries: Vec<FlatEntry>,
    index: BTreeMap<String, usize>,
}

enum Raw {
    Register(Address, Option<FieldId>),
    Alias(FieldId),
    Method(DriverMethod),
}

fn walk(
    map: &MemoryMap,
    base: u64,
    prefix: &str,
    out: &mut Vec<(String, Raw)>,
) -> Result<()> {
    for entry in map.entries() {
        let path = entry.name().map(|name| join_path(prefix, name));
        match (entry.kind(), path) {
            (EntryKind::Subrange { offset, map: sub }, path) => {
                let scope = path.as_deref().unwrap_or(prefix);
                let sub_base = match sub.place_at() {
                    Some(pinned) => pinned,
                    None => base
                        .checked_add(*offset)
                        .ok_or_else(|| MapError::overflow(scope, base, *offset))?,
                };
                walk(sub, sub_base, scope, out)?;
            }
            (EntryKind::Register { address, field }, Some(path)) => {
                let absolute = address.checked_translate(base).ok_or_else(|| {
                    MapError::overflow(path.as_str(), base, address.byte_end())
                })?;
                out.push((path, Raw::Register(absolute, *field)));
            }
            (EntryKind::Alias { field }, Some(path)) => out.push((path, Raw::Alias(*field))),
            (EntryKind::DriverMethod(method), Some(path)) => {
                out.push((path, Raw::Method(method.clone())));
            }
            (_, None) => {}
        }
    }
    Ok(())
}

impl MemoryMap {
    /// Flattens the map into fully-qualified names.
    ///
    /// An unpinned root is treated as placed at 0.
    ///
    /// # Returns
    ///
    /// `AddressOverflow` if a register lands past the top of the address space,
    /// `UnresolvedAlias` if an alias's field has no register anywhere in the map,
    /// `DuplicateDriverMethodName` or `DuplicateNamespaceEntry` if two entries end up with the
    /// same path.
    pub fn flatten(&self) -> Result<FlatMap> {
        let mut raw = Vec::new();
        walk(self, self.place_at().unwrap_or(0), "", &mut raw)?;

        let mut canonical: HashMap<FieldId, (&str, Address)> = HashMap::new();
        for (name, item) in &raw {
            if let Raw::Register(address, Some(field)) = item {
                let _ = canonical.entry(*field).or_insert((name.as_str(), *address));
            }
        }

        let mut flat = FlatMap::default();
        for (name, item) in &raw {
            let target = match item {
                Raw::Register(address, _) => FlatTarget::Register { address: *address },
                Raw::Alias(field) => {
                    let (canonical, address) =
                        canonical
                            .get(field)
                            .ok_or_else(|| MapError::UnresolvedAlias {
                                name: name.clone(),
                            })?;
                    FlatTarget::Alias {
                        address: *address,
                        canonical: (*canonical).to_owned(),
                    }
                }
                Raw::Method(method) => FlatTarget::DriverMethod(method.clone()),
            };
            flat.insert(name.clone(), target)?;
        }
        Ok(flat)
    }
}

#[derive(Serialize)]
struct Record<'a> {
    name: &'a str,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bit_offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bit_len: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias_of: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    doc: Option<&'a str>,
}

impl<'a> From<&'a FlatEntry> for Record<'a> {
    fn from(entry: &'a FlatEntry) -> Self {
        let mut record = Self {
            name: &entry.name,
            kind: "register",
            address: None,
            bit_offset: None,
            bit_len: None,
            alias_of: None,
            doc: None,
        };
        let address = match &entry.target {
            FlatTarget::Register { address } => Some(address),
            FlatTarget::Alias { address, canonical } => {
                record.kind = "alias";
                record.alias_of = Some(canonical);
                Some(address)
            }
            FlatTarget::DriverMethod(method) => {
                record.kind = "driver_method";
                record.doc = method.doc();
                None
            }
        };
        if let Some(address) = address {
            record.address = Some(address.address);
            record.bit_offset = Some(address.bit_offset);
            record.bit_len = Some(address.bit_len);
        }
        record
    }
}

impl FlatMap {
    fn insert(&mut self, name: String, target: FlatTarget) -> Result<()> {
        if let Some(&existing) = self.index.get(&name) {
            let both_methods = matches!(target, FlatTarget::DriverMethod(_))
                && matches!(self.entries[existing].target, FlatTarget::DriverMethod(_));
            return Err(if both_methods {
                MapError::DuplicateDriverMethodName { name }
            } else {
                MapError::duplicate(name)
            });
        }
        let _ = self.index.insert(name.clone(), self.entries.len());
        self.entries.push(FlatEntry { name, target });
        Ok(())
    }

    /// Looks up an entry by its fully-qualified name.
    pub fn get(&self, name: &str) -> Option<&FlatEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Resolves a register or alias name to its absolute address.
    pub fn resolve(&self, name: &str) -> Option<Address> {
        match &self.get(name)?.target {
            FlatTarget::Register { address } | FlatTarget::Alias { address, .. } => Some(*address),
            FlatTarget::DriverMethod(_) => None,
        }
    }

    /// Iterates over the entries in traversal order.
    pub fn iter(&self) -> impl Iterator<Item = &FlatEntry> {
        self.entries.iter()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the human-readable listing, one entry per line.
    pub fn listing(&self) -> String {
        let width = self.entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
        let mut out = String::new();
        for entry in &self.entries {
            let _ = match &entry.target {
                FlatTarget::Register { address } => {
                    writeln!(out, "{:<width$}  {address}", entry.name)
                }
                FlatTarget::Alias { address, canonical } => {
                    writeln!(out, "{:<width$}  {address} -> {canonical}", entry.name)
                }
                FlatTarget::DriverMethod(method) => match method.doc() {
                    Some(doc) => writeln!(out, "{:<width$}  <driver method> {doc}", entry.name),
                    None => writeln!(out, "{:<width$}  <driver method>", entry.name),
                },
            };
        }
        out
    }

    /// Serializes the map for downstream code generators.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let records: Vec<Record<'_>> = self.entries.iter().map(Record::from).collect();
        serde_json::to_string_pretty(&records)
    }
}

impl<'a> IntoIterator for &'a FlatMap {
    type Item = &'a FlatEntry;
    type IntoIter = std::slice::Iter<'a, FlatEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
