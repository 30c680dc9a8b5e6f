//! JSON design descriptions.
//!
//! A description is the textual stand-in for an elaborated design: a table of register fields,
//! a table of component types, and the name of the top component. Children refer to component
//! types by name, so mounting one type twice mounts the same node twice (aliasing).
//!
//! ```json
//! {
//!   "fields": { "gain": { "kind": "Control", "width": 8 } },
//!   "components": {
//!     "Amp": { "fields": ["gain"], "methods": ["reset"] },
//!     "Top": { "children": [{ "name": "amp", "component": "Amp" }] }
//!   },
//!   "top": "Top"
//! }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use super::{Addressing, ChildMode, ComponentNode, Design, NodeId, Peripheral};
use crate::common::addr::{Address, AddressSpec, deserialize_literal};
use crate::common::constants::WORD_BITS;
use crate::common::error::{LoadError, MapError, Result};
use crate::csr::{FieldId, RegisterField, RegisterKind};
use crate::driver::DriverMethod;
use crate::map::MemoryMap;

/// A register field entry of the field table.
#[derive(Clone, Debug, Deserialize)]
pub struct FieldDesc {
    /// Classification text (`Control`, `Status`, `Event`).
    pub kind: String,
    /// Width in bits.
    #[serde(default)]
    pub width: Option<u64>,
    /// Declared placement inside the bank.
    #[serde(default)]
    pub address: AddressSpec,
    /// Count host reads.
    #[serde(default)]
    pub read_strobe: bool,
    /// Count host writes.
    #[serde(default)]
    pub write_strobe: bool,
}

/// Reference from a component to the field table.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum FieldRef {
    /// Use the table key as the local name.
    Key(String),
    /// Mount a table entry under a different local name.
    Named {
        /// Local name inside the component.
        name: String,
        /// Key in the field table.
        field: String,
    },
}

impl FieldRef {
    fn parts(&self) -> (&str, &str) {
        match self {
            Self::Key(key) => (key, key),
            Self::Named { name, field } => (name, field),
        }
    }
}

/// A driver method declaration.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum MethodDesc {
    /// Just the name.
    Name(String),
    /// Name and description.
    Documented {
        /// Method name.
        name: String,
        /// One-line description.
        #[serde(default)]
        doc: Option<String>,
    },
}

/// A child mount.
#[derive(Clone, Debug, Deserialize)]
pub struct ChildDesc {
    /// Name inside the parent.
    pub name: String,
    /// Component type mounted.
    pub component: String,
    /// Mount mode.
    #[serde(default)]
    pub mode: ChildMode,
}

/// A register inside a peripheral's pre-built map.
#[derive(Clone, Debug, Deserialize)]
pub struct PeripheralRegDesc {
    /// Register name.
    pub name: String,
    /// Byte offset inside the peripheral.
    #[serde(deserialize_with = "deserialize_literal")]
    pub offset: u64,
    /// Width in bits.
    #[serde(default = "default_reg_bits")]
    pub bits: u64,
}

const fn default_reg_bits() -> u64 {
    WORD_BITS
}

/// Marks a component as an opaque peripheral.
#[derive(Clone, Debug, Deserialize)]
pub struct PeripheralDesc {
    /// Label used for configuration overrides; defaults to the component name.
    #[serde(default)]
    pub label: Option<String>,
    /// Size of the opaque region, used when no registers are listed.
    #[serde(default, deserialize_with = "deserialize_literal")]
    pub footprint: u64,
    /// Registers of the pre-built map.
    #[serde(default)]
    pub registers: Vec<PeripheralRegDesc>,
    /// `"auto"` or an absolute base.
    #[serde(default)]
    pub address: Addressing,
}

/// A component type.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ComponentDesc {
    /// Declared fields.
    pub fields: Vec<FieldRef>,
    /// Structurally driven fields.
    pub driven: Vec<FieldRef>,
    /// Driver methods.
    pub methods: Vec<MethodDesc>,
    /// Children in declaration order.
    pub children: Vec<ChildDesc>,
    /// Present for opaque peripherals.
    pub peripheral: Option<PeripheralDesc>,
}

/// A whole design description.
#[derive(Clone, Debug, Deserialize)]
pub struct DesignDesc {
    /// Field table.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDesc>,
    /// Component table.
    pub components: BTreeMap<String, ComponentDesc>,
    /// Name of the top component.
    pub top: String,
}

impl DesignDesc {
    /// Parses a description from JSON text.
    pub fn from_json(text: &str) -> std::result::Result<Self, LoadError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and parses a description file.
    pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Self, LoadError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Builds the design arena.
    ///
    /// Each component type becomes exactly one node, however often it is mounted.
    ///
    /// # Returns
    ///
    /// The design and its top node; `UnsupportedRegisterKind` for an unknown field kind,
    /// `InvalidDesign` for unknown names or a cycle between component types.
    pub fn instantiate(&self) -> Result<(Design, NodeId)> {
        let mut builder = Builder {
            desc: self,
            design: Design::new(),
            fields: HashMap::new(),
            nodes: HashMap::new(),
            active: HashSet::new(),
        };
        for (key, field) in &self.fields {
            let kind = RegisterKind::parse(key, &field.kind)?;
            let mut built = RegisterField::of_kind(key.clone(), kind, field.width).at(field.address);
            if field.read_strobe {
                built = built.with_read_strobe();
            }
            if field.write_strobe {
                built = built.with_write_strobe();
            }
            let _ = builder.fields.insert(key.as_str(), builder.design.add_field(built));
        }
        let top = builder.component(&self.top)?;
        tracing::debug!(
            fields = self.fields.len(),
            nodes = builder.design.node_count(),
            top = %self.top,
            "instantiated design description"
        );
        Ok((builder.design, top))
    }
}

struct Builder<'a> {
    desc: &'a DesignDesc,
    design: Design,
    fields: HashMap<&'a str, FieldId>,
    nodes: HashMap<&'a str, NodeId>,
    active: HashSet<&'a str>,
}

impl<'a> Builder<'a> {
    fn field(&self, component: &str, reference: &FieldRef) -> Result<(String, FieldId)> {
        let (name, key) = reference.parts();
        self.fields
            .get(key)
            .map(|&id| (name.to_owned(), id))
            .ok_or_else(|| {
                MapError::invalid_design(format!("`{component}` references unknown field `{key}`"))
            })
    }

    fn component(&mut self, name: &'a str) -> Result<NodeId> {
        if let Some(&id) = self.nodes.get(name) {
            return Ok(id);
        }
        let table = self.desc;
        let Some((name, desc)) = table.components.get_key_value(name) else {
            return Err(MapError::invalid_design(format!("unknown component `{name}`")));
        };
        if !self.active.insert(name.as_str()) {
            return Err(MapError::invalid_design(format!(
                "component `{name}` contains itself"
            )));
        }

        let mut node = ComponentNode::new(name.clone());
        for reference in &desc.fields {
            let (local, id) = self.field(name, reference)?;
            node = node.with_field(local, id);
        }
        for reference in &desc.driven {
            let (local, id) = self.field(name, reference)?;
            node = node.with_driven(local, id);
        }
        for method in &desc.methods {
            let (method, doc) = match method {
                MethodDesc::Name(method) => (method, None),
                MethodDesc::Documented { name, doc } => (name, doc.as_ref()),
            };
            let mut declared = DriverMethod::declared(method.clone());
            if let Some(doc) = doc {
                declared = declared.with_doc(doc.clone());
            }
            node = node.with_method(declared);
        }
        for child in &desc.children {
            let id = self.component(&child.component)?;
            node = node.with_child(child.name.clone(), id, child.mode);
        }
        if let Some(peripheral) = &desc.peripheral {
            node = node.as_peripheral(peripheral_of(name, peripheral)?);
        }

        let id = self.design.add_node(node)?;
        let _ = self.active.remove(name.as_str());
        let _ = self.nodes.insert(name.as_str(), id);
        Ok(id)
    }
}

fn peripheral_of(component: &str, desc: &PeripheralDesc) -> Result<Peripheral> {
    let label = desc.label.clone().unwrap_or_else(|| component.to_owned());
    let peripheral = if desc.registers.is_empty() {
        Peripheral::with_footprint(label, desc.footprint)?
    } else {
        let mut map = MemoryMap::new();
        for register in &desc.registers {
            map.add_register(&register.name, Address::bits(register.offset, register.bits), None)?;
        }
        if desc.footprint > map.byte_len() {
            let _ = map.reserve("reserved", desc.footprint - map.byte_len())?;
        }
        Peripheral::new(label, map)
    };
    Ok(peripheral.with_addressing(desc.address))
}
