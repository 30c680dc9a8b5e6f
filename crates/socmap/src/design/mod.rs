//! Component tree consumed from elaboration.
//!
//! The design is an arena of register fields and component nodes. It provides:
//! 1. **Identity:** `FieldId` and `NodeId` are arena indices; a field reached through two paths
//!    is the same field.
//! 2. **Structure:** Nodes list declared fields, structurally driven fields, driver methods,
//!    and named children with a mount mode (`Nested`, `Inline`, `Ignore`).
//! 3. **Peripherals:** Opaque nodes that bring their own pre-built memory map and addressing.
//!
//! Nodes can only reference children already in the arena, so the tree is acyclic by
//! construction. The same node may be mounted under several parents.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::common::addr::{Literal, parse_literal};
use crate::common::constants::FOOTPRINT_REGION;
use crate::common::error::{MapError, Result};
use crate::csr::{FieldId, RegisterField};
use crate::driver::DriverMethod;
use crate::map::MemoryMap;

/// JSON design descriptions.
pub mod desc;

/// Stable arena index of a component node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// How a child's memory map is mounted into its parent's.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildMode {
    /// A named subrange.
    #[default]
    Nested,
    /// An unnamed subrange whose names merge into the parent.
    Inline,
    /// Visited by discovery but not placed.
    Ignore,
}

/// A named edge from a parent to a child node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildLink {
    /// Name of the child inside the parent.
    pub name: String,
    /// The child node.
    pub node: NodeId,
    /// How the child's map is mounted.
    pub mode: ChildMode,
}

/// How a peripheral's base address is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Addressing {
    /// Allocated like any other child.
    #[default]
    Auto,
    /// Pinned at an absolute base; consumes no space in the parent.
    Explicit(u64),
}

impl<'de> Deserialize<'de> for Addressing {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Option::<Literal>::deserialize(deserializer)? {
            None => Ok(Self::Auto),
            Some(Literal::Int(base)) => Ok(Self::Explicit(base)),
            Some(Literal::Text(text)) if text.trim().eq_ignore_ascii_case("auto") => Ok(Self::Auto),
            Some(Literal::Text(text)) => parse_literal(&text)
                .map(Self::Explicit)
                .map_err(de::Error::custom),
        }
    }
}

/// A component that brings its own memory map.
#[derive(Clone, Debug)]
pub struct Peripheral {
    label: String,
    map: MemoryMap,
    addressing: Addressing,
}

impl Peripheral {
    /// Creates an auto-addressed peripheral around a pre-built map.
    pub fn new(label: impl Into<String>, map: MemoryMap) -> Self {
        Self {
            label: label.into(),
            map,
            addressing: Addressing::Auto,
        }
    }

    /// Creates a peripheral whose map is one opaque region of `bytes`.
    pub fn with_footprint(label: impl Into<String>, bytes: u64) -> Result<Self> {
        Ok(Self::new(label, MemoryMap::with_region(FOOTPRINT_REGION, bytes)?))
    }

    /// Pins the peripheral at an absolute base.
    #[must_use]
    pub const fn at(mut self, base: u64) -> Self {
        self.addressing = Addressing::Explicit(base);
        self
    }

    /// Sets the addressing mode.
    #[must_use]
    pub const fn with_addressing(mut self, addressing: Addressing) -> Self {
        self.addressing = addressing;
        self
    }

    /// Returns the label used for configuration overrides.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the pre-built map.
    pub const fn map(&self) -> &MemoryMap {
        &self.map
    }

    /// Returns the declared addressing.
    pub const fn addressing(&self) -> Addressing {
        self.addressing
    }
}

/// One node of the component tree.
#[derive(Clone, Debug)]
pub struct ComponentNode {
    name: String,
    fields: Vec<(String, FieldId)>,
    driven: Vec<(String, FieldId)>,
    methods: Vec<DriverMethod>,
    children: Vec<ChildLink>,
    peripheral: Option<Peripheral>,
}

impl ComponentNode {
    /// Creates a node with no fields or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            driven: Vec::new(),
            methods: Vec::new(),
            children: Vec::new(),
            peripheral: None,
        }
    }

    /// Declares a field under a local name.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, field: FieldId) -> Self {
        self.fields.push((name.into(), field));
        self
    }

    /// Records a field found structurally driven by this node.
    #[must_use]
    pub fn with_driven(mut self, name: impl Into<String>, field: FieldId) -> Self {
        self.driven.push((name.into(), field));
        self
    }

    /// Declares a driver method.
    #[must_use]
    pub fn with_method(mut self, method: DriverMethod) -> Self {
        self.methods.push(method);
        self
    }

    /// Mounts a child node.
    #[must_use]
    pub fn with_child(mut self, name: impl Into<String>, node: NodeId, mode: ChildMode) -> Self {
        self.children.push(ChildLink {
            name: name.into(),
            node,
            mode,
        });
        self
    }

    /// Turns the node into an opaque peripheral.
    #[must_use]
    pub fn as_peripheral(mut self, peripheral: Peripheral) -> Self {
        self.peripheral = Some(peripheral);
        self
    }

    /// Returns the node's type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared fields.
    pub fn fields(&self) -> &[(String, FieldId)] {
        &self.fields
    }

    /// Returns the structurally driven fields.
    pub fn driven(&self) -> &[(String, FieldId)] {
        &self.driven
    }

    /// Returns the driver methods.
    pub fn methods(&self) -> &[DriverMethod] {
        &self.methods
    }

    /// Returns the child links in declaration order.
    pub fn children(&self) -> &[ChildLink] {
        &self.children
    }

    /// Returns the peripheral description, if the node is one.
    pub const fn peripheral(&self) -> Option<&Peripheral> {
        self.peripheral.as_ref()
    }
}

/// Arena of register fields and component nodes.
#[derive(Clone, Debug, Default)]
pub struct Design {
    fields: Vec<RegisterField>,
    nodes: Vec<ComponentNode>,
}

impl Design {
    /// Creates an empty design.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field and returns its identity.
    pub fn add_field(&mut self, field: RegisterField) -> FieldId {
        self.fields.push(field);
        FieldId(self.fields.len() - 1)
    }

    /// Adds a node.
    ///
    /// # Returns
    ///
    /// `InvalidDesign` if the node references a field or child that is not in the arena yet.
    pub fn add_node(&mut self, node: ComponentNode) -> Result<NodeId> {
        if let Some((name, id)) = node
            .fields
            .iter()
            .chain(&node.driven)
            .find(|(_, id)| id.0 >= self.fields.len())
        {
            return Err(MapError::invalid_design(format!(
                "`{}` references unknown field {} as `{name}`",
                node.name, id.0
            )));
        }
        if let Some(link) = node.children.iter().find(|c| c.node.0 >= self.nodes.len()) {
            return Err(MapError::invalid_design(format!(
                "`{}` mounts unknown node {} as `{}`",
                node.name, link.node.0, link.name
            )));
        }
        self.nodes.push(node);
        Ok(NodeId(self.nodes.len() - 1))
    }

    /// Looks up a field.
    pub fn field(&self, id: FieldId) -> Option<&RegisterField> {
        self.fields.get(id.0)
    }

    /// Looks up a node.
    pub fn node(&self, id: NodeId) -> Option<&ComponentNode> {
        self.nodes.get(id.0)
    }

    /// Looks up a field, failing with `InvalidDesign`.
    pub fn field_checked(&self, id: FieldId) -> Result<&RegisterField> {
        self.field(id)
            .ok_or_else(|| MapError::invalid_design(format!("unknown field {}", id.0)))
    }

    /// Looks up a node, failing with `InvalidDesign`.
    pub fn node_checked(&self, id: NodeId) -> Result<&ComponentNode> {
        self.node(id)
            .ok_or_else(|| MapError::invalid_design(format!("unknown node {}", id.0)))
    }

    /// Iterates over every field with its identity.
    pub fn fields(&self) -> impl Iterator<Item = (FieldId, &RegisterField)> {
        self.fields.iter().enumerate().map(|(i, f)| (FieldId(i), f))
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
