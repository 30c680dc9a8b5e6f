//! Shared state threaded through the build passes.

use std::collections::{BTreeMap, HashSet};

use crate::config::PlatformConfig;
use crate::csr::{FieldId, RegisterBank};
use crate::design::{ChildMode, Design, NodeId};
use crate::driver::DriverMethod;
use crate::map::{FlatMap, MemoryMap, Placement};

/// Set of fields already bound to a register bank during one build.
#[derive(Clone, Debug, Default)]
pub struct DedupRegistry {
    bound: HashSet<FieldId>,
}

impl DedupRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `field` to a bank.
    ///
    /// # Returns
    ///
    /// `true` if the field was new, `false` if it is already implemented elsewhere.
    pub fn bind(&mut self, field: FieldId) -> bool {
        self.bound.insert(field)
    }

    /// Returns `true` if `field` is already bound.
    pub fn contains(&self, field: FieldId) -> bool {
        self.bound.contains(&field)
    }

    /// Returns the number of bound fields.
    pub fn len(&self) -> usize {
        self.bound.len()
    }

    /// Returns `true` if no field is bound.
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }
}

/// A named child of an instance.
#[derive(Debug)]
pub struct InstanceChild {
    /// Name inside the parent.
    pub name: String,
    /// Mount mode.
    pub mode: ChildMode,
    /// The child visit.
    pub instance: Instance,
}

/// One visit of a node during discovery.
///
/// A node reached through two paths yields two instances.
#[derive(Debug)]
pub struct Instance {
    /// The visited node; `None` for an injected register bank.
    pub node: Option<NodeId>,
    /// Dotted path from the root (empty at the root).
    pub path: String,
    /// Registers, aliases, and driver methods contributed by this visit.
    pub local: MemoryMap,
    /// `true` if the node is an opaque peripheral.
    pub peripheral: bool,
    /// Index into [`BuildContext::banks`] of the bank synthesized here.
    pub bank: Option<usize>,
    /// Children in declaration order, injected bank first.
    pub children: Vec<InstanceChild>,
}

impl Instance {
    /// Collects this instance and every descendant, depth first.
    pub fn walk(&self) -> Vec<&Self> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.instance.walk());
        }
        out
    }
}

/// State of one build: inputs plus every annotation produced so far.
#[derive(Debug)]
pub struct BuildContext<'a> {
    /// The component tree.
    pub design: &'a Design,
    /// The top node.
    pub root: NodeId,
    /// Platform configuration.
    pub config: &'a PlatformConfig,
    /// Fields already bound to a bank.
    pub registry: DedupRegistry,
    /// Instance tree built by discovery.
    pub instances: Option<Instance>,
    /// Banks synthesized by discovery.
    pub banks: Vec<RegisterBank>,
    /// Placed top map built by address assignment.
    pub map: Option<MemoryMap>,
    /// Absolute ranges of labelled maps, collected by the overlap check.
    pub placements: Vec<Placement>,
    /// Flattened map built by export.
    pub flat: Option<FlatMap>,
    /// Driver methods by fully-qualified name, built by export.
    pub driver_methods: BTreeMap<String, DriverMethod>,
}

impl<'a> BuildContext<'a> {
    /// Creates a context with no annotations.
    pub fn new(design: &'a Design, root: NodeId, config: &'a PlatformConfig) -> Self {
        Self {
            design,
            root,
            config,
            registry: DedupRegistry::new(),
            instances: None,
            banks: Vec::new(),
            map: None,
            placements: Vec::new(),
            flat: None,
            driver_methods: BTreeMap::new(),
        }
    }
}
