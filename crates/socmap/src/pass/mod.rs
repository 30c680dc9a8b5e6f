//! Build passes and the pipeline that runs them.
//!
//! A build is a fixed sequence of passes over one [`BuildContext`]:
//! 1. **Discovery:** Binds each register field to one bank and records aliases.
//! 2. **Assignment:** Composes and places the top memory map.
//! 3. **Overlap:** Rejects independently placed maps that share bytes.
//! 4. **Export:** Flattens the map and collects the driver-method table.
//!
//! Extra passes (e.g. artifact generators) can be appended with [`Pipeline::with_pass`]. The
//! first error aborts the build.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::common::error::{MapError, Result};
use crate::config::PlatformConfig;
use crate::csr::RegisterBank;
use crate::design::{Design, NodeId};
use crate::driver::DriverMethod;
use crate::map::{FlatMap, MemoryMap, Placement};

/// Address assignment.
pub mod assign;
/// Shared build state.
pub mod context;
/// Register discovery and bank synthesis.
pub mod discovery;
/// Driver-method export.
pub mod export;
/// Peripheral overlap check.
pub mod overlap;

pub use context::{BuildContext, DedupRegistry, Instance, InstanceChild};

/// Signature of a build pass.
pub type PassFn = fn(&mut BuildContext<'_>) -> Result<()>;

/// Ordered list of named passes.
#[derive(Clone, Default)]
pub struct Pipeline {
    passes: Vec<(&'static str, PassFn)>,
}

impl Pipeline {
    /// Creates a pipeline with no passes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the standard pipeline: discovery, assignment, overlap check, export.
    pub fn standard() -> Self {
        Self::new()
            .with_pass("discovery", discovery::discover)
            .with_pass("assign", assign::assign)
            .with_pass("overlap", overlap::check_overlaps)
            .with_pass("export", export::export)
    }

    /// Appends a pass.
    #[must_use]
    pub fn with_pass(mut self, name: &'static str, pass: PassFn) -> Self {
        self.passes.push((name, pass));
        self
    }

    /// Returns the pass names in run order.
    pub fn names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|(name, _)| *name).collect()
    }

    /// Runs every pass over a fresh context.
    ///
    /// # Returns
    ///
    /// The build artifact, or the first error any pass raised.
    pub fn run(
        &self,
        design: &Design,
        root: NodeId,
        config: &PlatformConfig,
    ) -> Result<BuildOutput> {
        let mut ctx = BuildContext::new(design, root, config);
        for (name, pass) in &self.passes {
            debug!(pass = name, "running pass");
            pass(&mut ctx)?;
        }
        BuildOutput::from_context(ctx)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("passes", &self.names())
            .finish()
    }
}

/// The artifact handed to downstream collaborators.
#[derive(Debug)]
pub struct BuildOutput {
    /// The placed top memory map.
    pub map: MemoryMap,
    /// Fully-qualified view of `map`.
    pub flat: FlatMap,
    /// Driver methods by fully-qualified name.
    pub driver_methods: BTreeMap<String, DriverMethod>,
    /// Register banks in discovery order.
    pub banks: Vec<RegisterBank>,
    /// Absolute ranges of every labelled map.
    pub placements: Vec<Placement>,
}

impl BuildOutput {
    fn from_context(ctx: BuildContext<'_>) -> Result<Self> {
        let map = ctx.map.ok_or(MapError::PassOrder {
            pass: "pipeline",
            missing: "placed map",
        })?;
        let flat = ctx.flat.ok_or(MapError::PassOrder {
            pass: "pipeline",
            missing: "flattened map",
        })?;
        Ok(Self {
            map,
            flat,
            driver_methods: ctx.driver_methods,
            banks: ctx.banks,
            placements: ctx.placements,
        })
    }

    /// Renders the human-readable listing.
    pub fn listing(&self) -> String {
        self.flat.listing()
    }

    /// Serializes the flattened map.
    pub fn to_json(&self) -> serde_json::Result<String> {
        self.flat.to_json()
    }

    /// Looks up a bank by its path.
    pub fn bank(&self, label: &str) -> Option<&RegisterBank> {
        self.banks.iter().find(|bank| bank.label() == label)
    }

    /// Looks up a bank by its path for bus transactions.
    pub fn bank_mut(&mut self, label: &str) -> Option<&mut RegisterBank> {
        self.banks.iter_mut().find(|bank| bank.label() == label)
    }
}
