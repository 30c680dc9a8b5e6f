//! SoC register-map composition library.
//!
//! This crate turns a hierarchical tree of hardware components into one flat, conflict-free
//! register map. It provides the following:
//! 1. **Design:** An arena of register fields and component nodes produced by elaboration.
//! 2. **Registers:** Control/Status/Event classification and synthesized register banks.
//! 3. **Memory maps:** Ordered namespaces of registers, subranges, aliases, and driver methods.
//! 4. **Passes:** Discovery, address assignment, overlap checking, and driver-method export,
//!    run in order by an explicit [`Pipeline`].
//!
//! ```
//! use socmap_core::config::PlatformConfig;
//! use socmap_core::csr::RegisterField;
//! use socmap_core::design::{ChildMode, ComponentNode, Design};
//!
//! let mut design = Design::new();
//! let gain = design.add_field(RegisterField::control("gain", 8));
//! let amp = design.add_node(ComponentNode::new("Amp").with_field("gain", gain)).unwrap();
//! let top = design
//!     .add_node(ComponentNode::new("Top").with_child("amp", amp, ChildMode::Nested))
//!     .unwrap();
//!
//! let output = socmap_core::build(&design, top, &PlatformConfig::with_base(0x4000_0000)).unwrap();
//! assert_eq!(output.flat.resolve("amp.gain").map(|a| a.address), Some(0x4000_0000));
//! ```

/// Common types and constants (addresses, ranges, errors).
pub mod common;
/// Platform configuration consumed at the root of a build.
pub mod config;
/// Register classification and synthesized register banks.
pub mod csr;
/// Component tree consumed from elaboration (fields, nodes, peripherals).
pub mod design;
/// Host-callable driver methods exported through the memory map.
pub mod driver;
/// Memory maps, placement, and flattening.
pub mod map;
/// Build passes and the pipeline that runs them.
pub mod pass;

/// Root configuration type; use `PlatformConfig::with_base` or deserialize from JSON.
pub use crate::config::PlatformConfig;
/// Error taxonomy shared by every pass.
pub use crate::common::error::{MapError, Result};
/// The standard pipeline and its artifact.
pub use crate::pass::{BuildOutput, Pipeline};

/// Runs the standard pipeline over `design` rooted at `root`.
///
/// # Arguments
///
/// * `design` - The elaborated component tree.
/// * `root` - The top node; its map becomes the top memory map.
/// * `config` - Platform configuration (base address is required).
///
/// # Returns
///
/// The placed map, its flattened form, the driver-method table, and the synthesized banks.
pub fn build(
    design: &design::Design,
    root: design::NodeId,
    config: &PlatformConfig,
) -> Result<BuildOutput> {
    Pipeline::standard().run(design, root, config)
}
