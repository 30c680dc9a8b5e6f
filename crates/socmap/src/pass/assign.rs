//! Address assignment.
//!
//! Composes the instance tree bottom up into one placed memory map. Children are allocated in
//! declaration order at word-aligned offsets; peripherals contribute a copy of their own map
//! and are either auto-allocated or pinned at an absolute base.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::context::{BuildContext, Instance};
use crate::common::error::{MapError, Result};
use crate::config::PlatformConfig;
use crate::design::{Addressing, ChildMode, Design, NodeId};
use crate::map::{EntryKind, MemoryMap};

/// Builds the placed top map from the instance tree.
pub fn assign(ctx: &mut BuildContext<'_>) -> Result<()> {
    let base = ctx
        .config
        .base_address
        .ok_or(MapError::MissingBaseAddress)?;
    let root = ctx.instances.as_ref().ok_or(MapError::PassOrder {
        pass: "assign",
        missing: "instance tree",
    })?;

    let mut placed = HashSet::new();
    let mut map = compose(ctx.design, ctx.config, root, &mut placed)?;
    map.set_top();
    map.place(base);

    debug!(
        base = format_args!("{base:#x}"),
        bytes = map.byte_len(),
        peripherals = placed.len(),
        "assigned addresses"
    );
    ctx.map = Some(map);
    Ok(())
}

fn compose(
    design: &Design,
    config: &PlatformConfig,
    instance: &Instance,
    placed: &mut HashSet<NodeId>,
) -> Result<MemoryMap> {
    if instance.peripheral {
        return peripheral_map(design, config, instance, placed);
    }

    let mut map = instance.local.clone();
    for child in &instance.children {
        let name = match child.mode {
            ChildMode::Ignore => continue,
            ChildMode::Nested => Some(child.name.as_str()),
            ChildMode::Inline => None,
        };
        let sub = compose(design, config, &child.instance, placed)?;
        let offset = map.allocate_subrange(sub, name)?;
        debug!(path = %child.instance.path, offset = format_args!("{offset:#x}"), "placed child");
    }
    Ok(map)
}

fn peripheral_map(
    design: &Design,
    config: &PlatformConfig,
    instance: &Instance,
    placed: &mut HashSet<NodeId>,
) -> Result<MemoryMap> {
    let id = instance
        .node
        .ok_or_else(|| MapError::invalid_design(format!("`{}` has no node", instance.path)))?;
    let node = design.node_checked(id)?;
    let Some(peripheral) = node.peripheral() else {
        return Err(MapError::invalid_design(format!(
            "`{}` is not a peripheral",
            instance.path
        )));
    };

    if !placed.insert(id) {
        warn!(
            path = %instance.path,
            peripheral = %peripheral.label(),
            "peripheral is already placed through another path; mounting an empty map"
        );
        return Ok(MemoryMap::labelled(instance.path.clone()));
    }

    let mut map = peripheral.map().clone();
    map.set_label(instance.path.clone());
    for entry in instance.local.entries() {
        if let EntryKind::DriverMethod(method) = entry.kind() {
            map.add_driver_method(method.clone())?;
        }
    }

    let addressing = config
        .addressing_for(peripheral.label())
        .unwrap_or_else(|| peripheral.addressing());
    if let Addressing::Explicit(base) = addressing {
        map.place(base);
    }
    debug!(
        path = %instance.path,
        bytes = map.byte_len(),
        pinned = ?map.place_at(),
        "composed peripheral"
    );
    Ok(map)
}
