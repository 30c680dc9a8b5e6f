//! Driver-method export.

use std::collections::BTreeMap;

use tracing::info;

use super::context::BuildContext;
use crate::common::error::{MapError, Result};
use crate::map::FlatTarget;

/// Flattens the placed map and collects the driver-method table.
pub fn export(ctx: &mut BuildContext<'_>) -> Result<()> {
    let map = ctx.map.as_ref().ok_or(MapError::PassOrder {
        pass: "export",
        missing: "placed map",
    })?;
    let flat = map.flatten()?;

    let mut methods = BTreeMap::new();
    for entry in &flat {
        if let FlatTarget::DriverMethod(method) = &entry.target {
            if methods.insert(entry.name.clone(), method.clone()).is_some() {
                return Err(MapError::DuplicateDriverMethodName {
                    name: entry.name.clone(),
                });
            }
        }
    }

    if ctx.config.log_memorymap {
        info!("memory map:\n{}", flat.listing());
    }
    info!(
        entries = flat.len(),
        driver_methods = methods.len(),
        "exported memory map"
    );
    ctx.flat = Some(flat);
    ctx.driver_methods = methods;
    Ok(())
}
