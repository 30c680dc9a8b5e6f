//! Peripheral overlap check.

use tracing::debug;

use super::context::BuildContext;
use crate::common::error::{MapError, Result};
use crate::map::Placement;

/// Verifies that no two independently placed maps claim the same bytes.
pub fn check_overlaps(ctx: &mut BuildContext<'_>) -> Result<()> {
    let map = ctx.map.as_ref().ok_or(MapError::PassOrder {
        pass: "overlap",
        missing: "placed map",
    })?;
    let placements = map.placements()?;
    check_ranges(&placements)?;
    ctx.placements = placements;
    Ok(())
}

/// Checks every pair of placements that owns address space.
///
/// Empty maps, inlined maps, and zero-length ranges are skipped. Only labelled maps
/// (peripherals) are placements, so a pinned peripheral that lands on an inlined register bank
/// or on the registers of an ordinary component is not reported.
///
/// # Returns
///
/// `PeripheralRangeConflict` naming the first conflicting pair in placement order.
pub fn check_ranges(placements: &[Placement]) -> Result<()> {
    let live: Vec<&Placement> = placements
        .iter()
        .filter(|p| !p.is_empty && !p.was_inlined && !p.range.is_empty())
        .collect();

    for (i, first) in live.iter().enumerate() {
        for second in &live[i + 1..] {
            if first.range.overlaps(&second.range) {
                return Err(MapError::PeripheralRangeConflict {
                    first: first.label.clone(),
                    first_range: first.range,
                    second: second.label.clone(),
                    second_range: second.range,
                });
            }
        }
    }
    debug!(
        checked = live.len(),
        skipped = placements.len() - live.len(),
        "no overlapping peripherals"
    );
    Ok(())
}
