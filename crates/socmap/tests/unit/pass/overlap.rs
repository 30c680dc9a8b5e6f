//! # Overlap Tests
//!
//! Conflicts between independently placed maps, and the no-overlap invariant for auto placement.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use socmap_core::MapError;
use socmap_core::common::AddressRange;
use socmap_core::csr::RegisterField;
use socmap_core::design::{ChildMode, ComponentNode, Design, Peripheral};
use socmap_core::map::Placement;
use socmap_core::pass::overlap::check_ranges;

use crate::common::harness::{build_at, peripherals_design};

fn placement(label: &str, start: u64, stop: u64) -> Placement {
    Placement {
        label: label.into(),
        range: AddressRange::new(start, stop),
        is_empty: start == stop,
        was_inlined: false,
    }
}

#[test]
fn test_explicit_overlap_names_both() {
    let (design, root) = peripherals_design(&[
        ("uart", 0x20, Some(0x2000)),
        ("spi", 0x20, Some(0x2000)),
    ]);
    assert_eq!(
        build_at(&design, root, 0x1000).unwrap_err(),
        MapError::PeripheralRangeConflict {
            first: "uart".into(),
            first_range: AddressRange::new(0x2000, 0x2020),
            second: "spi".into(),
            second_range: AddressRange::new(0x2000, 0x2020),
        }
    );
}

#[test]
fn test_explicit_overlaps_auto_region() {
    let (design, root) = peripherals_design(&[("auto", 0x100, None), ("pinned", 0x10, Some(0x1080))]);
    assert!(matches!(
        build_at(&design, root, 0x1000),
        Err(MapError::PeripheralRangeConflict { .. })
    ));
}

#[test]
fn test_zero_footprint_never_conflicts() {
    let (design, root) = peripherals_design(&[("big", 0x100, Some(0x2000)), ("nothing", 0, Some(0x2010))]);
    let output = build_at(&design, root, 0x1000).unwrap();
    assert_eq!(output.placements.len(), 2);
}

#[test]
fn test_adjacent_ranges_do_not_conflict() {
    let placements = [placement("a", 0x0, 0x10), placement("b", 0x10, 0x20)];
    assert_eq!(check_ranges(&placements), Ok(()));
}

#[test]
fn test_inlined_and_empty_maps_are_skipped() {
    let mut inlined = placement("bank", 0x0, 0x10);
    inlined.was_inlined = true;
    let mut empty = placement("ghost", 0x0, 0x10);
    empty.is_empty = true;
    let placements = [placement("dev", 0x0, 0x10), inlined, empty];
    assert_eq!(check_ranges(&placements), Ok(()));
}

#[test]
fn test_first_conflict_in_order_is_reported() {
    let placements = [
        placement("a", 0x0, 0x10),
        placement("b", 0x20, 0x30),
        placement("c", 0x8, 0x28),
    ];
    match check_ranges(&placements).unwrap_err() {
        MapError::PeripheralRangeConflict { first, second, .. } => {
            assert_eq!((first.as_str(), second.as_str()), ("a", "c"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

proptest! {
    #[test]
    fn prop_auto_placement_never_overlaps(
        footprints in prop::collection::vec(0u64..0x400, 1..12),
        base in (0u64..0x1000).prop_map(|b| b * 4),
    ) {
        let names: Vec<String> = (0..footprints.len()).map(|i| format!("p{i}")).collect();
        let layout: Vec<(&str, u64, Option<u64>)> = names
            .iter()
            .zip(&footprints)
            .map(|(name, bytes)| (name.as_str(), *bytes, None))
            .collect();
        let (design, root) = peripherals_design(&layout);
        let output = build_at(&design, root, base).unwrap();

        let live: Vec<&Placement> = output
            .placements
            .iter()
            .filter(|p| !p.range.is_empty())
            .collect();
        for (i, a) in live.iter().enumerate() {
            prop_assert!(a.range.start >= base);
            for b in &live[i + 1..] {
                prop_assert!(!a.range.overlaps(&b.range), "{} overlaps {}", a.label, b.label);
            }
        }
    }
}

#[test]
fn test_pinned_past_top_of_address_space() {
    let (design, root) = peripherals_design(&[("p", 0x20, Some(0xFFFF_FFFF_FFFF_FFF0))]);
    assert_eq!(
        build_at(&design, root, 0).unwrap_err(),
        MapError::AddressOverflow {
            name: "p".into(),
            start: 0xFFFF_FFFF_FFFF_FFF0,
            len: 0x20,
        }
    );
}

#[test]
fn test_pinned_below_top_of_address_space() {
    let (design, root) = peripherals_design(&[("p", 0x10, Some(0xFFFF_FFFF_FFFF_FFE0))]);
    let output = build_at(&design, root, 0).unwrap();
    assert_eq!(
        output.placements[0].range,
        AddressRange::new(0xFFFF_FFFF_FFFF_FFE0, 0xFFFF_FFFF_FFFF_FFF0)
    );
    assert_eq!(
        output.flat.resolve("p.regs").map(|a| a.address),
        Some(0xFFFF_FFFF_FFFF_FFE0)
    );
}

#[test]
fn test_pinned_peripheral_over_bank_is_not_checked() {
    let mut design = Design::new();
    let ctl = design.add_field(RegisterField::control("ctl", 32));
    let dev = design
        .add_node(
            ComponentNode::new("Dev")
                .as_peripheral(Peripheral::with_footprint("dev", 4).unwrap().at(0x1000)),
        )
        .unwrap();
    let top = design
        .add_node(
            ComponentNode::new("Top")
                .with_field("ctl", ctl)
                .with_child("dev", dev, ChildMode::Nested),
        )
        .unwrap();

    let output = build_at(&design, top, 0x1000).unwrap();
    assert_eq!(output.flat.resolve("ctl").map(|a| a.address), Some(0x1000));
    assert_eq!(output.flat.resolve("dev.regs").map(|a| a.address), Some(0x1000));
}
