//! # Address Assignment Tests
//!
//! Bottom-up composition, peripheral addressing, and namespace rules.

use pretty_assertions::assert_eq;
use socmap_core::MapError;
use socmap_core::common::{Address, AddressRange};
use socmap_core::config::PlatformConfig;
use socmap_core::csr::RegisterField;
use socmap_core::design::{Addressing, ChildMode, ComponentNode, Design, Peripheral};
use socmap_core::driver::DriverMethod;
use socmap_core::pass::BuildContext;
use socmap_core::pass::assign::assign;

use crate::common::harness::{build_at, build_with, peripherals_design};

fn range_of(output: &socmap_core::BuildOutput, label: &str) -> AddressRange {
    output
        .placements
        .iter()
        .find(|p| p.label == label)
        .map(|p| p.range)
        .unwrap()
}

#[test]
fn test_peripherals_follow_each_other() {
    let (design, root) = peripherals_design(&[("x", 0x10, None), ("y", 0x20, None)]);
    let output = build_at(&design, root, 0x1000).unwrap();

    assert_eq!(range_of(&output, "x"), AddressRange::new(0x1000, 0x1010));
    assert_eq!(range_of(&output, "y"), AddressRange::new(0x1010, 0x1030));
    assert!(output.map.is_top());
    assert_eq!(output.map.place_at(), Some(0x1000));
    assert_eq!(output.map.byte_len(), 0x30);
}

#[test]
fn test_zero_footprint_is_neutral() {
    let (design, root) =
        peripherals_design(&[("x", 0x10, None), ("z", 0, None), ("y", 0x20, None)]);
    let output = build_at(&design, root, 0x1000).unwrap();

    assert_eq!(range_of(&output, "x"), AddressRange::new(0x1000, 0x1010));
    assert_eq!(range_of(&output, "y"), AddressRange::new(0x1010, 0x1030));
    assert!(range_of(&output, "z").is_empty());
}

#[test]
fn test_explicit_peripheral_takes_no_space() {
    let (design, root) = peripherals_design(&[
        ("x", 0x10, None),
        ("pinned", 0x100, Some(0x8000)),
        ("y", 0x20, None),
    ]);
    let output = build_at(&design, root, 0x1000).unwrap();

    assert_eq!(range_of(&output, "pinned"), AddressRange::new(0x8000, 0x8100));
    assert_eq!(range_of(&output, "y"), AddressRange::new(0x1010, 0x1030));
}

#[test]
fn test_config_overrides_peripheral_addressing() {
    let (design, root) = peripherals_design(&[("x", 0x10, None), ("y", 0x20, Some(0x8000))]);
    let config = PlatformConfig::with_base(0x1000)
        .with_peripheral("x", Addressing::Explicit(0x9000))
        .with_peripheral("y", Addressing::Auto);
    let output = build_with(&design, root, &config).unwrap();

    assert_eq!(range_of(&output, "x"), AddressRange::new(0x9000, 0x9010));
    assert_eq!(range_of(&output, "y"), AddressRange::new(0x1000, 0x1020));
}

#[test]
fn test_bank_comes_before_children() {
    let mut design = Design::new();
    let ctl = design.add_field(RegisterField::control("ctl", 8));
    let regs = Peripheral::with_footprint("dev", 0x10).unwrap();
    let dev = design
        .add_node(ComponentNode::new("Dev").as_peripheral(regs))
        .unwrap();
    let top = design
        .add_node(
            ComponentNode::new("Top")
                .with_field("ctl", ctl)
                .with_child("dev", dev, ChildMode::Nested),
        )
        .unwrap();

    let output = build_at(&design, top, 0x1000).unwrap();
    assert_eq!(output.flat.resolve("ctl"), Some(Address::bits(0x1000, 8)));
    assert_eq!(output.flat.resolve("dev.regs"), Some(Address::bits(0x1004, 0x80)));
}

#[test]
fn test_inline_child_merges_names() {
    let mut design = Design::new();
    let en = design.add_field(RegisterField::control("enable", 1));
    let inner = design
        .add_node(ComponentNode::new("Inner").with_field("enable", en))
        .unwrap();
    let top = design
        .add_node(ComponentNode::new("Top").with_child("inner", inner, ChildMode::Inline))
        .unwrap();

    let output = build_at(&design, top, 0x100).unwrap();
    assert_eq!(output.flat.resolve("enable"), Some(Address::bits(0x100, 1)));
    assert!(output.flat.get("inner.enable").is_none());
}

#[test]
fn test_field_and_child_name_collision() {
    let mut design = Design::new();
    let foo = design.add_field(RegisterField::control("foo", 1));
    let leaf = design.add_node(ComponentNode::new("Leaf")).unwrap();
    let top = design
        .add_node(
            ComponentNode::new("Top")
                .with_field("foo", foo)
                .with_child("foo", leaf, ChildMode::Nested),
        )
        .unwrap();
    assert_eq!(
        build_at(&design, top, 0).unwrap_err(),
        MapError::duplicate("foo")
    );
}

#[test]
fn test_inline_driver_method_collision() {
    let mut design = Design::new();
    let inner = design
        .add_node(ComponentNode::new("Inner").with_method(DriverMethod::declared("reset")))
        .unwrap();
    let top = design
        .add_node(
            ComponentNode::new("Top")
                .with_method(DriverMethod::declared("reset"))
                .with_child("inner", inner, ChildMode::Inline),
        )
        .unwrap();
    assert_eq!(
        build_at(&design, top, 0).unwrap_err(),
        MapError::DuplicateDriverMethodName {
            name: "reset".into()
        }
    );
}

#[test]
fn test_peripheral_reached_twice_is_placed_once() {
    let mut design = Design::new();
    let uart = design
        .add_node(
            ComponentNode::new("Uart")
                .with_method(DriverMethod::declared("flush"))
                .as_peripheral(Peripheral::with_footprint("uart", 0x10).unwrap()),
        )
        .unwrap();
    let top = design
        .add_node(
            ComponentNode::new("Top")
                .with_child("a", uart, ChildMode::Nested)
                .with_child("b", uart, ChildMode::Nested),
        )
        .unwrap();

    let output = build_at(&design, top, 0x1000).unwrap();
    assert_eq!(range_of(&output, "a"), AddressRange::new(0x1000, 0x1010));
    assert!(range_of(&output, "b").is_empty());
    assert!(output.flat.get("b.regs").is_none());
    let methods: Vec<&str> = output.driver_methods.keys().map(String::as_str).collect();
    assert_eq!(methods, vec!["a.flush"]);
}

#[test]
fn test_missing_base_address() {
    let (design, root) = peripherals_design(&[("x", 0x10, None)]);
    assert_eq!(
        build_with(&design, root, &PlatformConfig::default()).unwrap_err(),
        MapError::MissingBaseAddress
    );
}

#[test]
fn test_base_is_checked_before_prerequisites() {
    let (design, root) = peripherals_design(&[]);
    let config = PlatformConfig::default();
    let mut ctx = BuildContext::new(&design, root, &config);
    assert_eq!(assign(&mut ctx), Err(MapError::MissingBaseAddress));
}

#[test]
fn test_assign_needs_discovery() {
    let (design, root) = peripherals_design(&[]);
    let config = PlatformConfig::with_base(0);
    let mut ctx = BuildContext::new(&design, root, &config);
    assert_eq!(
        assign(&mut ctx),
        Err(MapError::PassOrder {
            pass: "assign",
            missing: "instance tree"
        })
    );
}
