//! # Memory Map Tests
//!
//! Word-aligned allocation, merged namespaces, and placement collection.

use pretty_assertions::assert_eq;
use socmap_core::MapError;
use socmap_core::common::{Address, AddressRange};
use socmap_core::csr::FieldId;
use socmap_core::driver::DriverMethod;
use socmap_core::map::{EntryKind, MemoryMap, Placement};

#[test]
fn test_allocate_is_word_aligned() {
    let mut map = MemoryMap::new();
    assert_eq!(map.allocate("a", 8, None).unwrap(), Address::bits(0, 8));
    assert_eq!(map.allocate("b", 1, None).unwrap(), Address::bits(4, 1));
    assert_eq!(map.byte_len(), 8);
}

#[test]
fn test_subranges_follow_the_cursor() {
    let mut map = MemoryMap::new();
    let _ = map.allocate("ctl", 8, None).unwrap();
    let first = MemoryMap::with_region("regs", 0x10).unwrap();
    let second = MemoryMap::with_region("regs", 0x20).unwrap();
    assert_eq!(map.allocate_subrange(first, Some("x")).unwrap(), 0x4);
    assert_eq!(map.allocate_subrange(second, Some("y")).unwrap(), 0x14);
    assert_eq!(map.byte_len(), 0x34);
}

#[test]
fn test_empty_subrange_takes_no_space() {
    let mut map = MemoryMap::new();
    assert_eq!(map.allocate_subrange(MemoryMap::new(), Some("z")).unwrap(), 0);
    assert_eq!(
        map.allocate_subrange(MemoryMap::with_region("regs", 0x10).unwrap(), Some("x"))
            .unwrap(),
        0
    );
    assert_eq!(map.byte_len(), 0x10);
}

#[test]
fn test_duplicate_names_rejected() {
    let mut map = MemoryMap::new();
    let _ = map.allocate("gain", 8, None).unwrap();
    assert_eq!(
        map.add_alias("gain", FieldId(0)),
        Err(MapError::duplicate("gain"))
    );
    assert_eq!(
        map.allocate_subrange(MemoryMap::new(), Some("gain")),
        Err(MapError::duplicate("gain"))
    );
}

#[test]
fn test_duplicate_driver_methods_rejected() {
    let mut map = MemoryMap::new();
    map.add_driver_method(DriverMethod::declared("reset")).unwrap();
    assert_eq!(
        map.add_driver_method(DriverMethod::declared("reset")),
        Err(MapError::DuplicateDriverMethodName {
            name: "reset".into()
        })
    );
}

#[test]
fn test_method_clashing_with_register_is_namespace_error() {
    let mut map = MemoryMap::new();
    let _ = map.allocate("reset", 1, None).unwrap();
    assert_eq!(
        map.add_driver_method(DriverMethod::declared("reset")),
        Err(MapError::duplicate("reset"))
    );
}

#[test]
fn test_inlined_methods_clash_with_parent_methods() {
    let mut inner = MemoryMap::new();
    inner.add_driver_method(DriverMethod::declared("reset")).unwrap();
    let mut outer = MemoryMap::new();
    outer.add_driver_method(DriverMethod::declared("reset")).unwrap();
    assert_eq!(
        outer.allocate_subrange(inner, None),
        Err(MapError::DuplicateDriverMethodName {
            name: "reset".into()
        })
    );
}

#[test]
fn test_inlined_subrange_is_marked() {
    let mut outer = MemoryMap::new();
    let _ = outer
        .allocate_subrange(MemoryMap::with_region("regs", 4).unwrap(), None)
        .unwrap();
    match outer.entries()[0].kind() {
        EntryKind::Subrange { map, .. } => assert!(map.was_inlined()),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(outer.entries()[0].name(), None);
    assert_eq!(outer.names(), vec!["regs"]);
}

#[test]
fn test_is_empty_is_recursive() {
    let mut outer = MemoryMap::new();
    outer.add_alias("a", FieldId(0)).unwrap();
    let _ = outer.allocate_subrange(MemoryMap::new(), Some("sub")).unwrap();
    assert!(outer.is_empty());

    let _ = outer
        .allocate_subrange(MemoryMap::with_region("regs", 4).unwrap(), Some("full"))
        .unwrap();
    assert!(!outer.is_empty());
}

#[test]
fn test_driver_method_makes_map_non_empty() {
    let mut methods = MemoryMap::labelled("ctl");
    methods.add_driver_method(DriverMethod::declared("reset")).unwrap();
    assert!(!methods.is_empty());
    assert_eq!(methods.byte_len(), 0);

    let mut outer = MemoryMap::new();
    let _ = outer.allocate_subrange(methods, Some("ctl")).unwrap();
    assert!(!outer.is_empty());

    outer.place(0x1000);
    let placements = outer.placements().unwrap();
    assert!(!placements[0].is_empty);
    assert!(placements[0].range.is_empty());
}

#[test]
fn test_zero_byte_region_is_empty() {
    let map = MemoryMap::with_region("regs", 0).unwrap();
    assert!(map.is_empty());
    assert_eq!(map.byte_len(), 0);
}

#[test]
fn test_placements_use_absolute_ranges() {
    let mut uart = MemoryMap::with_region("regs", 0x10).unwrap();
    uart.set_label("uart");
    let mut spi = MemoryMap::with_region("regs", 0x20).unwrap();
    spi.set_label("spi");
    spi.place(0x9000);

    let mut top = MemoryMap::new();
    let _ = top.allocate("ctl", 32, None).unwrap();
    let _ = top.allocate_subrange(uart, Some("uart")).unwrap();
    let _ = top.allocate_subrange(spi, Some("spi")).unwrap();
    top.set_top();
    top.place(0x1000);

    assert!(top.is_top());
    assert_eq!(
        top.placements().unwrap(),
        vec![
            Placement {
                label: "uart".into(),
                range: AddressRange::new(0x1004, 0x1014),
                is_empty: false,
                was_inlined: false,
            },
            Placement {
                label: "spi".into(),
                range: AddressRange::new(0x9000, 0x9020),
                is_empty: false,
                was_inlined: false,
            },
        ]
    );
}

#[test]
fn test_oversized_region_is_rejected() {
    assert_eq!(
        MemoryMap::with_region("regs", u64::MAX / 4).unwrap_err(),
        MapError::overflow("regs", 0, u64::MAX / 4)
    );
    let mut map = MemoryMap::new();
    assert!(matches!(
        map.reserve("huge", u64::MAX),
        Err(MapError::AddressOverflow { .. })
    ));
    assert!(matches!(
        map.add_register("far", Address::bits(u64::MAX - 1, 32), None),
        Err(MapError::AddressOverflow { .. })
    ));
    assert!(map.entries().is_empty());
}

#[test]
fn test_placement_past_top_of_address_space() {
    let mut dev = MemoryMap::with_region("regs", 0x20).unwrap();
    dev.set_label("dev");
    dev.place(0xFFFF_FFFF_FFFF_FFF0);
    let mut top = MemoryMap::new();
    let _ = top.allocate_subrange(dev, Some("dev")).unwrap();

    assert_eq!(
        top.placements().unwrap_err(),
        MapError::overflow("dev", 0xFFFF_FFFF_FFFF_FFF0, 0x20)
    );
}
