//! # Address Tests
//!
//! Tests for bit-granular addresses, declared placements, and byte ranges.

use rstest::rstest;
use socmap_core::common::addr::parse_literal;
use socmap_core::common::{Address, AddressRange, AddressSpec};

#[test]
fn test_address_bit_positions() {
    let addr = Address::new(0x10, 3, 12);
    assert_eq!(addr.start_bit(), 0x83);
    assert_eq!(addr.end_bit(), 0x8F);
    assert_eq!(addr.byte_end(), 0x12);
}

#[test]
fn test_address_translate_keeps_bits() {
    let addr = Address::new(0x4, 2, 6).checked_translate(0x1000).unwrap();
    assert_eq!(addr, Address::new(0x1004, 2, 6));
}

#[test]
fn test_address_display() {
    assert_eq!(
        Address::bits(0x1000, 8).to_string(),
        "0x00001000.0 (8 bits)"
    );
}

#[test]
fn test_address_overlap_is_bit_granular() {
    let low = Address::new(0, 0, 4);
    let high = Address::new(0, 4, 4);
    assert!(!low.overlaps(&high));
    assert!(low.overlaps(&Address::new(0, 3, 2)));
}

#[rstest]
#[case("", AddressSpec::Unset)]
#[case("auto", AddressSpec::Unset)]
#[case("unset", AddressSpec::Unset)]
#[case("16", AddressSpec::Offset(16))]
#[case("0x20", AddressSpec::Offset(0x20))]
fn test_address_spec_from_str(#[case] text: &str, #[case] expected: AddressSpec) {
    assert_eq!(text.parse::<AddressSpec>().unwrap(), expected);
}

#[test]
fn test_address_spec_from_str_rejects_garbage() {
    assert!("0xnope".parse::<AddressSpec>().is_err());
}

#[test]
fn test_address_spec_conversions() {
    assert_eq!(AddressSpec::parse(None::<u64>), AddressSpec::Unset);
    assert_eq!(AddressSpec::parse(8u64), AddressSpec::Offset(8));
    let exact = Address::new(4, 1, 3);
    assert_eq!(AddressSpec::parse(exact), AddressSpec::Exact(exact));
    assert_eq!(AddressSpec::parse(Some(exact)), AddressSpec::Exact(exact));
}

#[test]
fn test_address_spec_resolve() {
    assert_eq!(AddressSpec::Unset.resolve(8), None);
    assert_eq!(AddressSpec::Offset(4).resolve(8), Some(Address::bits(4, 8)));
    let exact = Address::new(4, 1, 3);
    assert_eq!(AddressSpec::Exact(exact).resolve(8), Some(exact));
    assert_eq!(AddressSpec::Exact(exact).bit_len(), Some(3));
    assert!(!AddressSpec::Unset.is_explicit());
    assert!(AddressSpec::Offset(0).is_explicit());
}

#[rstest]
#[case("null", AddressSpec::Unset)]
#[case("12", AddressSpec::Offset(12))]
#[case("\"0x0c\"", AddressSpec::Offset(12))]
#[case("\"auto\"", AddressSpec::Unset)]
#[case(
    r#"{"address": 4, "bit_len": 8}"#,
    AddressSpec::Exact(Address::new(4, 0, 8))
)]
#[case(
    r#"{"address": 4, "bit_offset": 2, "bit_len": 3}"#,
    AddressSpec::Exact(Address::new(4, 2, 3))
)]
fn test_address_spec_deserialize(#[case] json: &str, #[case] expected: AddressSpec) {
    let spec: AddressSpec = serde_json::from_str(json).unwrap();
    assert_eq!(spec, expected);
}

#[test]
fn test_parse_literal_underscores() {
    assert_eq!(parse_literal("0x4000_0000").unwrap(), 0x4000_0000);
    assert_eq!(parse_literal(" 1_024 ").unwrap(), 1024);
}

#[rstest]
#[case((0x0, 0x10), (0x10, 0x20), false)]
#[case((0x0, 0x11), (0x10, 0x20), true)]
#[case((0x10, 0x20), (0x0, 0x100), true)]
#[case((0x10, 0x10), (0x0, 0x100), false)]
#[case((0x2000, 0x2020), (0x2000, 0x2020), true)]
fn test_range_overlap(#[case] a: (u64, u64), #[case] b: (u64, u64), #[case] expected: bool) {
    let a = AddressRange::new(a.0, a.1);
    let b = AddressRange::new(b.0, b.1);
    assert_eq!(a.overlaps(&b), expected);
    assert_eq!(b.overlaps(&a), expected);
}

#[test]
fn test_range_len_and_display() {
    let range = AddressRange::checked_with_len(0x1000, 0x10).unwrap();
    assert_eq!(range.len(), 0x10);
    assert!(!range.is_empty());
    assert_eq!(range.to_string(), "[0x1000, 0x1010)");
}

#[test]
fn test_checked_arithmetic_at_top_of_address_space() {
    assert_eq!(AddressRange::checked_with_len(u64::MAX - 0xF, 0x20), None);
    assert_eq!(
        AddressRange::checked_with_len(u64::MAX - 0xF, 0xF),
        Some(AddressRange::new(u64::MAX - 0xF, u64::MAX))
    );
    assert_eq!(Address::bits(0x10, 8).checked_translate(u64::MAX - 4), None);
    assert_eq!(Address::bits(u64::MAX / 4, 8).checked_end_bit(), None);
    assert_eq!(Address::new(0x10, 3, 12).checked_end_bit(), Some(0x8F));
}
