//! Field-law tests for M31 arithmetic

use proptest::prelude::*;
use zkdeposit_prover::m31::{M31, M31_PRIME};

fn element() -> impl Strategy<Value = M31> {
    (0..M31_PRIME).prop_map(M31::new)
}

#[test]
fn test_field_constants() {
    assert_eq!(M31_PRIME, (1 << 31) - 1);
    assert_eq!(M31::ZERO.value(), 0);
    assert_eq!(M31::ONE.value(), 1);
}

#[test]
fn test_wraparound() {
    let a = M31::new(M31_PRIME - 10);
    assert_eq!((a + M31::new(20)).value(), 10);
    assert_eq!((M31::ZERO - M31::ONE).value(), M31_PRIME - 1);
}

#[test]
fn test_pow() {
    let two = M31::new(2);
    assert_eq!(two.pow(5).value(), 32);
    assert_eq!(two.pow(31), M31::ONE); // 2^31 = p + 1
    assert_eq!(M31::new(12345).pow(0), M31::ONE);
}

#[test]
fn test_from_bool() {
    assert_eq!(M31::from(true), M31::ONE);
    assert_eq!(M31::from(false), M31::ZERO);
}

proptest! {
    #[test]
    fn prop_add_sub_inverse(a in element(), b in element()) {
        prop_assert_eq!(a + b - b, a);
    }

    #[test]
    fn prop_mul_matches_u64_reference(a in element(), b in element()) {
        let expected = (a.value() as u64 * b.value() as u64) % M31_PRIME as u64;
        prop_assert_eq!((a * b).value() as u64, expected);
    }

    #[test]
    fn prop_distributive(a in element(), b in element(), c in element()) {
        prop_assert_eq!(a * (b + c), a * b + a * c);
    }

    #[test]
    fn prop_inverse(a in 1..M31_PRIME) {
        let a = M31::new(a);
        prop_assert_eq!(a * a.inv().unwrap(), M31::ONE);
    }

    #[test]
    fn prop_le_bytes_roundtrip(a in element()) {
        prop_assert_eq!(M31::from_le_bytes(a.to_le_bytes()), a);
    }
}
