//! Keccak helpers
//!
//! Domain-separated keccak256 hashing plus hash-to-field derivation. The
//! circuits use [`derive_field_elements`] to expand a domain tag into
//! nothing-up-my-sleeve round constants.

use crate::m31::{M31, M31_PRIME};
use sha3::{Digest, Keccak256};

/// A 32-byte hash output
pub type Hash32 = [u8; 32];

/// Hash the concatenation of all inputs with keccak256.
pub fn keccak_hash(inputs: &[&[u8]]) -> Hash32 {
    let mut hasher = Keccak256::new();
    for input in inputs {
        hasher.update(input);
    }
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Map the first 4 bytes of a hash (little-endian) into M31.
///
/// The top bit is masked off before reduction, which keeps the bias
/// to a single value (`p` maps to zero).
#[inline]
pub fn hash_to_m31(hash: &Hash32) -> M31 {
    let val = u32::from_le_bytes([hash[0], hash[1], hash[2], hash[3]]) & M31_PRIME;
    M31::new(val)
}

/// Deterministically expand `domain` into `count` field elements.
///
/// Element `i` is `hash_to_m31(keccak(domain || i_le))`.
pub fn derive_field_elements(domain: &[u8], count: usize) -> Vec<M31> {
    (0..count as u64)
        .map(|i| hash_to_m31(&keccak_hash(&[domain, &i.to_le_bytes()])))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_hash() {
        let hash = keccak_hash(&[b"test"]);
        assert_ne!(hash, [0u8; 32]);
        // Concatenation semantics
        assert_eq!(keccak_hash(&[b"hello", b"world"]), keccak_hash(&[b"helloworld"]));
    }

    #[test]
    fn test_hash_to_m31_canonical() {
        let m = hash_to_m31(&[0xff; 32]);
        assert!(m.value() < M31_PRIME);
    }

    #[test]
    fn test_derive_field_elements() {
        let a = derive_field_elements(b"domain-a", 16);
        let b = derive_field_elements(b"domain-a", 16);
        let c = derive_field_elements(b"domain-b", 16);

        assert_eq!(a.len(), 16);
        assert_eq!(a, b);
        assert_ne!(a, c);
        // Prefix stability: a longer expansion extends a shorter one
        assert_eq!(&derive_field_elements(b"domain-a", 32)[..16], &a[..]);
    }
}
