//! Hash-to-scalar
//!
//! Every hashed component has one canonical byte form:
//! - integers: decimal ASCII
//! - points: `O` or `(x, y)` with decimal coordinates
//! - messages: the raw bytes
//!
//! Components are joined with `||`, hashed with SHA-256 and the digest is
//! read as a big-endian integer reduced modulo the group order.

use crate::elliptic_curve::Point;
use num_bigint::BigUint;
use num_traits::Zero;
use sha2::{Digest, Sha256};

/// Separator placed between encoded components
pub const SEPARATOR: &[u8] = b"||";

/// Canonical byte encoding of a value fed to the hash
pub trait HashEncode {
    fn encode_for_hash(&self) -> Vec<u8>;
}

impl HashEncode for BigUint {
    fn encode_for_hash(&self) -> Vec<u8> {
        self.to_str_radix(10).into_bytes()
    }
}

impl HashEncode for Point {
    fn encode_for_hash(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl HashEncode for [u8] {
    fn encode_for_hash(&self) -> Vec<u8> {
        self.to_vec()
    }
}

impl<const N: usize> HashEncode for [u8; N] {
    fn encode_for_hash(&self) -> Vec<u8> {
        self.to_vec()
    }
}

impl HashEncode for str {
    fn encode_for_hash(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl<T: HashEncode + ?Sized> HashEncode for &T {
    fn encode_for_hash(&self) -> Vec<u8> {
        (**self).encode_for_hash()
    }
}

/// SHA-256 over the separator-joined encodings
pub fn digest(components: &[&dyn HashEncode]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for (i, component) in components.iter().enumerate() {
        if i > 0 {
            hasher.update(SEPARATOR);
        }
        hasher.update(component.encode_for_hash());
    }
    hasher.finalize().into()
}

/// Digest as a big-endian integer modulo `modulus`
///
/// A zero modulus returns the unreduced digest.
pub fn hash_to_scalar(components: &[&dyn HashEncode], modulus: &BigUint) -> BigUint {
    let value = BigUint::from_bytes_be(&digest(components));
    if modulus.is_zero() {
        return value;
    }
    value % modulus
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_encodings() {
        assert_eq!(BigUint::from(30u32).encode_for_hash(), b"30".to_vec());
        assert_eq!(Point::Infinity.encode_for_hash(), b"O".to_vec());
        let p = Point::affine(BigUint::from(3u32), BigUint::from(91u32));
        assert_eq!(p.encode_for_hash(), b"(3, 91)".to_vec());
        let message: &[u8] = b"test";
        assert_eq!(message.encode_for_hash(), b"test".to_vec());
    }

    #[test]
    fn test_digest_matches_joined_input() {
        let r = BigUint::from(30u32);
        let expected: [u8; 32] = Sha256::digest(b"30||test").into();
        assert_eq!(digest(&[&r, b"test"]), expected);
    }

    #[test]
    fn test_hash_to_scalar_is_reduced_and_deterministic() {
        let r = BigUint::from(30u32);
        let q = BigUint::from(7u32);
        let e1 = hash_to_scalar(&[&r, b"test"], &q);
        let e2 = hash_to_scalar(&[&r, b"test"], &q);
        assert_eq!(e1, e2);
        assert!(e1 < q);
    }

    #[test]
    fn test_hash_depends_on_every_component() {
        let n = BigUint::from(1_000_003u32);
        let base = hash_to_scalar(&[&BigUint::from(30u32), b"test"], &n);
        let other_r = hash_to_scalar(&[&BigUint::from(31u32), b"test"], &n);
        let other_msg = hash_to_scalar(&[&BigUint::from(30u32), b"tesu"], &n);
        assert_ne!(base, other_r);
        assert_ne!(base, other_msg);
    }

    #[test]
    fn test_separator_prevents_concatenation_collisions() {
        let a = digest(&[&BigUint::from(1u32), b"23"]);
        let b = digest(&[&BigUint::from(12u32), b"3"]);
        assert_ne!(a, b);
    }
}
