//! Modular arithmetic primitives
//!
//! Exponentiation, multiplication and inversion modulo an arbitrary modulus,
//! Miller-Rabin primality testing, random prime generation, uniform
//! sampling and modular square roots. Everything runs on `num_bigint`
//! integers so that moduli are sized at runtime.
//!
//! Randomness always comes from a `CryptoRng`. The plain functions use the
//! thread-local generator (`rand::rng()`); the `_with` variants take the
//! generator explicitly.

use crate::error::{DssError, Result};
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use std::mem;

/// Primes used for trial division before Miller-Rabin
const SMALL_PRIMES: [u32; 25] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
];

// ============================================================================
// Arithmetic
// ============================================================================

/// `base^exp mod modulus` by square-and-multiply
///
/// # Panics
/// Panics if `modulus` is zero.
pub fn mod_exp(base: &BigUint, exp: &BigUint, modulus: &BigUint) -> BigUint {
    if modulus.is_one() {
        return BigUint::zero();
    }
    base.modpow(exp, modulus)
}

/// `(a * b) mod modulus`
pub fn mod_mul(a: &BigUint, b: &BigUint, modulus: &BigUint) -> BigUint {
    (a * b) % modulus
}

/// Extended Euclidean algorithm
///
/// Returns `(g, s, t)` with `g = gcd(a, b) = a*s + b*t`. The Bezout
/// coefficients may be negative.
pub fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (a.clone(), b.clone());
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());
    let (mut old_t, mut t) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let quotient = &old_r / &r;

        let next_r = &old_r - &quotient * &r;
        old_r = mem::replace(&mut r, next_r);

        let next_s = &old_s - &quotient * &s;
        old_s = mem::replace(&mut s, next_s);

        let next_t = &old_t - &quotient * &t;
        old_t = mem::replace(&mut t, next_t);
    }

    (old_r, old_s, old_t)
}

/// Modular inverse `a^(-1) mod modulus`
///
/// Fails with `NoInverse` when `gcd(a, modulus) != 1`, which includes
/// `a ≡ 0` and a zero modulus.
pub fn mod_inv(a: &BigUint, modulus: &BigUint) -> Result<BigUint> {
    let no_inverse = || DssError::NoInverse {
        value: a.clone(),
        modulus: modulus.clone(),
    };

    if modulus.is_zero() {
        return Err(no_inverse());
    }

    let m = BigInt::from(modulus.clone());
    let reduced = BigInt::from(a % modulus);
    let (gcd, x, _) = extended_gcd(&reduced, &m);
    if !gcd.is_one() {
        return Err(no_inverse());
    }

    x.mod_floor(&m).to_biguint().ok_or_else(no_inverse)
}

// ============================================================================
// Sampling
// ============================================================================

/// Uniform integer in `[low, high)` using rejection sampling
pub fn random_range_with<R: CryptoRng + RngCore + ?Sized>(
    rng: &mut R,
    low: &BigUint,
    high: &BigUint,
) -> Result<BigUint> {
    if low >= high {
        return Err(DssError::InvalidParameter(format!(
            "empty sampling range [{low}, {high})"
        )));
    }

    let span = high - low;
    let bit_len = span.bits() as usize;
    let byte_len = bit_len.div_ceil(8);
    let top_bits = bit_len % 8;
    let top_mask: u8 = if top_bits == 0 {
        0xFF
    } else {
        (1u8 << top_bits) - 1
    };

    let mut bytes = vec![0u8; byte_len];
    loop {
        rng.fill_bytes(&mut bytes);
        if let Some(first) = bytes.first_mut() {
            *first &= top_mask;
        }

        let candidate = BigUint::from_bytes_be(&bytes);
        if candidate < span {
            return Ok(low + candidate);
        }
    }
}

/// Uniform integer in `[low, high)` drawn from the thread-local CSPRNG
pub fn random_range(low: &BigUint, high: &BigUint) -> Result<BigUint> {
    random_range_with(&mut rand::rng(), low, high)
}

/// Random integer with exactly `bits` bits, odd, top bit set
fn random_odd_with_bits<R: CryptoRng + RngCore + ?Sized>(rng: &mut R, bits: usize) -> BigUint {
    let mut bytes = vec![0u8; bits.div_ceil(8)];
    rng.fill_bytes(&mut bytes);

    let excess = bytes.len() * 8 - bits;
    if let Some(first) = bytes.first_mut() {
        *first &= 0xFF >> excess;
    }

    let mut candidate = BigUint::from_bytes_be(&bytes);
    candidate |= BigUint::one() << (bits - 1);
    candidate |= BigUint::one();
    candidate
}

// ============================================================================
// Primality
// ============================================================================

/// Miller-Rabin probabilistic primality test
///
/// Small primes are handled by trial division; larger candidates get
/// `rounds` witnesses drawn uniformly from `[2, n-2]`. A composite passes
/// with probability at most `4^-rounds`.
pub fn is_probable_prime_with<R: CryptoRng + RngCore + ?Sized>(
    rng: &mut R,
    n: &BigUint,
    rounds: usize,
) -> bool {
    if *n < BigUint::from(2u32) {
        return false;
    }
    for &p in SMALL_PRIMES.iter() {
        let p = BigUint::from(p);
        if *n == p {
            return true;
        }
        if (n % &p).is_zero() {
            return false;
        }
    }

    let one = BigUint::one();
    let n_minus_one = n - &one;
    // n - 1 = d * 2^r with d odd
    let r = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> r;
    let two = BigUint::from(2u32);

    'witness: for _ in 0..rounds {
        let a = match random_range_with(rng, &two, &n_minus_one) {
            Ok(a) => a,
            Err(_) => return false,
        };
        let mut x = mod_exp(&a, &d, n);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 1..r {
            x = mod_mul(&x, &x, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Miller-Rabin with witnesses from the thread-local CSPRNG
pub fn is_probable_prime(n: &BigUint, rounds: usize) -> bool {
    is_probable_prime_with(&mut rand::rng(), n, rounds)
}

/// Generates a prime of exactly `bits` bits
///
/// Samples odd candidates with the top bit forced until one passes the
/// primality test. There is no attempt cap: the loop terminates with
/// probability 1.
pub fn generate_prime_with<R: CryptoRng + RngCore + ?Sized>(
    rng: &mut R,
    bits: usize,
    rounds: usize,
) -> Result<BigUint> {
    if bits < 2 {
        return Err(DssError::InvalidParameter(format!(
            "cannot generate a {bits}-bit prime"
        )));
    }

    loop {
        let candidate = random_odd_with_bits(rng, bits);
        if is_probable_prime_with(rng, &candidate, rounds) {
            return Ok(candidate);
        }
    }
}

pub fn generate_prime(bits: usize, rounds: usize) -> Result<BigUint> {
    generate_prime_with(&mut rand::rng(), bits, rounds)
}

// ============================================================================
// Quadratic residues
// ============================================================================

/// Legendre symbol `(a / p)` for an odd prime `p`, via Euler's criterion
pub fn legendre(a: &BigUint, p: &BigUint) -> i8 {
    let a = a % p;
    if a.is_zero() {
        return 0;
    }
    let exp = (p - 1u32) >> 1;
    if mod_exp(&a, &exp, p).is_one() { 1 } else { -1 }
}

/// Square root modulo an odd prime by Tonelli-Shanks
///
/// Returns the smaller of the two roots so the result is canonical, or
/// `None` when `a` is a non-residue.
pub fn sqrt_mod(a: &BigUint, p: &BigUint) -> Option<BigUint> {
    let a = a % p;
    if a.is_zero() {
        return Some(BigUint::zero());
    }
    if *p == BigUint::from(2u32) {
        return Some(a);
    }
    if legendre(&a, p) != 1 {
        return None;
    }

    let p_minus_one = p - 1u32;
    let s = p_minus_one.trailing_zeros().unwrap_or(0);
    let q = &p_minus_one >> s;

    let root = if s == 1 {
        // p ≡ 3 (mod 4)
        mod_exp(&a, &((p + 1u32) >> 2), p)
    } else {
        let mut z = BigUint::from(2u32);
        while legendre(&z, p) != -1 {
            z += 1u32;
        }

        let mut m = s;
        let mut c = mod_exp(&z, &q, p);
        let mut t = mod_exp(&a, &q, p);
        let mut r = mod_exp(&a, &((&q + 1u32) >> 1), p);

        while !t.is_one() {
            // least i with t^(2^i) = 1
            let mut i = 0u64;
            let mut t2 = t.clone();
            while !t2.is_one() {
                t2 = mod_mul(&t2, &t2, p);
                i += 1;
                if i == m {
                    return None;
                }
            }

            let b = mod_exp(&c, &(BigUint::one() << (m - i - 1)), p);
            m = i;
            c = mod_mul(&b, &b, p);
            t = mod_mul(&t, &c, p);
            r = mod_mul(&r, &b, p);
        }
        r
    };

    let other = p - &root;
    Some(root.min(other))
}
