//! Finite-field system parameters
//!
//! `FieldParams` holds a prime `p` and a prime `q` dividing `p - 1`. The
//! generator picks `q` first and then searches for a cofactor `k` such that
//! `p = k*q + 1` is prime and exactly `bit_length` bits long.

use crate::config::DssConfig;
use crate::error::{DssError, Result};
use crate::modular::{generate_prime_with, is_probable_prime_with, random_range_with};
use log::{debug, info};
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use std::fmt;

/// Rounds used when validating caller-supplied parameters
const VALIDATION_ROUNDS: usize = 40;

/// Prime field order `p` with a prime subgroup order `q | p - 1`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldParams {
    p: BigUint,
    q: BigUint,
    bit_length: usize,
}

impl FieldParams {
    /// Validates caller-supplied parameters
    ///
    /// # Errors
    /// `InvalidParameter` unless both values are prime and `q` divides `p - 1`.
    pub fn new(p: BigUint, q: BigUint) -> Result<Self> {
        let mut rng = rand::rng();
        if !is_probable_prime_with(&mut rng, &p, VALIDATION_ROUNDS) {
            return Err(DssError::InvalidParameter(format!("p = {p} is not prime")));
        }
        if !is_probable_prime_with(&mut rng, &q, VALIDATION_ROUNDS) {
            return Err(DssError::InvalidParameter(format!("q = {q} is not prime")));
        }
        if !(&p - 1u32).is_multiple_of(&q) {
            return Err(DssError::InvalidParameter(format!(
                "q = {q} does not divide p - 1"
            )));
        }

        let bit_length = p.bits() as usize;
        Ok(Self { p, q, bit_length })
    }

    /// Generates parameters with the thread-local CSPRNG
    pub fn generate(bit_length: usize, config: &DssConfig) -> Result<Self> {
        Self::generate_with(&mut rand::rng(), bit_length, config)
    }

    /// Generates `q` of `max(min_subgroup_bits, bit_length / 4)` bits, then
    /// searches for `p = k*q + 1` of exactly `bit_length` bits.
    ///
    /// `k` is drawn from the range that pins the bit length of `p` and is
    /// forced even so `p` is odd.
    ///
    /// # Errors
    /// - `InvalidParameter` when `bit_length` leaves no room for `k >= 2`
    /// - `ParameterGeneration` after `max_parameter_attempts` composite candidates
    pub fn generate_with<R: CryptoRng + RngCore + ?Sized>(
        rng: &mut R,
        bit_length: usize,
        config: &DssConfig,
    ) -> Result<Self> {
        config.check_bit_length(bit_length)?;
        let rounds = config.miller_rabin_rounds;
        let q_bits = config.subgroup_bits(bit_length);

        info!("generating field parameters: p {bit_length} bits, q {q_bits} bits");
        let q = generate_prime_with(rng, q_bits, rounds)?;

        // 2^(b-1) <= k*q + 1 < 2^b
        let lower = BigUint::one() << (bit_length - 1);
        let upper = BigUint::one() << bit_length;
        let k_min = (&lower - 1u32).div_ceil(&q).max(BigUint::from(2u32));
        let k_max = (&upper - 2u32) / &q;
        if k_min > k_max {
            return Err(DssError::InvalidParameter(format!(
                "no {bit_length}-bit p = k*q + 1 exists for a {q_bits}-bit q"
            )));
        }
        let k_end = &k_max + 1u32;

        for attempt in 1..=config.max_parameter_attempts {
            let mut k = random_range_with(rng, &k_min, &k_end)?;
            if k.is_odd() {
                k = if k < k_max { k + 1u32 } else { k - 1u32 };
            }
            let p = &k * &q + 1u32;
            if p.bits() as usize != bit_length {
                continue;
            }
            if is_probable_prime_with(rng, &p, rounds) {
                info!("field parameters found after {attempt} candidates");
                return Ok(Self { p, q, bit_length });
            }
        }

        debug!(
            "gave up on {bit_length}-bit parameters after {} candidates",
            config.max_parameter_attempts
        );
        Err(DssError::ParameterGeneration {
            bit_length,
            attempts: config.max_parameter_attempts,
        })
    }

    /// The field prime `p`
    pub fn p(&self) -> &BigUint {
        &self.p
    }

    /// The subgroup order `q`
    pub fn q(&self) -> &BigUint {
        &self.q
    }

    pub fn bit_length(&self) -> usize {
        self.bit_length
    }

    /// `(p - 1) / q`, the exponent that maps `F_p^*` onto the order-`q` subgroup
    pub fn cofactor(&self) -> BigUint {
        (&self.p - 1u32) / &self.q
    }

    /// True when `1 <= v <= p - 1`
    pub fn contains(&self, v: &BigUint) -> bool {
        !v.is_zero() && *v < self.p
    }
}

impl fmt::Display for FieldParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p = {} ({} bits), q = {}", self.p, self.bit_length, self.q)
    }
}
