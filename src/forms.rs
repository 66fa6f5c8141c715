//! The hard problems behind the two engines
//!
//! Forms 1.1 and 1.2 live in `F_p^*`, forms 2.1 and 2.2 on an elliptic curve.
//! Besides the descriptors this module has brute-force solvers for the
//! finite-field forms. They only accept tiny moduli and exist to show how
//! the search space grows.

use crate::error::{DssError, Result};
use crate::modular::mod_exp;
use num_bigint::BigUint;
use serde::Serialize;
use std::fmt;

/// Largest modulus the brute-force solvers accept
pub const BRUTE_FORCE_LIMIT: u64 = 1 << 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum HardProblem {
    /// `y ≡ x^(-x) (mod p)`: recover `x` from `y`
    Form1_1,
    /// `a^x ≡ x^b (mod p)`: the shape of the finite-field verification equation
    Form1_2,
    /// `P = (-x_G)·G`: recover the secret generator `G` from `P`
    Form2_1,
    /// `[e + x_R]([s]R) + [x_Z]P = [x_R]Z`: the curve verification identity
    Form2_2,
}

impl HardProblem {
    pub const ALL: [HardProblem; 4] = [
        HardProblem::Form1_1,
        HardProblem::Form1_2,
        HardProblem::Form2_1,
        HardProblem::Form2_2,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            HardProblem::Form1_1 => "1.1",
            HardProblem::Form1_2 => "1.2",
            HardProblem::Form2_1 => "2.1",
            HardProblem::Form2_2 => "2.2",
        }
    }

    pub fn equation(&self) -> &'static str {
        match self {
            HardProblem::Form1_1 => "y ≡ x^(-x) (mod p)",
            HardProblem::Form1_2 => "r^(s(e + r)) · y^w ≡ w^r (mod p)",
            HardProblem::Form2_1 => "P = (-x_G)·G",
            HardProblem::Form2_2 => "[e + x_R]([s]R) + [x_Z]P = [x_R]Z",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            HardProblem::Form1_1 => {
                "Find x given y and p; the unknown is both base and exponent"
            }
            HardProblem::Form1_2 => {
                "Transcendental verification equation with the signer's secret in several exponent positions"
            }
            HardProblem::Form2_1 => {
                "Find the secret point G given P, where x_G is the x-coordinate of G"
            }
            HardProblem::Form2_2 => {
                "Verification identity mixing point x-coordinates into scalar positions"
            }
        }
    }
}

impl fmt::Display for HardProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Form {}: {}", self.label(), self.equation())
    }
}

fn check_small(p: u64) -> Result<()> {
    if p < 3 || p > BRUTE_FORCE_LIMIT {
        return Err(DssError::InvalidParameter(format!(
            "brute force needs 3 <= p <= {BRUTE_FORCE_LIMIT}, got {p}"
        )));
    }
    Ok(())
}

fn pow_mod(base: u64, exp: u64, p: u64) -> u64 {
    let r = mod_exp(&BigUint::from(base), &BigUint::from(exp), &BigUint::from(p));
    r.iter_u64_digits().next().unwrap_or(0)
}

/// `(x, x^x mod p)` for `x = 1..=count` (capped at `p - 1`)
pub fn self_power_table(p: u64, count: u64) -> Result<Vec<(u64, u64)>> {
    check_small(p)?;
    Ok((1..=count.min(p - 1)).map(|x| (x, pow_mod(x, x, p))).collect())
}

/// Exhaustive search for `x` with `x^x ≡ target (mod p)`
///
/// Returns the first solution and the number of candidates tried.
pub fn solve_self_power(target: u64, p: u64) -> Result<(Option<u64>, u64)> {
    check_small(p)?;
    let mut attempts = 0;
    for x in 1..p {
        attempts += 1;
        if pow_mod(x, x, p) == target % p {
            return Ok((Some(x), attempts));
        }
    }
    Ok((None, attempts))
}

/// Every `x ∈ [1, p - 1]` with `a^x ≡ x^b (mod p)`
pub fn transcendental_solutions(a: u64, b: u64, p: u64) -> Result<Vec<u64>> {
    check_small(p)?;
    Ok((1..p)
        .filter(|&x| pow_mod(a, x, p) == pow_mod(x, b, p))
        .collect())
}
