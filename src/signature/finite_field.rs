//! Finite-field engine (forms 1.1 and 1.2)
//!
//! Keys: `x` generates the order-`q` subgroup of `F_p^*` and the public key
//! is `y = x^(-x) mod p`. Signatures are `(r, s, z)` with
//!
//! ```text
//! r = x^k,  w = x^v,  s = (v·r + x·w) / (k·(e + r)),  z = x^(v - k·s)
//! ```
//!
//! where `e = H(r, message) mod q` and all exponent arithmetic is done modulo
//! a multiple of the order of `x`. Verification rebuilds `w = r^s·z` and
//! checks `r^(s(e + r)) · y^w ≡ w^r (mod p)`.

use super::{SignatureScheme, Verification, retry, signing_exhausted};
use crate::config::DssConfig;
use crate::error::{DssError, Result};
use crate::forms::HardProblem;
use crate::hash::hash_to_scalar;
use crate::metrics::{Diagnostics, Meter, Metrics, OpKind};
use crate::modular::{mod_exp, mod_inv, mod_mul, random_range_with};
use crate::params::FieldParams;
use log::{debug, info, trace};
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use std::fmt;

/// Secret exponent `x`
#[derive(Clone, PartialEq, Eq)]
pub struct FieldPrivateKey(BigUint);

impl FieldPrivateKey {
    pub fn new(x: BigUint) -> Self {
        Self(x)
    }

    pub fn value(&self) -> &BigUint {
        &self.0
    }
}

impl fmt::Debug for FieldPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldPrivateKey(..)")
    }
}

/// Public value `y = x^(-x) mod p`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldPublicKey(BigUint);

impl FieldPublicKey {
    pub fn new(y: BigUint) -> Self {
        Self(y)
    }

    pub fn value(&self) -> &BigUint {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSignature {
    pub r: BigUint,
    pub s: BigUint,
    pub z: BigUint,
}

impl fmt::Display for FieldSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(r = {}, s = {}, z = {})", self.r, self.s, self.z)
    }
}

/// Caller-chosen randomness for a single signing attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldNonces {
    pub k: BigUint,
    pub u: BigUint,
    pub v: BigUint,
}

impl FieldNonces {
    pub fn new(k: u64, u: u64, v: u64) -> Self {
        Self {
            k: BigUint::from(k),
            u: BigUint::from(u),
            v: BigUint::from(v),
        }
    }
}

/// Signature engine over `F_p^*`
#[derive(Debug)]
pub struct FiniteFieldEngine {
    params: Option<FieldParams>,
    config: DssConfig,
    metrics: Metrics,
}

impl Default for FiniteFieldEngine {
    fn default() -> Self {
        Self::new(DssConfig::default())
    }
}

impl FiniteFieldEngine {
    /// An engine without parameters; key generation creates them
    pub fn new(config: DssConfig) -> Self {
        Self {
            params: None,
            config,
            metrics: Metrics::new(),
        }
    }

    pub fn with_params(params: FieldParams, config: DssConfig) -> Self {
        Self {
            params: Some(params),
            config,
            metrics: Metrics::new(),
        }
    }

    pub fn params(&self) -> Option<&FieldParams> {
        self.params.as_ref()
    }

    pub fn config(&self) -> &DssConfig {
        &self.config
    }

    pub fn set_params(&mut self, params: FieldParams) {
        self.params = Some(params);
    }

    pub fn generate_parameters(&mut self, bit_length: usize) -> Result<&FieldParams> {
        self.generate_parameters_with(&mut rand::rng(), bit_length)
    }

    /// Generates fresh parameters and stores them in the engine
    pub fn generate_parameters_with<R: CryptoRng + RngCore + ?Sized>(
        &mut self,
        rng: &mut R,
        bit_length: usize,
    ) -> Result<&FieldParams> {
        let params = FieldParams::generate_with(rng, bit_length, &self.config)?;
        info!("finite-field parameters ready: {} bits", params.bit_length());
        Ok(&*self.params.insert(params))
    }

    fn require_params(&self) -> Result<&FieldParams> {
        self.params.as_ref().ok_or(DssError::UninitializedParameters)
    }

    /// `y = x^(-x) mod p` for an existing private key
    pub fn public_key_for(&self, private_key: &FieldPrivateKey) -> Result<FieldPublicKey> {
        let params = self.require_params()?;
        let x = check_private(params, private_key)?;
        Ok(FieldPublicKey(derive_public(params, x)))
    }

    /// The modulus used for exponent arithmetic when signing with this key
    pub fn exponent_modulus(&self, private_key: &FieldPrivateKey) -> Result<BigUint> {
        let params = self.require_params()?;
        let x = check_private(params, private_key)?;
        Ok(exponent_modulus(params, x))
    }

    /// A single signing attempt with fixed nonces
    ///
    /// # Errors
    /// `DegenerateSample` when these nonces give a zero or non-invertible
    /// denominator; `InvalidParameter` when a nonce is outside `[1, m - 1]`.
    pub fn sign_with_nonces(
        &self,
        message: &[u8],
        private_key: &FieldPrivateKey,
        nonces: &FieldNonces,
    ) -> Result<(FieldSignature, Diagnostics)> {
        let params = self.require_params()?;
        let x = check_private(params, private_key)?;
        let m = exponent_modulus(params, x);
        for nonce in [&nonces.k, &nonces.u, &nonces.v] {
            if nonce.is_zero() || *nonce >= m {
                return Err(DssError::InvalidParameter(format!(
                    "nonce {nonce} outside [1, {}]",
                    &m - 1u32
                )));
            }
        }

        let mut meter = Meter::new();
        let signature = sign_attempt(params, x, &m, message, nonces, &mut meter)?;
        Ok((signature, self.finish_sign(meter, &m)))
    }

    fn finish_sign(&self, mut meter: Meter, m: &BigUint) -> Diagnostics {
        // the order probe behind the exponent modulus
        meter.count(OpKind::Exponentiation);
        meter.record("m", m);
        let diagnostics = meter.finish();
        self.metrics.record(&diagnostics.ops);
        diagnostics
    }
}

impl SignatureScheme for FiniteFieldEngine {
    type PrivateKey = FieldPrivateKey;
    type PublicKey = FieldPublicKey;
    type Signature = FieldSignature;

    fn forms(&self) -> [HardProblem; 2] {
        [HardProblem::Form1_1, HardProblem::Form1_2]
    }

    fn generate_key_pair_traced_with<R: CryptoRng + RngCore + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<(FieldPrivateKey, FieldPublicKey, Diagnostics)> {
        if self.params.is_none() {
            let bit_length = self.config.bit_length;
            self.generate_parameters_with(rng, bit_length)?;
        }
        let params = self.require_params()?;

        let mut meter = Meter::new();
        let x = derive_private(rng, params, self.config.max_keygen_attempts, &mut meter)?;
        let y = derive_public(params, &x);
        // x^x, then its inverse
        meter.count(OpKind::Exponentiation);
        meter.count(OpKind::Inversion);
        meter.record("y", &y);

        let diagnostics = meter.finish();
        self.metrics.record(&diagnostics.ops);
        info!("finite-field key pair generated");
        Ok((FieldPrivateKey(x), FieldPublicKey(y), diagnostics))
    }

    fn sign_traced_with<R: CryptoRng + RngCore + ?Sized>(
        &self,
        rng: &mut R,
        message: &[u8],
        private_key: &FieldPrivateKey,
    ) -> Result<(FieldSignature, Diagnostics)> {
        let params = self.require_params()?;
        let x = check_private(params, private_key)?;
        let m = exponent_modulus(params, x);
        let max_attempts = self.config.max_signing_attempts;

        let mut meter = Meter::new();
        let signature = retry(max_attempts, &mut meter, signing_exhausted, |meter| {
            let nonces = sample_nonces(rng, &m, max_attempts)?;
            sign_attempt(params, x, &m, message, &nonces, meter)
        })?;

        let diagnostics = self.finish_sign(meter, &m);
        debug!(
            "finite-field signature after {} resamples",
            diagnostics.ops.resamples
        );
        Ok((signature, diagnostics))
    }

    fn verify(
        &self,
        message: &[u8],
        signature: &FieldSignature,
        public_key: &FieldPublicKey,
    ) -> Result<Verification> {
        let params = self.require_params()?;
        let p = params.p();
        let p_minus_one = p - 1u32;
        let FieldSignature { r, s, z } = signature;
        let y = public_key.value();

        let mut meter = Meter::new();
        let in_range = params.contains(r)
            && params.contains(z)
            && params.contains(y)
            && *s < response_bound(params, r);
        meter.record("in_range", in_range);
        if !in_range {
            debug!("finite-field signature rejected: component out of range");
            meter.record("valid", false);
            let diagnostics = meter.finish();
            self.metrics.record(&diagnostics.ops);
            return Ok(Verification {
                valid: false,
                diagnostics,
            });
        }

        let e = hash_to_scalar(&[r, &message], params.q());
        meter.count(OpKind::Hash);

        // w = r^s·z recovers the signer's x^v
        let w = mod_mul(&mod_exp(r, s, p), z, p);
        let exponent = (s * (&e + r)) % &p_minus_one;
        let lhs = mod_mul(
            &mod_exp(r, &exponent, p),
            &mod_exp(y, &(&w % &p_minus_one), p),
            p,
        );
        let rhs = mod_exp(&w, &(r % &p_minus_one), p);
        meter.count_n(OpKind::Exponentiation, 4);
        meter.count_n(OpKind::Multiplication, 3);

        let valid = lhs == rhs;
        meter.record("e", e);
        meter.record("w", w);
        meter.record("lhs", lhs);
        meter.record("rhs", rhs);
        meter.record("valid", valid);

        let diagnostics = meter.finish();
        self.metrics.record(&diagnostics.ops);
        info!(
            "finite-field verification {}",
            if valid { "passed" } else { "failed" }
        );
        Ok(Verification { valid, diagnostics })
    }

    fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

fn check_private<'a>(params: &FieldParams, key: &'a FieldPrivateKey) -> Result<&'a BigUint> {
    let x = key.value();
    if *x < BigUint::from(2u32) || *x >= *params.p() {
        return Err(DssError::InvalidParameter(format!(
            "private key outside [2, {}]",
            params.p() - 1u32
        )));
    }
    Ok(x)
}

/// `q` when `x` lies in the order-`q` subgroup, otherwise `p - 1`
fn exponent_modulus(params: &FieldParams, x: &BigUint) -> BigUint {
    if mod_exp(x, params.q(), params.p()).is_one() {
        params.q().clone()
    } else {
        params.p() - 1u32
    }
}

/// Exclusive upper bound for `s`
///
/// An `r` of order `q` only fixes `s` modulo `q`, so `s` must be reduced;
/// any other `r` fixes it modulo `p - 1`.
fn response_bound(params: &FieldParams, r: &BigUint) -> BigUint {
    if mod_exp(r, params.q(), params.p()).is_one() {
        params.q().clone()
    } else {
        params.p() - 1u32
    }
}

/// `x = a^((p-1)/q)` for random `a ∈ [2, p - 2]`, skipping `x = 1`
fn derive_private<R: CryptoRng + RngCore + ?Sized>(
    rng: &mut R,
    params: &FieldParams,
    max_attempts: usize,
    meter: &mut Meter,
) -> Result<BigUint> {
    let p = params.p();
    let cofactor = params.cofactor();
    let two = BigUint::from(2u32);
    let upper = p - 1u32;

    for attempt in 1..=max_attempts {
        let a = random_range_with(rng, &two, &upper)?;
        let x = mod_exp(&a, &cofactor, p);
        meter.count(OpKind::Exponentiation);
        if !x.is_one() {
            return Ok(x);
        }
        debug!("key generation attempt {attempt} landed on x = 1");
        meter.discard();
    }

    let x = mod_exp(&two, &cofactor, p);
    meter.count(OpKind::Exponentiation);
    if x.is_one() {
        return Err(DssError::InvalidParameter(format!(
            "no element of order {} found in F_{p}",
            params.q()
        )));
    }
    Ok(x)
}

/// `y = (x^x)^(-1) mod p`, or `x^((p - 1 - x) mod (p - 1))` if the inverse
/// does not exist
fn derive_public(params: &FieldParams, x: &BigUint) -> BigUint {
    let p = params.p();
    let self_power = mod_exp(x, x, p);
    match mod_inv(&self_power, p) {
        Ok(y) => y,
        Err(_) => {
            let p_minus_one = p - 1u32;
            let exponent = (&p_minus_one - (x % &p_minus_one)) % &p_minus_one;
            mod_exp(x, &exponent, p)
        }
    }
}

/// `k, u, v ∈ [1, m - 1]`, redrawing `k` until it is a unit mod `m`
fn sample_nonces<R: CryptoRng + RngCore + ?Sized>(
    rng: &mut R,
    m: &BigUint,
    max_draws: usize,
) -> Result<FieldNonces> {
    let one = BigUint::one();
    let mut k = random_range_with(rng, &one, m)?;
    for _ in 1..max_draws {
        if k.gcd(m).is_one() {
            break;
        }
        k = random_range_with(rng, &one, m)?;
    }
    Ok(FieldNonces {
        k,
        u: random_range_with(rng, &one, m)?,
        v: random_range_with(rng, &one, m)?,
    })
}

fn sign_attempt(
    params: &FieldParams,
    x: &BigUint,
    m: &BigUint,
    message: &[u8],
    nonces: &FieldNonces,
    meter: &mut Meter,
) -> Result<FieldSignature> {
    let p = params.p();
    let FieldNonces { k, u, v } = nonces;
    if !k.gcd(m).is_one() {
        return Err(DssError::DegenerateSample("k is not a unit modulo the exponent modulus"));
    }

    let r = mod_exp(x, k, p);
    let e = hash_to_scalar(&[&r, &message], params.q());
    let z = mod_exp(x, u, p);
    let w = mod_exp(x, v, p);
    meter.count_n(OpKind::Exponentiation, 3);
    meter.count(OpKind::Hash);

    let numerator = (v * &r + x * &w) % m;
    let denominator = (k * (&e + &r)) % m;
    meter.count_n(OpKind::Multiplication, 3);
    meter.record("r", &r);
    meter.record("e", &e);
    meter.record("z", z);
    meter.record("w", &w);
    meter.record("numerator", &numerator);
    meter.record("denominator", &denominator);
    trace!("finite-field attempt: r = {r}, e = {e}");

    if denominator.is_zero() {
        return Err(DssError::DegenerateSample("zero denominator"));
    }
    let inverse = mod_inv(&denominator, m)
        .map_err(|_| DssError::DegenerateSample("denominator is not invertible"))?;
    meter.count(OpKind::Inversion);

    let s = mod_mul(&numerator, &inverse, m);
    let ks = mod_mul(k, &s, m);
    meter.count_n(OpKind::Multiplication, 2);

    let exponent = (v + m - ks) % m;
    let z = mod_exp(x, &exponent, p);
    meter.count(OpKind::Exponentiation);
    meter.record("s", &s);
    meter.record("z_prime", &z);

    Ok(FieldSignature { r, s, z })
}
