//! Elliptic-curve engine (forms 2.1 and 2.2)
//!
//! The secret is a point `G_s = s0·G` rather than a scalar. With `x_G` the
//! x-coordinate of `G_s` reduced mod `n`, the public key is
//! `P = (-x_G)·G_s`. Signatures are `(R, s, Z)`:
//!
//! ```text
//! R = k·G_s,  Z = u·G_s,  s = (u·x_R + x_G·x_Z) / (k·(e + x_R))  (mod n)
//! ```
//!
//! and verification checks `[e + x_R]([s]R) + [x_Z]P = [x_R]Z`.

use super::{SignatureScheme, Verification, keygen_exhausted, retry, signing_exhausted};
use crate::config::DssConfig;
use crate::elliptic_curve::{CurveParams, NamedCurve, Point};
use crate::error::{DssError, Result};
use crate::forms::HardProblem;
use crate::hash::hash_to_scalar;
use crate::metrics::{Diagnostics, Meter, Metrics, OpKind};
use crate::modular::{mod_inv, mod_mul, random_range_with};
use log::{debug, info, trace};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use std::fmt;

/// The secret generator point `G_s`
#[derive(Clone, PartialEq, Eq)]
pub struct CurvePrivateKey(Point);

impl CurvePrivateKey {
    pub fn new(point: Point) -> Self {
        Self(point)
    }

    pub fn point(&self) -> &Point {
        &self.0
    }
}

impl fmt::Debug for CurvePrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CurvePrivateKey(..)")
    }
}

/// `P = (-x_G)·G_s`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurvePublicKey(Point);

impl CurvePublicKey {
    pub fn new(point: Point) -> Self {
        Self(point)
    }

    pub fn point(&self) -> &Point {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurveSignature {
    pub r: Point,
    pub s: BigUint,
    pub z: Point,
}

impl fmt::Display for CurveSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(R = {}, s = {}, Z = {})", self.r, self.s, self.z)
    }
}

/// Caller-chosen randomness for a single signing attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurveNonces {
    pub k: BigUint,
    pub u: BigUint,
}

impl CurveNonces {
    pub fn new(k: u64, u: u64) -> Self {
        Self {
            k: BigUint::from(k),
            u: BigUint::from(u),
        }
    }
}

/// Signature engine over a prime-order curve subgroup
#[derive(Debug)]
pub struct CurveEngine {
    params: CurveParams,
    config: DssConfig,
    metrics: Metrics,
}

impl CurveEngine {
    pub fn new(params: CurveParams, config: DssConfig) -> Self {
        Self {
            params,
            config,
            metrics: Metrics::new(),
        }
    }

    pub fn named(curve: NamedCurve, config: DssConfig) -> Self {
        Self::new(CurveParams::named(curve).clone(), config)
    }

    /// Engine on the fixed curve for a security size in bits
    pub fn for_bit_length(bits: usize, config: DssConfig) -> Result<Self> {
        Ok(Self::new(CurveParams::for_bit_length(bits)?.clone(), config))
    }

    pub fn params(&self) -> &CurveParams {
        &self.params
    }

    pub fn config(&self) -> &DssConfig {
        &self.config
    }

    /// `P = (-x_G)·G_s` for an existing private key
    pub fn public_key_for(&self, private_key: &CurvePrivateKey) -> Result<CurvePublicKey> {
        let x_g = self.check_private(private_key)?;
        let n = self.params.order();
        let scalar = (n - x_g) % n;
        Ok(CurvePublicKey(
            self.params.scalar_mul(&scalar, private_key.point()),
        ))
    }

    /// Validates `G_s` and returns `x_G mod n`
    fn check_private(&self, private_key: &CurvePrivateKey) -> Result<BigUint> {
        let point = private_key.point();
        let Some(x) = point.x() else {
            return Err(DssError::InvalidParameter(
                "private key is the point at infinity".into(),
            ));
        };
        if !self.params.contains(point) {
            return Err(DssError::InvalidParameter(format!(
                "private key {point} is not on the curve"
            )));
        }
        if !self.params.in_subgroup(point) {
            return Err(DssError::InvalidParameter(format!(
                "private key {point} is outside the subgroup of order {}",
                self.params.order()
            )));
        }
        let x_g = x % self.params.order();
        if x_g.is_zero() {
            return Err(DssError::InvalidParameter(
                "private key x-coordinate vanishes modulo the group order".into(),
            ));
        }
        Ok(x_g)
    }

    /// A single signing attempt with fixed nonces
    ///
    /// # Errors
    /// `DegenerateSample` when these nonces hit an identity point or a zero
    /// denominator; `InvalidParameter` when a nonce is outside `[1, n - 1]`.
    pub fn sign_with_nonces(
        &self,
        message: &[u8],
        private_key: &CurvePrivateKey,
        nonces: &CurveNonces,
    ) -> Result<(CurveSignature, Diagnostics)> {
        let x_g = self.check_private(private_key)?;
        let n = self.params.order();
        for nonce in [&nonces.k, &nonces.u] {
            if nonce.is_zero() || nonce >= n {
                return Err(DssError::InvalidParameter(format!(
                    "nonce {nonce} outside [1, {}]",
                    n - 1u32
                )));
            }
        }

        let mut meter = Meter::new();
        let signature = self.sign_attempt(private_key.point(), &x_g, message, nonces, &mut meter)?;
        let diagnostics = meter.finish();
        self.metrics.record(&diagnostics.ops);
        Ok((signature, diagnostics))
    }

    fn sign_attempt(
        &self,
        secret: &Point,
        x_g: &BigUint,
        message: &[u8],
        nonces: &CurveNonces,
        meter: &mut Meter,
    ) -> Result<CurveSignature> {
        let n = self.params.order();
        let CurveNonces { k, u } = nonces;

        let r = self.params.scalar_mul(k, secret);
        let z = self.params.scalar_mul(u, secret);
        meter.count_n(OpKind::PointMultiplication, 2);
        let (Some(r_x), Some(z_x)) = (r.x(), z.x()) else {
            return Err(DssError::DegenerateSample("commitment is the point at infinity"));
        };

        let e = hash_to_scalar(&[r_x, &message], n);
        meter.count(OpKind::Hash);
        let x_r = r_x % n;
        let x_z = z_x % n;
        meter.record("R", &r);
        meter.record("Z", &z);
        meter.record("e", &e);
        meter.record("x_R", &x_r);
        meter.record("x_Z", &x_z);
        trace!("curve attempt: R = {r}, e = {e}");

        if x_r.is_zero() {
            return Err(DssError::DegenerateSample("x_R vanishes modulo n"));
        }

        let denominator = mod_mul(k, &((&e + &x_r) % n), n);
        let numerator = (u * &x_r + x_g * &x_z) % n;
        meter.count_n(OpKind::Multiplication, 3);
        if denominator.is_zero() {
            return Err(DssError::DegenerateSample("zero denominator"));
        }
        let inverse = mod_inv(&denominator, n)
            .map_err(|_| DssError::DegenerateSample("denominator is not invertible"))?;
        meter.count(OpKind::Inversion);

        let s = mod_mul(&numerator, &inverse, n);
        meter.count(OpKind::Multiplication);
        meter.record("s", &s);
        if s.is_zero() {
            return Err(DssError::DegenerateSample("zero response"));
        }

        Ok(CurveSignature { r, s, z })
    }
}

impl SignatureScheme for CurveEngine {
    type PrivateKey = CurvePrivateKey;
    type PublicKey = CurvePublicKey;
    type Signature = CurveSignature;

    fn forms(&self) -> [HardProblem; 2] {
        [HardProblem::Form2_1, HardProblem::Form2_2]
    }

    fn generate_key_pair_traced_with<R: CryptoRng + RngCore + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<(CurvePrivateKey, CurvePublicKey, Diagnostics)> {
        let n = self.params.order().clone();
        let g = self.params.generator().clone();
        let one = BigUint::one();

        let mut meter = Meter::new();
        let (secret, x_g) = retry(
            self.config.max_keygen_attempts,
            &mut meter,
            keygen_exhausted,
            |meter| {
                let s0 = random_range_with(rng, &one, &n)?;
                let secret = self.params.scalar_mul(&s0, &g);
                meter.count(OpKind::PointMultiplication);
                let Some(x) = secret.x() else {
                    return Err(DssError::DegenerateSample("secret point is the identity"));
                };
                let x_g = x % &n;
                if x_g.is_zero() {
                    return Err(DssError::DegenerateSample("x_G vanishes modulo n"));
                }
                Ok((secret, x_g))
            },
        )?;

        let public = self.params.scalar_mul(&(&n - x_g), &secret);
        meter.count(OpKind::PointMultiplication);
        meter.record("P", &public);
        let diagnostics = meter.finish();
        self.metrics.record(&diagnostics.ops);
        info!(
            "curve key pair generated on a subgroup of order {n} after {} resamples",
            diagnostics.ops.resamples
        );
        Ok((CurvePrivateKey(secret), CurvePublicKey(public), diagnostics))
    }

    fn sign_traced_with<R: CryptoRng + RngCore + ?Sized>(
        &self,
        rng: &mut R,
        message: &[u8],
        private_key: &CurvePrivateKey,
    ) -> Result<(CurveSignature, Diagnostics)> {
        let x_g = self.check_private(private_key)?;
        let n = self.params.order();
        let one = BigUint::one();

        let mut meter = Meter::new();
        let signature = retry(
            self.config.max_signing_attempts,
            &mut meter,
            signing_exhausted,
            |meter| {
                let nonces = CurveNonces {
                    k: random_range_with(rng, &one, n)?,
                    u: random_range_with(rng, &one, n)?,
                };
                self.sign_attempt(private_key.point(), &x_g, message, &nonces, meter)
            },
        )?;

        let diagnostics = meter.finish();
        self.metrics.record(&diagnostics.ops);
        debug!(
            "curve signature after {} resamples",
            diagnostics.ops.resamples
        );
        Ok((signature, diagnostics))
    }

    fn verify(
        &self,
        message: &[u8],
        signature: &CurveSignature,
        public_key: &CurvePublicKey,
    ) -> Result<Verification> {
        let params = &self.params;
        let n = params.order();
        let CurveSignature { r, s, z } = signature;
        let p = public_key.point();

        let mut meter = Meter::new();
        let well_formed = !s.is_zero()
            && s < n
            && params.in_subgroup(r)
            && params.in_subgroup(z)
            && params.in_subgroup(p);
        meter.record("well_formed", well_formed);
        let (Some(r_x), Some(z_x), true) = (r.x(), z.x(), well_formed) else {
            debug!("curve signature rejected: malformed component");
            meter.record("valid", false);
            let diagnostics = meter.finish();
            self.metrics.record(&diagnostics.ops);
            return Ok(Verification {
                valid: false,
                diagnostics,
            });
        };

        let e = hash_to_scalar(&[r_x, &message], n);
        meter.count(OpKind::Hash);
        let x_r = r_x % n;
        let x_z = z_x % n;

        let s_r = params.scalar_mul(s, r);
        let lhs = params.curve().add(
            &params.scalar_mul(&((&e + &x_r) % n), &s_r),
            &params.scalar_mul(&x_z, p),
        );
        let rhs = params.scalar_mul(&x_r, z);
        meter.count_n(OpKind::PointMultiplication, 4);
        meter.count(OpKind::PointAddition);

        let valid = !lhs.is_infinity() && lhs == rhs;
        meter.record("e", e);
        meter.record("x_R", x_r);
        meter.record("x_Z", x_z);
        meter.record("lhs", lhs);
        meter.record("rhs", rhs);
        meter.record("valid", valid);

        let diagnostics = meter.finish();
        self.metrics.record(&diagnostics.ops);
        info!(
            "curve verification {}",
            if valid { "passed" } else { "failed" }
        );
        Ok(Verification { valid, diagnostics })
    }

    fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn big(v: u64) -> BigUint {
        BigUint::from(v)
    }

    fn small_engine() -> CurveEngine {
        CurveEngine::new(CurveParams::search(97, 2, 3).unwrap(), DssConfig::default())
    }

    fn base_key(engine: &CurveEngine) -> (CurvePrivateKey, CurvePublicKey) {
        let private = CurvePrivateKey::new(engine.params().generator().clone());
        let public = engine.public_key_for(&private).unwrap();
        (private, public)
    }

    #[test]
    fn test_public_key_small_curve() {
        let engine = small_engine();
        let (_, public) = base_key(&engine);
        // x_G = 3, so P = 2·G
        assert_eq!(public.point(), &Point::affine(big(80), big(87)));
    }

    #[test]
    fn test_sign_with_nonces_vector() {
        let engine = small_engine();
        let (private, public) = base_key(&engine);
        let (signature, diagnostics) = engine
            .sign_with_nonces(b"hello", &private, &CurveNonces::new(1, 2))
            .unwrap();

        assert_eq!(signature.r, Point::affine(big(3), big(91)));
        assert_eq!(signature.s, big(1));
        assert_eq!(signature.z, Point::affine(big(80), big(87)));
        assert_eq!(diagnostics.ops.hashes, 1);
        assert_eq!(diagnostics.ops.point_multiplications, 2);

        let verification = engine.verify(b"hello", &signature, &public).unwrap();
        assert!(verification.valid);
        assert_eq!(verification.diagnostics.ops.point_multiplications, 4);
        assert_eq!(verification.diagnostics.ops.point_additions, 1);
    }

    #[test]
    fn test_vanishing_x_r_is_degenerate() {
        let engine = small_engine();
        let (private, _) = base_key(&engine);
        // 2·G = (80, 87) and 80 ≡ 0 (mod 5)
        let result = engine.sign_with_nonces(b"hello", &private, &CurveNonces::new(2, 1));
        assert_eq!(result, Err(DssError::DegenerateSample("x_R vanishes modulo n")));
    }

    #[test]
    fn test_incremented_s_fails() {
        let engine = small_engine();
        let (private, public) = base_key(&engine);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..10 {
            let mut signature = engine.sign_with(&mut rng, b"hello", &private).unwrap();
            assert!(engine.verify(b"hello", &signature, &public).unwrap().valid);
            signature.s += 1u32;
            assert!(!engine.verify(b"hello", &signature, &public).unwrap().valid);
        }
    }

    #[test]
    fn test_keygen_skips_vanishing_x() {
        let mut engine = small_engine();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..10 {
            let (private, public) = engine.generate_key_pair_with(&mut rng).unwrap();
            let x = private.point().x().unwrap();
            // only ±G survive on the order-5 subgroup
            assert_eq!(x, &big(3));
            assert!(engine.params().contains(public.point()));
        }
    }

    #[test]
    fn test_rejects_identity_and_off_curve_points() {
        let engine = small_engine();
        let (private, public) = base_key(&engine);
        let (signature, _) = engine
            .sign_with_nonces(b"hello", &private, &CurveNonces::new(1, 2))
            .unwrap();

        let mut no_r = signature.clone();
        no_r.r = Point::Infinity;
        assert!(!engine.verify(b"hello", &no_r, &public).unwrap().valid);

        let mut off_curve = signature.clone();
        off_curve.z = Point::affine(big(1), big(1));
        assert!(!engine.verify(b"hello", &off_curve, &public).unwrap().valid);

        let identity_key = CurvePublicKey::new(Point::Infinity);
        assert!(!engine.verify(b"hello", &signature, &identity_key).unwrap().valid);

        let mut zero_s = signature;
        zero_s.s = BigUint::zero();
        assert!(!engine.verify(b"hello", &zero_s, &public).unwrap().valid);
    }

    #[test]
    fn test_invalid_private_keys() {
        let engine = small_engine();
        let identity = CurvePrivateKey::new(Point::Infinity);
        assert!(matches!(
            engine.sign(b"hello", &identity),
            Err(DssError::InvalidParameter(_))
        ));
        let vanishing = CurvePrivateKey::new(Point::affine(big(80), big(87)));
        assert!(matches!(
            engine.public_key_for(&vanishing),
            Err(DssError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_rejects_points_outside_subgroup() {
        let engine = small_engine();
        // on the curve with order 100, not 5
        let outside = Point::affine(big(1), big(43));
        let key = CurvePrivateKey::new(outside.clone());
        assert!(matches!(
            engine.public_key_for(&key),
            Err(DssError::InvalidParameter(_))
        ));
        assert!(matches!(
            engine.sign(b"hello", &key),
            Err(DssError::InvalidParameter(_))
        ));
        assert!(matches!(
            engine.sign_with_nonces(b"hello", &key, &CurveNonces::new(1, 2)),
            Err(DssError::InvalidParameter(_))
        ));

        let (private, public) = base_key(&engine);
        let (signature, _) = engine
            .sign_with_nonces(b"hello", &private, &CurveNonces::new(1, 2))
            .unwrap();
        let mut bad_r = signature.clone();
        bad_r.r = outside.clone();
        let mut bad_z = signature.clone();
        bad_z.z = outside.clone();
        for candidate in [&bad_r, &bad_z] {
            let verification = engine.verify(b"hello", candidate, &public).unwrap();
            assert!(!verification.valid);
            assert_eq!(verification.diagnostics.ops.point_multiplications, 0);
        }
        let outside_key = CurvePublicKey::new(outside);
        assert!(!engine.verify(b"hello", &signature, &outside_key).unwrap().valid);
    }

    #[test]
    fn test_keygen_counts_operations() {
        let mut engine = small_engine();
        let mut rng = StdRng::seed_from_u64(21);
        let (_, public, diagnostics) = engine.generate_key_pair_traced_with(&mut rng).unwrap();

        assert_eq!(diagnostics.ops.point_multiplications, 2);
        assert_eq!(diagnostics.ops.hashes, 0);
        assert_eq!(diagnostics.trace.point("P"), Some(public.point()));
        assert_eq!(engine.metrics_snapshot(), diagnostics.ops);
    }

    #[test]
    fn test_exhaustion_is_reported() {
        let config = DssConfig::default().with_max_signing_attempts(1);
        let engine = CurveEngine::new(CurveParams::search(97, 2, 3).unwrap(), config);
        let (private, _) = base_key(&engine);
        let mut rng = StdRng::seed_from_u64(0);

        // a single attempt fails often on this tiny subgroup
        let mut exhausted = 0;
        for _ in 0..50 {
            match engine.sign_with(&mut rng, b"hello", &private) {
                Ok(_) => {}
                Err(DssError::SigningExhausted { attempts: 1 }) => exhausted += 1,
                Err(other) => panic!("unexpected error {other}"),
            }
        }
        assert!(exhausted > 0);
    }

    #[test]
    fn test_debug_hides_private_key() {
        let key = CurvePrivateKey::new(Point::Infinity);
        assert_eq!(format!("{key:?}"), "CurvePrivateKey(..)");
    }
}
