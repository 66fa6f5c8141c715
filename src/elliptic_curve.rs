//! Elliptic curves over prime fields
//!
//! Short Weierstrass curves `y² = x³ + ax + b (mod p)` with affine point
//! arithmetic. Degenerate geometric cases (vertical tangents, a vanishing
//! slope denominator) collapse to the point at infinity rather than
//! returning an error.
//!
//! `CurveParams` adds a base point `G` of prime order `n`. It is either one
//! of the fixed named curves or found by [`CurveParams::search`] on a small
//! prime field.

use crate::error::{DssError, Result};
use crate::modular::{is_probable_prime, legendre, mod_inv, mod_mul, sqrt_mod};
use log::debug;
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{ToPrimitive, Zero};
use once_cell::sync::Lazy;
use std::fmt;

/// Largest field prime accepted by the point-counting generator search
pub const SEARCH_LIMIT: u64 = 1 << 20;

/// A point on an elliptic curve
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Point {
    /// The point at infinity (identity element)
    Infinity,
    /// A point with affine coordinates (x, y)
    Affine { x: BigUint, y: BigUint },
}

impl Point {
    pub fn affine(x: BigUint, y: BigUint) -> Self {
        Point::Affine { x, y }
    }

    pub fn is_infinity(&self) -> bool {
        matches!(self, Point::Infinity)
    }

    /// x-coordinate, `None` for the identity
    pub fn x(&self) -> Option<&BigUint> {
        match self {
            Point::Infinity => None,
            Point::Affine { x, .. } => Some(x),
        }
    }

    /// y-coordinate, `None` for the identity
    pub fn y(&self) -> Option<&BigUint> {
        match self {
            Point::Infinity => None,
            Point::Affine { y, .. } => Some(y),
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Point::Infinity => write!(f, "O"),
            Point::Affine { x, y } => write!(f, "({x}, {y})"),
        }
    }
}

/// An elliptic curve in short Weierstrass form over `F_p`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EllipticCurve {
    p: BigUint,
    a: BigUint,
    b: BigUint,
}

impl EllipticCurve {
    /// Builds a curve, reducing `a` and `b` modulo `p`
    ///
    /// # Errors
    /// `InvalidParameter` if `p` is not a prime above 3 or the curve is
    /// singular (`4a³ + 27b² ≡ 0`).
    pub fn new(p: BigUint, a: BigUint, b: BigUint) -> Result<Self> {
        if p <= BigUint::from(3u32) || !is_probable_prime(&p, 40) {
            return Err(DssError::InvalidParameter(format!(
                "curve field order {p} must be a prime greater than 3"
            )));
        }

        let a = a % &p;
        let b = b % &p;
        let a_cubed = &a * &a * &a;
        let b_squared = &b * &b;
        let discriminant = (4u32 * a_cubed + 27u32 * b_squared) % &p;
        if discriminant.is_zero() {
            return Err(DssError::InvalidParameter(
                "curve is singular (discriminant is zero)".into(),
            ));
        }

        Ok(Self { p, a, b })
    }

    pub fn p(&self) -> &BigUint {
        &self.p
    }

    pub fn a(&self) -> &BigUint {
        &self.a
    }

    pub fn b(&self) -> &BigUint {
        &self.b
    }

    /// `x³ + ax + b mod p`
    pub fn rhs(&self, x: &BigUint) -> BigUint {
        let x = x % &self.p;
        let x_cubed = &x * &x * &x;
        (x_cubed + &self.a * &x + &self.b) % &self.p
    }

    /// Coordinates must be reduced and satisfy the curve equation
    pub fn is_on_curve(&self, point: &Point) -> bool {
        match point {
            Point::Infinity => true,
            Point::Affine { x, y } => {
                if *x >= self.p || *y >= self.p {
                    return false;
                }
                mod_mul(y, y, &self.p) == self.rhs(x)
            }
        }
    }

    pub fn identity(&self) -> Point {
        Point::Infinity
    }

    /// Builds an affine point, checking that it lies on the curve
    pub fn point(&self, x: BigUint, y: BigUint) -> Result<Point> {
        let p = Point::Affine { x, y };
        if !self.is_on_curve(&p) {
            return Err(DssError::InvalidParameter(format!("{p} is not on the curve")));
        }
        Ok(p)
    }

    /// The point with the smaller y-coordinate above `x`, if any
    pub fn lift_x(&self, x: &BigUint) -> Option<Point> {
        let x = x % &self.p;
        let y = sqrt_mod(&self.rhs(&x), &self.p)?;
        Some(Point::Affine { x, y })
    }

    pub fn negate(&self, p: &Point) -> Point {
        match p {
            Point::Infinity => Point::Infinity,
            Point::Affine { x, y } => Point::Affine {
                x: x.clone(),
                y: (&self.p - (y % &self.p)) % &self.p,
            },
        }
    }

    fn sub_mod(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a + &self.p - (b % &self.p)) % &self.p
    }

    /// Chord-and-tangent addition
    ///
    /// `P + O = P`, `P + (-P) = O`, `P + P` is routed to [`Self::double`].
    /// A slope whose denominator has no inverse yields `O`.
    pub fn add(&self, p: &Point, q: &Point) -> Point {
        match (p, q) {
            (Point::Infinity, _) => q.clone(),
            (_, Point::Infinity) => p.clone(),
            (Point::Affine { x: x1, y: y1 }, Point::Affine { x: x2, y: y2 }) => {
                if x1 == x2 {
                    if y1 == y2 {
                        return self.double(p);
                    }
                    return Point::Infinity;
                }

                let numerator = self.sub_mod(y2, y1);
                let denominator = self.sub_mod(x2, x1);
                let Ok(inverse) = mod_inv(&denominator, &self.p) else {
                    return Point::Infinity;
                };
                let lambda = mod_mul(&numerator, &inverse, &self.p);

                let lambda_squared = mod_mul(&lambda, &lambda, &self.p);
                let x3 = self.sub_mod(&self.sub_mod(&lambda_squared, x1), x2);
                let y3 = self.sub_mod(&mod_mul(&lambda, &self.sub_mod(x1, &x3), &self.p), y1);
                Point::Affine { x: x3, y: y3 }
            }
        }
    }

    /// Tangent doubling; `2O = O` and a point with `y = 0` doubles to `O`
    pub fn double(&self, p: &Point) -> Point {
        let Point::Affine { x, y } = p else {
            return Point::Infinity;
        };
        if (y % &self.p).is_zero() {
            return Point::Infinity;
        }

        let numerator = (3u32 * mod_mul(x, x, &self.p) + &self.a) % &self.p;
        let denominator = (2u32 * y) % &self.p;
        let Ok(inverse) = mod_inv(&denominator, &self.p) else {
            return Point::Infinity;
        };
        let lambda = mod_mul(&numerator, &inverse, &self.p);

        let lambda_squared = mod_mul(&lambda, &lambda, &self.p);
        let x3 = self.sub_mod(&lambda_squared, &(2u32 * x));
        let y3 = self.sub_mod(&mod_mul(&lambda, &self.sub_mod(x, &x3), &self.p), y);
        Point::Affine { x: x3, y: y3 }
    }

    /// Double-and-add over the bits of `k`, most significant first, with no
    /// reduction of `k`
    ///
    /// Used directly for cofactor multiplication; subgroup arithmetic goes
    /// through [`CurveParams::scalar_mul`].
    pub fn mul_unreduced(&self, k: &BigUint, p: &Point) -> Point {
        let mut result = Point::Infinity;
        for i in (0..k.bits()).rev() {
            result = self.double(&result);
            if k.bit(i) {
                result = self.add(&result, p);
            }
        }
        result
    }

    /// `#E(F_p)` by summing Legendre symbols; only for `p < SEARCH_LIMIT`
    pub fn count_points(&self) -> Result<u64> {
        let p = self.small_prime()?;
        let mut total = p + 1;
        let mut non_residues = 0u64;
        for x in 0..p {
            match legendre(&self.rhs(&BigUint::from(x)), &self.p) {
                1 => total += 1,
                -1 => non_residues += 1,
                _ => {}
            }
        }
        Ok(total - non_residues)
    }

    fn small_prime(&self) -> Result<u64> {
        match self.p.to_u64() {
            Some(p) if p < SEARCH_LIMIT => Ok(p),
            _ => Err(DssError::InvalidParameter(format!(
                "point counting needs p < {SEARCH_LIMIT}, got {}",
                self.p
            ))),
        }
    }
}

/// Largest prime factor by trial division
fn largest_prime_factor(mut n: u64) -> u64 {
    let mut largest = 1;
    let mut d = 2;
    while d * d <= n {
        while n % d == 0 {
            largest = d;
            n /= d;
        }
        d += 1;
    }
    if n > 1 {
        largest = n;
    }
    largest
}

/// Fixed curve parameter sets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NamedCurve {
    /// NIST P-256 (secp256r1)
    P256,
    /// SEC secp256k1
    Secp256k1,
}

impl NamedCurve {
    pub fn name(&self) -> &'static str {
        match self {
            NamedCurve::P256 => "P-256",
            NamedCurve::Secp256k1 => "secp256k1",
        }
    }
}

impl fmt::Display for NamedCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn hex_const(hex: &str) -> BigUint {
    BigUint::parse_bytes(hex.as_bytes(), 16).expect("curve constant is valid hex")
}

static P256: Lazy<CurveParams> = Lazy::new(|| {
    let p = hex_const("FFFFFFFF00000001000000000000000000000000FFFFFFFFFFFFFFFFFFFFFFFF");
    let a = &p - 3u32;
    CurveParams {
        curve: EllipticCurve {
            a,
            b: hex_const("5AC635D8AA3A93E7B3EBBD55769886BC651D06B0CC53B0F63BCE3C3E27D2604B"),
            p,
        },
        generator: Point::Affine {
            x: hex_const("6B17D1F2E12C4247F8BCE6E563A440F277037D812DEB33A0F4A13945D898C296"),
            y: hex_const("4FE342E2FE1A7F9B8EE7EB4A7C0F9E162BCE33576B315ECECBB6406837BF51F5"),
        },
        order: hex_const("FFFFFFFF00000000FFFFFFFFFFFFFFFFBCE6FAADA7179E84F3B9CAC2FC632551"),
    }
});

static SECP256K1: Lazy<CurveParams> = Lazy::new(|| CurveParams {
    curve: EllipticCurve {
        p: hex_const("FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F"),
        a: BigUint::zero(),
        b: BigUint::from(7u32),
    },
    generator: Point::Affine {
        x: hex_const("79BE667EF9DCBBAC55A06295CE870B07029BFCDB2DCE28D959F2815B16F81798"),
        y: hex_const("483ADA7726A3C4655DA4FBFC0E1108A8FD17B448A68554199C47D08FFB10D4B8"),
    },
    order: hex_const("FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141"),
});

/// A curve with a base point `G` of prime order `n`
///
/// Immutable once built. Points are plain values; every point passed to
/// these methods is expected to come from the same curve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurveParams {
    curve: EllipticCurve,
    generator: Point,
    order: BigUint,
}

impl CurveParams {
    /// Assembles caller-supplied parameters
    ///
    /// The order is trusted; only the base point is checked.
    pub fn new(curve: EllipticCurve, generator: Point, order: BigUint) -> Result<Self> {
        if generator.is_infinity() || !curve.is_on_curve(&generator) {
            return Err(DssError::InvalidParameter(format!(
                "base point {generator} is not a finite point on the curve"
            )));
        }
        if order < BigUint::from(2u32) {
            return Err(DssError::InvalidParameter(format!(
                "base point order {order} is too small"
            )));
        }
        Ok(Self {
            curve,
            generator,
            order,
        })
    }

    /// One of the fixed parameter sets
    pub fn named(curve: NamedCurve) -> &'static CurveParams {
        match curve {
            NamedCurve::P256 => &P256,
            NamedCurve::Secp256k1 => &SECP256K1,
        }
    }

    /// The fixed curve used for a requested security size
    pub fn for_bit_length(bits: usize) -> Result<&'static CurveParams> {
        if bits <= 256 {
            Ok(Self::named(NamedCurve::P256))
        } else {
            Err(DssError::InvalidParameter(format!(
                "no fixed curve for {bits}-bit keys (at most 256 supported)"
            )))
        }
    }

    /// Finds a base point of prime order on a small curve
    ///
    /// Counts the points, takes the largest prime factor `n` of the group
    /// order and its cofactor `h`, then scans `x = 0, 1, ...` for the first
    /// lifted point `P` with `hP != O`. The result is deterministic.
    ///
    /// # Errors
    /// `InvalidParameter` for singular curves, non-prime or oversized `p`,
    /// or when no point of prime order exists.
    pub fn search(p: u64, a: u64, b: u64) -> Result<Self> {
        let curve = EllipticCurve::new(BigUint::from(p), BigUint::from(a), BigUint::from(b))?;
        let points = curve.count_points()?;
        let n = largest_prime_factor(points);
        if n < 2 {
            return Err(DssError::InvalidParameter(format!(
                "curve group of order {points} has no prime-order subgroup"
            )));
        }
        let cofactor = BigUint::from(points / n);
        debug!("curve over F_{p} has {points} points, subgroup order {n}");

        for x in 0..p {
            let Some(candidate) = curve.lift_x(&BigUint::from(x)) else {
                continue;
            };
            let generator = curve.mul_unreduced(&cofactor, &candidate);
            if !generator.is_infinity() {
                return Ok(Self {
                    curve,
                    generator,
                    order: BigUint::from(n),
                });
            }
        }

        Err(DssError::InvalidParameter(format!(
            "no point of order {n} found on the curve"
        )))
    }

    pub fn curve(&self) -> &EllipticCurve {
        &self.curve
    }

    /// The base point `G`
    pub fn generator(&self) -> &Point {
        &self.generator
    }

    /// The order `n` of `G`
    pub fn order(&self) -> &BigUint {
        &self.order
    }

    /// Finite point on this curve
    pub fn contains(&self, point: &Point) -> bool {
        !point.is_infinity() && self.curve.is_on_curve(point)
    }

    /// Finite point on this curve with `nP = O`
    ///
    /// [`scalar_mul`](Self::scalar_mul) reduces scalars mod `n`, which is
    /// only sound for points in this subgroup.
    pub fn in_subgroup(&self, point: &Point) -> bool {
        self.contains(point) && self.curve.mul_unreduced(&self.order, point).is_infinity()
    }

    /// `kP` for a point in the order-`n` subgroup; `k` is reduced mod `n`
    /// first and `0` gives `O`
    pub fn scalar_mul(&self, k: &BigUint, p: &Point) -> Point {
        let k = k % &self.order;
        if k.is_zero() {
            return Point::Infinity;
        }
        self.curve.mul_unreduced(&k, p)
    }

    /// `kP` for a possibly negative `k`, normalised into `[0, n)`
    pub fn scalar_mul_signed(&self, k: &BigInt, p: &Point) -> Point {
        let n = BigInt::from(self.order.clone());
        let reduced = k.mod_floor(&n).to_biguint().unwrap_or_default();
        self.scalar_mul(&reduced, p)
    }
}

impl fmt::Display for CurveParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "y^2 = x^3 + {}x + {} mod {}, G = {}, n = {}",
            self.curve.a, self.curve.b, self.curve.p, self.generator, self.order
        )
    }
}
