//! Digital Signatures on Transcendental Hard Problems
//!
//! This library provides two signature engines:
//! 1. A finite-field engine whose secret `x` is both base and exponent of the
//!    public key `y = x^(-x) mod p` (forms 1.1 and 1.2)
//! 2. An elliptic-curve engine whose secret is a generator point `G_s` with
//!    public key `P = (-x_G)·G_s` (forms 2.1 and 2.2)
//!
//! Both are built on the modular and curve primitives exported here and
//! report per-call operation counts and intermediate values.
//!
//! These hard problems are research constructs. Nothing here is meant to
//! protect real data.

/// Engine configuration loaded from JSON
pub mod config;
/// Elliptic curves over prime fields and fixed curve parameters
pub mod elliptic_curve;
/// Error taxonomy shared by every module
pub mod error;
/// Descriptors and brute-force demonstrations of the hard problems
pub mod forms;
/// Hash-to-scalar over canonical encodings
pub mod hash;
/// Operation counters and intermediate-value traces
pub mod metrics;
/// Modular arithmetic, primality and sampling
pub mod modular;
/// Finite-field system parameters
pub mod params;
/// The two signature engines
pub mod signature;

pub use config::DssConfig;
pub use elliptic_curve::{CurveParams, EllipticCurve, NamedCurve, Point};
pub use error::{DssError, Result};
pub use forms::HardProblem;
pub use metrics::{Diagnostics, Metrics, OpCounts, OpKind};
pub use params::FieldParams;
pub use signature::{
    CurveEngine, CurveNonces, CurvePrivateKey, CurvePublicKey, CurveSignature, FieldNonces,
    FieldPrivateKey, FieldPublicKey, FieldSignature, FiniteFieldEngine, SignatureScheme,
    Verification,
};
