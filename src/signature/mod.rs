//! Signature engines
//!
//! Both engines implement [`SignatureScheme`]. A signature has three
//! components in either setting: a commitment, a response scalar and a
//! second commitment that lets the verifier rebuild the signer's blinding
//! value.
//!
//! Random draws that hit a degenerate case (identity point, zero
//! denominator) are thrown away and redrawn. The number of redraws is
//! bounded by the engine's [`DssConfig`](crate::config::DssConfig).

pub mod elliptic_curve;
pub mod finite_field;

pub use elliptic_curve::{CurveEngine, CurveNonces, CurvePrivateKey, CurvePublicKey, CurveSignature};
pub use finite_field::{FieldNonces, FieldPrivateKey, FieldPublicKey, FieldSignature, FiniteFieldEngine};

use crate::error::{DssError, Result};
use crate::forms::HardProblem;
use crate::metrics::{Diagnostics, Meter, Metrics, OpCounts};
use log::debug;
use rand::{CryptoRng, RngCore};
use serde::Serialize;

/// Outcome of a verification call
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub valid: bool,
    /// Intermediate values and operation counts of the check
    pub diagnostics: Diagnostics,
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Common interface of the two engines
pub trait SignatureScheme {
    type PrivateKey;
    type PublicKey;
    type Signature;

    /// The hard problems this engine is built on
    fn forms(&self) -> [HardProblem; 2];

    /// Generates a key pair, creating system parameters first if needed
    ///
    /// The diagnostics cover key derivation only and hold public values.
    ///
    /// # Errors
    /// - `KeyGenerationExhausted` when every draw was degenerate
    /// - `ParameterGeneration` when missing parameters cannot be created
    fn generate_key_pair_traced_with<R: CryptoRng + RngCore + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<(Self::PrivateKey, Self::PublicKey, Diagnostics)>;

    fn generate_key_pair_with<R: CryptoRng + RngCore + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<(Self::PrivateKey, Self::PublicKey)> {
        self.generate_key_pair_traced_with(rng)
            .map(|(private_key, public_key, _)| (private_key, public_key))
    }

    fn generate_key_pair(&mut self) -> Result<(Self::PrivateKey, Self::PublicKey)> {
        self.generate_key_pair_with(&mut rand::rng())
    }

    /// Signs `message`, returning the signature and what the successful
    /// attempt computed
    ///
    /// # Errors
    /// - `UninitializedParameters` when the engine has no parameters
    /// - `InvalidParameter` for a malformed private key
    /// - `SigningExhausted` when every attempt was degenerate
    fn sign_traced_with<R: CryptoRng + RngCore + ?Sized>(
        &self,
        rng: &mut R,
        message: &[u8],
        private_key: &Self::PrivateKey,
    ) -> Result<(Self::Signature, Diagnostics)>;

    fn sign_traced(
        &self,
        message: &[u8],
        private_key: &Self::PrivateKey,
    ) -> Result<(Self::Signature, Diagnostics)> {
        self.sign_traced_with(&mut rand::rng(), message, private_key)
    }

    fn sign_with<R: CryptoRng + RngCore + ?Sized>(
        &self,
        rng: &mut R,
        message: &[u8],
        private_key: &Self::PrivateKey,
    ) -> Result<Self::Signature> {
        self.sign_traced_with(rng, message, private_key)
            .map(|(signature, _)| signature)
    }

    fn sign(&self, message: &[u8], private_key: &Self::PrivateKey) -> Result<Self::Signature> {
        self.sign_with(&mut rand::rng(), message, private_key)
    }

    /// Checks `signature` on `message` against `public_key`
    ///
    /// A malformed signature or key is reported as `valid == false`, not as
    /// an error.
    fn verify(
        &self,
        message: &[u8],
        signature: &Self::Signature,
        public_key: &Self::PublicKey,
    ) -> Result<Verification>;

    /// Cumulative operation counts for this engine
    fn metrics(&self) -> &Metrics;

    fn metrics_snapshot(&self) -> OpCounts {
        self.metrics().snapshot()
    }
}

/// Runs `attempt` until it stops reporting `DegenerateSample`
///
/// Each discarded attempt is cleared from `meter` and counted as a resample.
/// Other errors propagate at once. After `max_attempts` degenerate draws the
/// error built by `exhausted` is returned.
pub(crate) fn retry<T>(
    max_attempts: usize,
    meter: &mut Meter,
    exhausted: fn(usize) -> DssError,
    mut attempt: impl FnMut(&mut Meter) -> Result<T>,
) -> Result<T> {
    for n in 1..=max_attempts {
        match attempt(meter) {
            Ok(value) => return Ok(value),
            Err(DssError::DegenerateSample(reason)) => {
                debug!("attempt {n} discarded: {reason}");
                meter.discard();
            }
            Err(err) => return Err(err),
        }
    }
    Err(exhausted(max_attempts))
}

pub(crate) fn signing_exhausted(attempts: usize) -> DssError {
    DssError::SigningExhausted { attempts }
}

pub(crate) fn keygen_exhausted(attempts: usize) -> DssError {
    DssError::KeyGenerationExhausted { attempts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::OpKind;

    #[test]
    fn test_retry_returns_first_success() {
        let mut meter = Meter::new();
        let mut calls = 0;
        let value = retry(5, &mut meter, signing_exhausted, |m| {
            calls += 1;
            m.count(OpKind::Hash);
            if calls < 3 {
                Err(DssError::DegenerateSample("zero denominator"))
            } else {
                Ok(calls)
            }
        })
        .unwrap();

        assert_eq!(value, 3);
        let diagnostics = meter.finish();
        assert_eq!(diagnostics.ops.hashes, 1);
        assert_eq!(diagnostics.ops.resamples, 2);
    }

    #[test]
    fn test_retry_exhausts() {
        let mut meter = Meter::new();
        let result: Result<()> = retry(4, &mut meter, keygen_exhausted, |_| {
            Err(DssError::DegenerateSample("identity"))
        });
        assert_eq!(result, Err(DssError::KeyGenerationExhausted { attempts: 4 }));
    }

    #[test]
    fn test_retry_propagates_other_errors() {
        let mut meter = Meter::new();
        let mut calls = 0;
        let result: Result<()> = retry(10, &mut meter, signing_exhausted, |_| {
            calls += 1;
            Err(DssError::UninitializedParameters)
        });
        assert_eq!(result, Err(DssError::UninitializedParameters));
        assert_eq!(calls, 1);
    }
}
