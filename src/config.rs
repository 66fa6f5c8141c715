//! Engine configuration
//!
//! `DssConfig` collects the sizes and retry budgets used by parameter
//! generation, key generation and signing. Every field has a default so a
//! partial JSON document is enough to override a single knob.

use crate::error::{DssError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default size of the finite-field prime `p` in bits.
pub const DEFAULT_BIT_LENGTH: usize = 512;
/// Lower bound on the size of the subgroup order `q` in bits.
pub const DEFAULT_MIN_SUBGROUP_BITS: usize = 160;
/// Miller-Rabin rounds; a composite survives with probability at most 4^-rounds.
pub const DEFAULT_MILLER_RABIN_ROUNDS: usize = 40;
pub const DEFAULT_MAX_SIGNING_ATTEMPTS: usize = 100;
pub const DEFAULT_MAX_KEYGEN_ATTEMPTS: usize = 100;
pub const DEFAULT_MAX_PARAMETER_ATTEMPTS: usize = 100_000;

/// Sizes and retry caps for both engines
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DssConfig {
    /// Bit length of `p` for generated finite-field parameters
    pub bit_length: usize,
    /// `q` gets `max(min_subgroup_bits, bit_length / 4)` bits
    pub min_subgroup_bits: usize,
    pub miller_rabin_rounds: usize,
    /// Attempts before signing fails with `SigningExhausted`
    pub max_signing_attempts: usize,
    /// Attempts before key generation falls back or fails
    pub max_keygen_attempts: usize,
    /// Candidates `k` tried while searching for `p = k*q + 1`
    pub max_parameter_attempts: usize,
}

impl Default for DssConfig {
    fn default() -> Self {
        Self {
            bit_length: DEFAULT_BIT_LENGTH,
            min_subgroup_bits: DEFAULT_MIN_SUBGROUP_BITS,
            miller_rabin_rounds: DEFAULT_MILLER_RABIN_ROUNDS,
            max_signing_attempts: DEFAULT_MAX_SIGNING_ATTEMPTS,
            max_keygen_attempts: DEFAULT_MAX_KEYGEN_ATTEMPTS,
            max_parameter_attempts: DEFAULT_MAX_PARAMETER_ATTEMPTS,
        }
    }
}

impl DssConfig {
    /// Parses and validates a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn with_bit_length(mut self, bit_length: usize) -> Self {
        self.bit_length = bit_length;
        self
    }

    pub fn with_min_subgroup_bits(mut self, bits: usize) -> Self {
        self.min_subgroup_bits = bits;
        self
    }

    pub fn with_max_signing_attempts(mut self, attempts: usize) -> Self {
        self.max_signing_attempts = attempts;
        self
    }

    /// Bit length of the subgroup order `q` for a given `p` size
    pub fn subgroup_bits(&self, bit_length: usize) -> usize {
        self.min_subgroup_bits.max(bit_length / 4)
    }

    /// Checks that every cap is non-zero and that `bit_length` leaves room
    /// for a cofactor `k >= 2` in `p = k*q + 1`.
    pub fn validate(&self) -> Result<()> {
        if self.miller_rabin_rounds == 0 {
            return Err(DssError::InvalidParameter(
                "miller_rabin_rounds must be at least 1".into(),
            ));
        }
        if self.max_signing_attempts == 0
            || self.max_keygen_attempts == 0
            || self.max_parameter_attempts == 0
        {
            return Err(DssError::InvalidParameter(
                "retry caps must be at least 1".into(),
            ));
        }
        if self.min_subgroup_bits < 2 {
            return Err(DssError::InvalidParameter(
                "min_subgroup_bits must be at least 2".into(),
            ));
        }
        self.check_bit_length(self.bit_length)
    }

    pub(crate) fn check_bit_length(&self, bit_length: usize) -> Result<()> {
        let q_bits = self.subgroup_bits(bit_length);
        if bit_length < q_bits + 2 {
            return Err(DssError::InvalidParameter(format!(
                "bit length {bit_length} leaves no room above a {q_bits}-bit subgroup order"
            )));
        }
        Ok(())
    }
}
