//! Error types shared by the primitives and both signature engines

use num_bigint::BigUint;

/// Everything that can go wrong in parameter generation, key generation,
/// signing or verification.
///
/// Degenerate random draws are handled inside the engines; only exhausted
/// retry budgets and missing preconditions reach the caller.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum DssError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("{value} has no inverse modulo {modulus}")]
    NoInverse { value: BigUint, modulus: BigUint },
    #[error("degenerate sample: {0}")]
    DegenerateSample(&'static str),
    #[error("signing gave up after {attempts} degenerate attempts")]
    SigningExhausted { attempts: usize },
    #[error("key generation gave up after {attempts} degenerate attempts")]
    KeyGenerationExhausted { attempts: usize },
    #[error("parameters have not been generated or supplied")]
    UninitializedParameters,
    #[error("no {bit_length}-bit prime p = k*q + 1 found in {attempts} candidates")]
    ParameterGeneration { bit_length: usize, attempts: usize },
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for DssError {
    fn from(err: serde_json::Error) -> Self {
        DssError::Config(err.to_string())
    }
}

impl From<std::io::Error> for DssError {
    fn from(err: std::io::Error) -> Self {
        DssError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DssError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = DssError::NoInverse {
            value: BigUint::from(6u32),
            modulus: BigUint::from(9u32),
        };
        assert_eq!(err.to_string(), "6 has no inverse modulo 9");

        let err = DssError::SigningExhausted { attempts: 100 };
        assert_eq!(
            err.to_string(),
            "signing gave up after 100 degenerate attempts"
        );
    }

    #[test]
    fn test_json_error_maps_to_config() {
        let err: DssError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, DssError::Config(_)));
    }
}
