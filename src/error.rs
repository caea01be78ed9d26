//! Error type shared across encoding, decoding, solving and verification.

/// Error type for scheduling operations.
#[derive(Debug)]
pub enum Error {
    /// An (entity, slot) pair or flat variable index is outside the problem.
    Domain(String),
    /// The problem configuration is unusable (zero-sized axes, bad buckets,
    /// mismatched weight vectors, impossible capacities).
    Configuration(String),
    /// The sampler backend could not produce a result.
    SolverUnavailable(String),
    /// A sampler result does not fit the problem it was requested for.
    Decode(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Domain(msg) => write!(f, "Domain error: {}", msg),
            Error::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            Error::SolverUnavailable(msg) => write!(f, "Solver unavailable: {}", msg),
            Error::Decode(msg) => write!(f, "Decode error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_category_and_message() {
        let err = Error::Domain("entity 7 out of range".into());
        assert_eq!(err.to_string(), "Domain error: entity 7 out of range");

        let err = Error::SolverUnavailable("connection refused".into());
        assert!(err.to_string().starts_with("Solver unavailable"));
    }
}
