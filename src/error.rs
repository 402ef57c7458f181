use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type shared by configuration, kernels and the run loop.
///
/// Shape and value checks fail eagerly at the setter that received the bad input.
/// Cross-references between registries and the species table fail when the context is
/// configured. Runtime failures abort a run and leave the last completed step intact.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or inconsistent configuration (bad vector shape, unknown species,
    /// negative thermal energy, duplicate pair potential, ...).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Requested kernel name is not present in the kernel registry.
    #[error("kernel not found: {0}")]
    KernelNotFound(String),

    /// Operation is not allowed in the simulation's current state.
    #[error("run precondition violated: {0}")]
    RunPrecondition(String),

    /// Non-finite particle state or a failing user-supplied potential.
    #[error("numerical divergence: {0}")]
    NumericalDivergence(String),

    /// Propagated I/O errors (reading configuration documents).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed configuration documents.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::InvalidConfiguration(message.into())
    }

    pub(crate) fn divergence(message: impl Into<String>) -> Self {
        Error::NumericalDivergence(message.into())
    }

    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        Error::RunPrecondition(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_informative() {
        let e = Error::config("box_size must have length 3");
        let msg = format!("{e}");
        assert!(msg.contains("invalid configuration"));
        assert!(msg.contains("box_size"));
    }

    #[test]
    fn kernel_not_found_names_the_kernel() {
        let e = Error::KernelNotFound("GPU".into());
        assert_eq!(e.to_string(), "kernel not found: GPU");
    }

    #[test]
    fn result_type_alias_compiles() -> Result<()> {
        Ok(())
    }
}
