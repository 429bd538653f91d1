use thiserror::Error;

/// Errors reported by layers, networks and the dataset loader.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// A vector or layer did not have the size the operation required.
    #[error("dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    /// Empty layer, or weights and biases that disagree on the output size.
    #[error("invalid layer: {0}")]
    InvalidLayer(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NetworkError>;

/// Returns `DimensionMismatch` unless `found == expected`.
pub(crate) fn check_len(context: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(NetworkError::DimensionMismatch { context, expected, found })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_len_reports_both_sizes() {
        assert!(check_len("input", 3, 3).is_ok());
        let err = check_len("input", 3, 4).unwrap_err();
        assert_eq!(
            err.to_string(),
            "dimension mismatch in input: expected 3, found 4"
        );
    }
}
