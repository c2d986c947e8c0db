use thiserror::Error as ThisError;

/// Main error type for the library.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The correspondence set has no pairs, so there is nothing to fit.
    #[error("correspondence set is empty")]
    EmptyCorrespondenceSet,
    /// Used when the user pass an index, array shape or parameter that is logically invalid.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A per-point attribute required by the estimator is absent.
    #[error("{cloud} point cloud is missing {attribute}")]
    MissingAttribute {
        cloud: &'static str,
        attribute: &'static str,
    },
    /// The accumulated system is rank-deficient beyond tolerance.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Create a error with the kind `InvalidInput`.
    /// # Arguments
    /// * `msg` - The error message.
    pub fn invalid_input<T: ToString>(msg: T) -> Self {
        Error::InvalidInput(msg.to_string())
    }

    /// Create a error with the kind `DegenerateGeometry`.
    pub fn degenerate<T: ToString>(msg: T) -> Self {
        Error::DegenerateGeometry(msg.to_string())
    }

    pub fn missing(cloud: &'static str, attribute: &'static str) -> Self {
        Error::MissingAttribute { cloud, attribute }
    }
}
