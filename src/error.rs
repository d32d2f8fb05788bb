use thiserror::Error;

pub type GymResult<T> = Result<T, GymError>;

#[derive(Debug, Error)]
pub enum GymError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Io(#[from] IoError),
}

/// Errors related to loading the price series and deriving the feature table.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Price series is empty")]
    EmptySeries,

    #[error("Missing column '{0}' in price series")]
    MissingColumn(String),

    #[error("Unsupported dtype '{dtype}' for column '{column}'")]
    UnsupportedDtype { column: String, dtype: String },

    #[error("Invalid close price at row {row}: {msg}")]
    InvalidClose { row: usize, msg: String },

    #[error("Invalid timestamp at row {row}: {msg}")]
    InvalidTimestamp { row: usize, msg: String },

    #[error("Duplicate timestamp {0} in price series")]
    DuplicateTimestamp(String),

    #[error("Data frame error: {0}")]
    DataFrame(String),

    #[error("Failed to parse feature column: {0}")]
    ParseColumn(#[from] strum::ParseError),
}

/// Errors related to environment configuration and the reset/step loop.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("Invalid environment configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid action index {0}: expected one of 0 (short), 1 (flat), 2 (long)")]
    InvalidAction(usize),

    #[error(
        "Episode exhausted at idx {idx} (episode length {episode_len}). Call `reset()` before stepping."
    )]
    EpisodeExhausted { idx: usize, episode_len: usize },

    #[error("Invalid episode start {start}: a window of {len} rows does not fit into {rows} rows")]
    InvalidStart { start: usize, len: usize, rows: usize },

    #[error("Action count {actions} does not match environment count {envs}")]
    ActionCountMismatch { actions: usize, envs: usize },
}

/// Errors related to file I/O and serialization.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("IO operation failed")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read data: {0}")]
    ReadFailed(String),
}

pub(crate) fn polars_to_gym_error(context: &str, e: polars::error::PolarsError) -> GymError {
    GymError::Data(DataError::DataFrame(format!("{context}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_errors_display_transparently() {
        let err: GymError = EnvError::InvalidAction(5).into();
        assert_eq!(
            err.to_string(),
            "Invalid action index 5: expected one of 0 (short), 1 (flat), 2 (long)"
        );

        let err: GymError = DataError::MissingColumn("close".to_string()).into();
        assert!(matches!(err, GymError::Data(DataError::MissingColumn(_))));
    }
}
