//! Error taxonomy for primer design and specificity screening.
//!
//! Only the two external-service boundaries, input parsing and parameter
//! validation produce errors. Classification and formatting are infallible.
//! An empty primer list is **not** an error; see
//! [`crate::pipeline::ScreenOutcome::NoPrimers`].

use thiserror::Error;

/// Result type alias for ampliscreen operations.
pub type Result<T> = std::result::Result<T, ScreenError>;

/// Error type for ampliscreen operations.
#[derive(Error, Debug)]
pub enum ScreenError {
    /// A request parameter is malformed or outside its accepted range.
    #[error("Invalid value ({value}) provided for {parameter} parameter: {reason}")]
    Validation {
        /// Human-readable parameter name (e.g. "melting temperature").
        parameter: String,
        /// The rejected value as supplied.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The primer design service could not be run or reported a failure.
    #[error("primer design failed: {0}")]
    DesignService(String),

    /// The primer design service answered, but the answer is inconsistent.
    #[error("malformed primer design response: {0}")]
    MalformedDesignResponse(String),

    /// The alignment search failed for an amplicon; carries the tool diagnostic.
    #[error("alignment search failed: {0}")]
    SearchService(String),

    /// The alignment search output could not be parsed.
    #[error("could not parse alignment search output: {0}")]
    SearchOutput(String),

    /// The local worker pool for per-pair screening could not be started.
    #[error("cannot start worker pool: {0}")]
    WorkerPool(String),

    /// The submitted sequence is not a single valid FASTA record.
    #[error("invalid sequence input: {0}")]
    Sequence(String),

    /// Settings could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ScreenError {
    /// Build a [`ScreenError::Validation`] from displayable parts.
    pub fn invalid(parameter: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        ScreenError::Validation {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<quick_xml::DeError> for ScreenError {
    fn from(err: quick_xml::DeError) -> Self {
        ScreenError::SearchOutput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_names_parameter_and_value() {
        let err = ScreenError::invalid("subunit length", 30, "Outside range 15-25");
        let msg = err.to_string();
        assert_eq!(msg, "Invalid value (30) provided for subunit length parameter: Outside range 15-25");
    }

    #[test]
    fn search_failure_carries_tool_diagnostic_verbatim() {
        let err = ScreenError::SearchService("BLAST Database error: No alias or index file found".into());
        assert!(err.to_string().contains("No alias or index file found"));
    }

    #[test]
    fn worker_pool_failure_is_not_a_search_failure() {
        let err = ScreenError::WorkerPool("Resource temporarily unavailable".into());
        assert_eq!(err.to_string(), "cannot start worker pool: Resource temporarily unavailable");
        assert!(!matches!(err, ScreenError::SearchService(_)));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ScreenError = io.into();
        assert!(matches!(err, ScreenError::Io(_)));
    }
}
