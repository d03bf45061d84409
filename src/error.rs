use thiserror::Error;

/// Every failure the predictor can report.  Nothing is retried; callers get
/// the first error and the pipeline stops there.
#[derive(Debug, Error)]
pub enum TitanicError {
    /// Input file missing, unreadable, or not shaped like the passenger schema.
    #[error("data format error: {0}")]
    DataFormat(String),

    /// The logistic-regression fit failed or produced unusable parameters.
    #[error("training failed: {0}")]
    Training(String),

    /// Invalid cross-validation configuration.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Model file could not be written, read or decoded.
    #[error("model persistence error: {0}")]
    Persistence(String),

    /// Pipeline config file missing or malformed.
    #[error("config error: {0}")]
    Config(String),

    /// A nominal value outside the declared levels of an attribute.
    #[error("value '{value}' is not a level of attribute '{attribute}' (expected one of {expected:?})")]
    SchemaMismatch {
        attribute: &'static str,
        value: String,
        expected: &'static [&'static str],
    },
}

impl TitanicError {
    pub(crate) fn data(msg: impl Into<String>) -> Self {
        TitanicError::DataFormat(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, TitanicError>;
