use std::fmt;

/// Errors raised while building a training compliance report.
#[derive(Debug)]
pub enum ReportError {
    /// Required configuration is missing or invalid.
    Configuration(String),
    /// Network failure, timeout or non-2xx response from the training API.
    Transport(String),
    /// Response body was not a JSON list of the expected records.
    MalformedResponse(String),
    /// An upstream value did not match the expected format (e.g. a due date).
    DataFormat {
        /// The offending raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
    /// Filesystem error while writing report artifacts.
    Io(std::io::Error),
    /// CSV encoding error.
    Csv(csv::Error),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<ReportError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ReportError::Transport(msg) => write!(f, "Transport error: {}", msg),
            ReportError::MalformedResponse(msg) => write!(f, "Malformed response: {}", msg),
            ReportError::DataFormat { value, reason } => {
                write!(f, "Data format error: '{}': {}", value, reason)
            }
            ReportError::Io(e) => write!(f, "I/O error: {}", e),
            ReportError::Csv(e) => write!(f, "CSV error: {}", e),
            ReportError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Io(e) => Some(e),
            ReportError::Csv(e) => Some(e),
            ReportError::WithContext { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ReportError {
    fn from(err: reqwest::Error) -> Self {
        ReportError::Transport(err.to_string())
    }
}

impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        ReportError::Io(err)
    }
}

impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> Self {
        ReportError::Csv(err)
    }
}

impl From<serde_yaml::Error> for ReportError {
    fn from(err: serde_yaml::Error) -> Self {
        ReportError::Configuration(format!("invalid YAML: {}", err))
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context::with_context` but for our `ReportError` type.
pub trait ResultExt<T> {
    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, ReportError>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<ReportError>,
{
    fn with_context<F>(self, f: F) -> Result<T, ReportError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ReportError::WithContext {
            source: Box::new(e.into()),
            context: f(),
        })
    }
}
