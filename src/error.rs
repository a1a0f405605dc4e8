use std::fmt::{self, Debug, Display};
use std::io;

use crate::population::PersonId;

/// Provides `SimError` and maps other errors to convert to a `SimError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum SimError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    /// A configured parameter is out of range. Raised when a model is built, never while sampling.
    InvalidParameter(String),
    /// A viral load curve was sampled with a peak of exactly zero.
    ZeroPeakHeight {
        age: f64,
    },
    UnknownPerson(PersonId),
    ReportError(String),
    SimError(String),
}

impl From<io::Error> for SimError {
    fn from(error: io::Error) -> Self {
        SimError::IoError(error)
    }
}

impl From<serde_json::Error> for SimError {
    fn from(error: serde_json::Error) -> Self {
        SimError::JsonError(error)
    }
}

impl From<csv::Error> for SimError {
    fn from(error: csv::Error) -> Self {
        SimError::CsvError(error)
    }
}

impl From<String> for SimError {
    fn from(error: String) -> Self {
        SimError::SimError(error)
    }
}

impl From<&str> for SimError {
    fn from(error: &str) -> Self {
        SimError::SimError(error.to_string())
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::IoError(error) => Some(error),
            SimError::JsonError(error) => Some(error),
            SimError::CsvError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimError::InvalidParameter(message) => write!(f, "Invalid parameter: {message}"),
            SimError::ZeroPeakHeight { age } => {
                write!(f, "Viral load peak of 0 sampled (age: {age})")
            }
            SimError::UnknownPerson(person_id) => write!(f, "Unknown person: {person_id}"),
            SimError::ReportError(message) => write!(f, "Report error: {message}"),
            _ => write!(f, "Error: {self:?}"),
        }
    }
}

/// Returns `Err(SimError::InvalidParameter)` with the given message unless `condition` holds.
pub(crate) fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), SimError> {
    if condition {
        Ok(())
    } else {
        Err(SimError::InvalidParameter(message()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_from_strings() {
        let error: SimError = "boom".into();
        assert!(matches!(error, SimError::SimError(ref message) if message == "boom"));
        let error: SimError = String::from("bang").into();
        assert!(matches!(error, SimError::SimError(ref message) if message == "bang"));
    }

    #[test]
    fn ensure_reports_message() {
        assert!(ensure(true, || "unused".to_string()).is_ok());
        let error = ensure(false, || "scale must be positive".to_string()).unwrap_err();
        assert_eq!(error.to_string(), "Invalid parameter: scale must be positive");
    }

    #[test]
    fn io_errors_keep_their_source() {
        use std::error::Error;
        let error: SimError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(error.source().is_some());
    }
}
