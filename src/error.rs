//! Error types for plotlab
//!
//! Every fallible library operation returns [`LabResult`]. The variants follow
//! the places a request can go wrong:
//! - request validation (`Configuration`)
//! - dataset lookup and loading (`UnknownDataset`, `Data`)
//! - empty data after filtering (`EmptyInput`)
//! - listing syntax (`Parse`)
//! - drawing and encoding (`Render`)
//! - archive writing (`Export`)

use thiserror::Error;

/// Main error type for plotlab operations
#[derive(Error, Debug)]
pub enum LabError {
    /// A request references a missing or wrong-typed column, or an option is out of range
    #[error("Invalid configuration for '{field}': {message}")]
    Configuration { field: String, message: String },

    /// Dataset name not present in the catalog
    #[error("Unknown dataset '{name}' (available: {})", available.join(", "))]
    UnknownDataset { name: String, available: Vec<String> },

    /// Nothing left to draw or export
    #[error("No data to {context}")]
    EmptyInput { context: String },

    /// Listing could not be parsed
    #[error("Listing parse error: {0}")]
    Parse(String),

    /// CSV/JSON loading failures
    #[error("Data error: {0}")]
    Data(String),

    /// Drawing or PNG encoding failures
    #[error("Rendering failed: {0}")]
    Render(String),

    /// Archive writing failures
    #[error("Export failed: {0}")]
    Export(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LabError {
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        LabError::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn empty(context: impl Into<String>) -> Self {
        LabError::EmptyInput {
            context: context.into(),
        }
    }

    /// Short inline message suitable for showing next to the control that caused it
    pub fn user_message(&self) -> String {
        match self {
            LabError::Configuration { field, message } => format!("{}: {}", field, message),
            LabError::UnknownDataset { name, .. } => format!("Dataset '{}' is not available", name),
            LabError::EmptyInput { context } => format!("Nothing to {}", context),
            other => other.to_string(),
        }
    }

    /// True for errors caused by the request rather than the environment
    pub fn is_configuration(&self) -> bool {
        matches!(self, LabError::Configuration { .. } | LabError::Parse(_))
    }
}

impl From<csv::Error> for LabError {
    fn from(err: csv::Error) -> Self {
        LabError::Data(err.to_string())
    }
}

impl From<zip::result::ZipError> for LabError {
    fn from(err: zip::result::ZipError) -> Self {
        LabError::Export(err.to_string())
    }
}

/// Result type alias for plotlab operations
pub type LabResult<T> = Result<T, LabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_display_names_field() {
        let err = LabError::config("hue", "column 'g' not found");
        assert!(err.to_string().contains("'hue'"));
        assert!(err.to_string().contains("column 'g' not found"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unknown_dataset_lists_catalog() {
        let err = LabError::UnknownDataset {
            name: "Planets".to_string(),
            available: vec!["Iris".to_string(), "Flights".to_string()],
        };
        assert!(err.to_string().contains("Iris, Flights"));
        assert_eq!(err.user_message(), "Dataset 'Planets' is not available");
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_empty_input_message() {
        let err = LabError::empty("render");
        assert_eq!(err.to_string(), "No data to render");
    }
}
