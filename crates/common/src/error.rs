//! Error types shared across csvtoxml crates.

use std::path::PathBuf;

/// Top-level error type for a conversion run.
///
/// Row numbers are 1-based and count data records, so the first record
/// after the CSV header is row 1.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Row {row}, {field}: malformed timecode '{value}' ({reason})")]
    MalformedTimecode {
        row: usize,
        field: String,
        value: String,
        reason: String,
    },

    #[error("Row {row}: out point {out_point} is before in point {in_point}")]
    InvalidRange {
        row: usize,
        in_point: String,
        out_point: String,
    },

    #[error("Row {row}: missing required field '{field}'")]
    MissingRequiredField { row: usize, field: String },

    #[error("Row {row}: unknown color '{value}'")]
    UnknownColor { row: usize, value: String },

    #[error("Row {row}: media source '{name}' is not declared in the template")]
    UnknownMediaSource { row: usize, name: String },

    #[error("Row {row}: incompatible frame rate: {message}")]
    IncompatibleFrameRate { row: usize, message: String },

    #[error("Template error: {message}")]
    TemplateStructure { message: String },

    #[error("CSV is missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("CSV error: {message}")]
    Csv { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ConvertError.
pub type ConvertResult<T> = Result<T, ConvertError>;

impl ConvertError {
    pub fn template(msg: impl Into<String>) -> Self {
        Self::TemplateStructure {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn csv(msg: impl Into<String>) -> Self {
        Self::Csv {
            message: msg.into(),
        }
    }

    pub fn missing_field(row: usize, field: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            row,
            field: field.into(),
        }
    }

    /// The CSV row this error points at, when it is row-scoped.
    pub fn row(&self) -> Option<usize> {
        match self {
            Self::MalformedTimecode { row, .. }
            | Self::InvalidRange { row, .. }
            | Self::MissingRequiredField { row, .. }
            | Self::UnknownColor { row, .. }
            | Self::UnknownMediaSource { row, .. }
            | Self::IncompatibleFrameRate { row, .. } => Some(*row),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_scoped_errors_report_row() {
        let err = ConvertError::UnknownColor {
            row: 4,
            value: "Pink".to_string(),
        };
        assert_eq!(err.row(), Some(4));
        assert_eq!(err.to_string(), "Row 4: unknown color 'Pink'");

        assert_eq!(ConvertError::template("no sequence").row(), None);
    }

    #[test]
    fn test_missing_field_message_names_field() {
        let err = ConvertError::missing_field(2, "out point");
        assert_eq!(err.to_string(), "Row 2: missing required field 'out point'");
    }
}
