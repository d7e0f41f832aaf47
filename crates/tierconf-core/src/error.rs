//! Error types for tierconf
//!
//! Every failure carries an [`ErrorKind`] plus optional context: the file or
//! config path involved, the underlying cause, and an actionable help line.

use std::fmt;

/// Result type alias for tierconf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tierconf operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// File path or dotted config path the error relates to
    pub path: Option<String>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// A configuration file does not exist
    #[error("File not found")]
    FileNotFound,
    /// File extension or format name is not one of json/toml/yaml/yml/ini
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },
    /// Parser syntax failure
    #[error("Malformed {format} input")]
    MalformedInput { format: String },
    /// A key or value cannot be written in the target format
    #[error("Cannot encode value as {format}")]
    Unencodable { format: String },
    /// A required schema property is absent
    #[error("Missing required property: {property}")]
    MissingRequiredProperty { property: String },
    /// A schema validator predicate returned false
    #[error("Validator '{validator}' failed for property: {property}")]
    ValidatorFailed { property: String, validator: String },
    /// Wrapper used by the import/export operations
    #[error("Configuration error")]
    Configuration,
    /// Reading or writing a file failed
    #[error("I/O error")]
    Io,
    /// Internal error (bug in tierconf)
    #[error("Internal error")]
    Internal,
}

impl Error {
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            path: None,
            help: None,
            cause: None,
        }
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            help: Some("Check that the file exists and the path is spelled correctly".into()),
            ..Self::new(ErrorKind::FileNotFound)
        }
    }

    /// Create an unsupported format error
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self {
            help: Some("Use one of: json, toml, yaml, yml, ini".into()),
            ..Self::new(ErrorKind::UnsupportedFormat {
                format: format.into(),
            })
        }
    }

    /// Create a malformed input error, keeping the parser diagnostic as cause
    pub fn malformed(format: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            cause: Some(diagnostic.into()),
            ..Self::new(ErrorKind::MalformedInput {
                format: format.into(),
            })
        }
    }

    /// Create an encoding error; `path` should name the offending key
    pub fn unencodable(format: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            cause: Some(detail.into()),
            help: Some("Rename the key or pick a format that can represent the value, such as json".into()),
            ..Self::new(ErrorKind::Unencodable {
                format: format.into(),
            })
        }
    }

    /// Create a missing required property error
    pub fn missing_required(property: impl Into<String>) -> Self {
        let property = property.into();
        Self {
            help: Some(format!("Add '{}' to the configuration", property)),
            ..Self::new(ErrorKind::MissingRequiredProperty { property })
        }
    }

    /// Create a validator failure error
    pub fn validator_failed(property: impl Into<String>, validator: impl Into<String>) -> Self {
        let property = property.into();
        Self {
            path: Some(property.clone()),
            help: Some("Fix the value to match the schema requirements".into()),
            ..Self::new(ErrorKind::ValidatorFailed {
                property,
                validator: validator.into(),
            })
        }
    }

    /// Wrap an underlying failure as a configuration error for `path`
    pub fn configuration(path: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            path: Some(path.into()),
            cause: detail,
            ..Self::new(ErrorKind::Configuration)
        }
    }

    /// Create an I/O error
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        Self {
            path: Some(path.into()),
            cause: Some(err.to_string()),
            ..Self::new(ErrorKind::Io)
        }
    }

    /// Create an internal error (bug in tierconf)
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            help: Some("This is likely a bug in tierconf. Please report it.".into()),
            cause: Some(message.into()),
            ..Self::new(ErrorKind::Internal)
        }
    }

    /// Add path context to the error
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// True for the two schema failure kinds
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::MissingRequiredProperty { .. } | ErrorKind::ValidatorFailed { .. }
        )
    }

    /// Headline plus cause on one line, without path or help
    pub fn summary(&self) -> String {
        match &self.cause {
            Some(cause) => format!("{}: {}", self.kind, cause),
            None => self.kind.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(path) = &self.path {
            write!(f, "\n  Path: {}", path)?;
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}
