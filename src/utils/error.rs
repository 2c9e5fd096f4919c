use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("File not found: {path}")]
    SourceNotFound { path: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Schema error: {message}")]
    SchemaError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Database connection failed: {message}")]
    ConnectionError { message: String },

    #[error("Failed to write table '{table}': {message}")]
    WriteError { table: String, message: String },

    #[error("Table '{table}' already exists")]
    TableExists { table: String },

    #[error("Verification of table '{table}' failed: {message}")]
    VerificationError { table: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Extract,
    Transform,
    Load,
    Configuration,
    Internal,
}

impl EtlError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaError {
            message: message.into(),
        }
    }

    pub fn connection(err: impl std::fmt::Display) -> Self {
        Self::ConnectionError {
            message: err.to_string(),
        }
    }

    pub fn write(table: &str, err: impl std::fmt::Display) -> Self {
        Self::WriteError {
            table: table.to_string(),
            message: err.to_string(),
        }
    }

    pub fn verification(table: &str, err: impl std::fmt::Display) -> Self {
        Self::VerificationError {
            table: table.to_string(),
            message: err.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::SourceNotFound { .. } | Self::CsvError(_) | Self::IoError(_) => {
                ErrorCategory::Extract
            }
            Self::SchemaError { .. } => ErrorCategory::Transform,
            Self::ConnectionError { .. }
            | Self::WriteError { .. }
            | Self::TableExists { .. }
            | Self::VerificationError { .. } => ErrorCategory::Load,
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::SerializationError(_) | Self::ProcessingError { .. } => ErrorCategory::Internal,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::SourceNotFound { .. } => "Check the source path and that the file is readable",
            Self::CsvError(_) => "Make sure every record has the same number of fields as the header",
            Self::IoError(_) => "Check file permissions and available disk space",
            Self::SchemaError { .. } => "Make sure the CSV header contains the expected HR columns",
            Self::ConnectionError { .. } => {
                "Check SUPABASE_HOST, SUPABASE_PORT and the credentials in the environment"
            }
            Self::WriteError { .. } => "Check that the database user may create and write the table",
            Self::TableExists { .. } => "Use the replace or append policy, or pick another table name",
            Self::VerificationError { .. } => "Query the table manually to confirm the load",
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => "Fix the configuration and run again",
            Self::SerializationError(_) | Self::ProcessingError { .. } => "Re-run with RUST_LOG=debug",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Extract => format!("Could not read the source data: {}", self),
            ErrorCategory::Transform => format!("Could not clean the data: {}", self),
            ErrorCategory::Load => format!("Could not load the data: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Internal => format!("Unexpected failure: {}", self),
        }
    }
}
