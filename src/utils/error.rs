use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Failed to build {table} record from {record} (field '{field}'): {source}")]
    Construction {
        table: String,
        record: String,
        field: String,
        #[source]
        source: Box<MigrationError>,
    },

    #[error("Missing field: {path}")]
    MissingField { path: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Constraint violation on {table}.{field}: duplicate value {value}")]
    ConstraintViolation {
        table: String,
        field: String,
        value: String,
    },

    #[error("Table not found: {table}")]
    TableNotFound { table: String },

    #[error("Table already exists: {table}")]
    TableExists { table: String },

    #[error("No row in {table} with {key} = {value}")]
    RecordNotFound {
        table: String,
        key: String,
        value: String,
    },

    #[error("Migration '{name}' is already applied")]
    AlreadyApplied { name: String },

    #[error("Migration '{name}' is not applied")]
    NotApplied { name: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV report error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Data,
    Store,
    State,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MigrationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Construction { .. } | Self::MissingField { .. } | Self::InvalidValue { .. } => {
                ErrorCategory::Data
            }
            Self::ConstraintViolation { .. }
            | Self::TableNotFound { .. }
            | Self::TableExists { .. }
            | Self::RecordNotFound { .. } => ErrorCategory::Store,
            Self::AlreadyApplied { .. } | Self::NotApplied { .. } => ErrorCategory::State,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) | Self::SerializationError(_) | Self::CsvError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // Nothing was changed; the store is already where the caller asked for.
            ErrorCategory::State => ErrorSeverity::Low,
            ErrorCategory::Configuration => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Store => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Construction {
                table, record, field, ..
            } => format!(
                "Could not build a {} row for source record {} (field '{}'). Nothing was written.",
                table, record, field
            ),
            Self::ConstraintViolation { table, field, value } => format!(
                "Writing {} would duplicate {} = {}. Nothing was written.",
                table, field, value
            ),
            Self::AlreadyApplied { name } => format!("Migration {} has already been applied", name),
            Self::NotApplied { name } => format!("Migration {} has not been applied", name),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Data => "Inspect the reported source record and fix its data before re-running",
            ErrorCategory::Store => "Check that the store snapshot matches the schema this migration expects",
            ErrorCategory::State => "Run `status` to see which direction can be executed",
            ErrorCategory::Configuration => "Check the configuration file and command line flags",
            ErrorCategory::System => "Check file permissions and that the store file is valid JSON",
        }
    }
}

pub type Result<T> = std::result::Result<T, MigrationError>;
