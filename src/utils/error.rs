use thiserror::Error;

#[derive(Error, Debug)]
pub enum RebateError {
    #[error("Ordered units request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

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

    #[error("Ordered units source error: {message}")]
    SourceError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Source,
    Io,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RebateError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RebateError::ConfigValidationError { .. }
            | RebateError::InvalidConfigValueError { .. }
            | RebateError::MissingConfigError { .. } => ErrorCategory::Configuration,
            RebateError::ApiError(_) | RebateError::SourceError { .. } => ErrorCategory::Source,
            RebateError::IoError(_) => ErrorCategory::Io,
            RebateError::CsvError(_) | RebateError::SerializationError(_) => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 聚合服務可能只是暫時無法連線，可重試
            ErrorCategory::Source => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            RebateError::ApiError(_) => {
                "Check that the aggregation endpoint is reachable and retry"
            }
            RebateError::SourceError { .. } => {
                "Verify the ordered units source settings in the [source] section"
            }
            RebateError::CsvError(_) => {
                "Make sure the orders CSV has article_id,quantity,delivery_date columns"
            }
            RebateError::IoError(_) => "Check that the file exists and is readable",
            RebateError::SerializationError(_) => {
                "The aggregation service returned an unexpected payload"
            }
            RebateError::ConfigValidationError { .. }
            | RebateError::InvalidConfigValueError { .. } => {
                "Fix the highlighted field in the agreement file"
            }
            RebateError::MissingConfigError { .. } => {
                "Add the missing field to the agreement file or pass it on the command line"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            RebateError::ApiError(_) | RebateError::SourceError { .. } => {
                format!("Could not load ordered quantities: {}", self)
            }
            RebateError::ConfigValidationError { .. }
            | RebateError::InvalidConfigValueError { .. }
            | RebateError::MissingConfigError { .. } => {
                format!("Agreement configuration is invalid: {}", self)
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RebateError>;
