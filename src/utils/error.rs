use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeriesError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

/// 錯誤嚴重程度，決定 CLI 的退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl SeriesError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SeriesError::IoError(_) => ErrorSeverity::Critical,
            SeriesError::SerializationError(_) | SeriesError::CsvError(_) => ErrorSeverity::High,
            SeriesError::ProcessingError { .. } => ErrorSeverity::High,
            _ => ErrorSeverity::Medium,
        }
    }

    /// 給使用者看的建議
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            SeriesError::IoError(_) => "Check that the input file exists and the output directory is writable",
            SeriesError::SerializationError(_) => {
                "The input must be a JSON object mapping series names to lists of event records"
            }
            SeriesError::CsvError(_) => "Check the output path for the blank timeline CSV",
            SeriesError::ConfigValidationError { .. }
            | SeriesError::InvalidConfigValueError { .. }
            | SeriesError::MissingConfigError { .. } => {
                "Review the TOML configuration or the command line arguments"
            }
            SeriesError::ProcessingError { .. } => "Re-run with --verbose and inspect the failing series",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SeriesError::IoError(e) => format!("無法讀寫檔案: {}", e),
            SeriesError::SerializationError(e) => format!("JSON 格式錯誤: {}", e),
            SeriesError::MissingConfigError { field } => format!("缺少必要設定: {}", field),
            other => other.to_string(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        SeriesError::ProcessingError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SeriesError>;
