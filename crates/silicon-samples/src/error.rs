use crate::config::ConfigError;
use crate::documents::SummaryError;
use crate::interview::{BatchError, InterviewError};
use crate::persona::PersonaError;
use crate::prompts::PromptError;
use crate::questionnaire::CatalogError;
use crate::storage::StorageError;
use crate::telemetry::TelemetryError;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Catalog(CatalogError),
    Persona(PersonaError),
    Prompt(PromptError),
    Interview(InterviewError),
    Summary(SummaryError),
    Storage(StorageError),
    Input(serde_json::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Catalog(err) => write!(f, "questionnaire error: {}", err),
            AppError::Persona(err) => write!(f, "persona error: {}", err),
            AppError::Prompt(err) => write!(f, "prompt error: {}", err),
            AppError::Interview(err) => write!(f, "interview error: {}", err),
            AppError::Summary(err) => write!(f, "summary error: {}", err),
            AppError::Storage(err) => write!(f, "storage error: {}", err),
            AppError::Input(err) => write!(f, "invalid input file: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Catalog(err) => Some(err),
            AppError::Persona(err) => Some(err),
            AppError::Prompt(err) => Some(err),
            AppError::Interview(err) => Some(err),
            AppError::Summary(err) => Some(err),
            AppError::Storage(err) => Some(err),
            AppError::Input(err) => Some(err),
        }
    }
}

impl AppError {
    /// Process exit code: 2 for bad inputs, 1 for runtime failures.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_)
            | AppError::Catalog(_)
            | AppError::Persona(_)
            | AppError::Prompt(_)
            | AppError::Input(_) => 2,
            AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Interview(_)
            | AppError::Summary(_)
            | AppError::Storage(_) => 1,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<CatalogError> for AppError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

impl From<PersonaError> for AppError {
    fn from(value: PersonaError) -> Self {
        Self::Persona(value)
    }
}

impl From<PromptError> for AppError {
    fn from(value: PromptError) -> Self {
        Self::Prompt(value)
    }
}

impl From<InterviewError> for AppError {
    fn from(value: InterviewError) -> Self {
        Self::Interview(value)
    }
}

impl From<SummaryError> for AppError {
    fn from(value: SummaryError) -> Self {
        Self::Summary(value)
    }
}

impl From<StorageError> for AppError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<BatchError> for AppError {
    fn from(value: BatchError) -> Self {
        match value {
            BatchError::Interview(err) => Self::Interview(err),
            BatchError::Storage(err) => Self::Storage(err),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Input(value)
    }
}
