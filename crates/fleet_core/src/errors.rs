use std::fmt;
use thiserror::Error;
use tokio::time::Duration;

#[derive(Error, Debug)]
pub enum StdError {
    #[error("JsonSerializationError: {0}")]
    JsonSerializationError(#[source] serde_json::Error),

    #[error("Kube Error: {0}")]
    KubeError(#[source] kube::Error),

    #[error("Finalizer Error: {0}")]
    // the finalizer helper embeds the reconciler error (this type), so box it to break the cycle
    FinalizerError(#[source] Box<kube::runtime::finalizer::Error<Error>>),

    #[error("MetadataMissing: {0}")]
    MetadataMissing(String),

    #[error("InvalidArgument: {0}")]
    InvalidArgument(String),

    #[error("SerializationError: {0}")]
    SerializationError(String),

    #[error("HttpError: {0}")]
    HttpError(String),
}

impl StdError {
    pub fn metric_label(&self) -> String {
        match self {
            StdError::JsonSerializationError(_) => "json_serialization_error".into(),
            StdError::KubeError(_) => "kube_error".into(),
            StdError::FinalizerError(_) => "finalizer_error".into(),
            StdError::MetadataMissing(_) => "metadata_missing".into(),
            StdError::InvalidArgument(_) => "invalid_argument".into(),
            StdError::SerializationError(_) => "serialization_error".into(),
            StdError::HttpError(_) => "http_error".into(),
        }
    }
}

#[derive(Error, Debug)]
pub struct ErrorWithRequeue {
    pub duration: Duration,
    pub error: StdError,
}

impl ErrorWithRequeue {
    pub fn new(error: StdError, duration: Duration) -> ErrorWithRequeue {
        ErrorWithRequeue { error, duration }
    }

    pub fn metric_label(&self) -> String {
        self.error.metric_label()
    }
}

impl fmt::Display for ErrorWithRequeue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Standard Error: {0}")]
    StdError(#[source] StdError),

    #[error("Error With Requeue: {0}")]
    ErrorWithRequeue(#[source] ErrorWithRequeue),
}

impl Error {
    pub fn metric_label(&self) -> String {
        match self {
            Error::StdError(e) => e.metric_label(),
            Error::ErrorWithRequeue(e) => e.metric_label(),
        }
    }
}

impl From<kube::Error> for Error {
    fn from(e: kube::Error) -> Self {
        Error::StdError(StdError::KubeError(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::StdError(StdError::JsonSerializationError(e))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
