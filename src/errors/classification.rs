use super::types::ExporterError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
}

impl ExporterError {
    /// Classify this error to determine its type and whether the fetch
    /// that produced it can be retried.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            // Retryable errors
            ExporterError::Transport(_) => ErrorClassification {
                error_type: "TransportError",
                retryable: true,
            },
            ExporterError::Io(_) => ErrorClassification {
                error_type: "IoError",
                retryable: true,
            },
            // Server-side and throttling statuses are worth retrying;
            // other statuses will not change on a second attempt.
            ExporterError::UpstreamStatus { status, .. } => ErrorClassification {
                error_type: "UpstreamStatusError",
                retryable: *status == 429 || *status >= 500,
            },

            // Non-retryable errors
            ExporterError::Authentication(_) => ErrorClassification {
                error_type: "AuthenticationError",
                retryable: false,
            },
            ExporterError::Decode(_) => ErrorClassification {
                error_type: "DecodeError",
                retryable: false,
            },
            ExporterError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                retryable: false,
            },
            ExporterError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                retryable: false,
            },
            ExporterError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                retryable: false,
            },
            ExporterError::Metrics(_) => ErrorClassification {
                error_type: "MetricsError",
                retryable: false,
            },
            ExporterError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                retryable: false,
            },
        }
    }
}
