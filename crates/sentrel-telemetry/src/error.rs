//! Error types for telemetry initialisation.

use std::fmt::{self, Display, Formatter};

/// Result alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors raised while initialising logging or metrics.
#[derive(Debug)]
pub enum TelemetryError {
    /// The global tracing subscriber could not be installed.
    SubscriberInstallFailed {
        /// Underlying error message from `tracing_subscriber`.
        reason: String,
    },
    /// A Prometheus metric could not be registered.
    MetricRegistrationFailed {
        /// Name of the metric that failed to register.
        metric: &'static str,
        /// Underlying Prometheus error.
        source: prometheus::Error,
    },
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubscriberInstallFailed { .. } => {
                formatter.write_str("failed to install tracing subscriber")
            }
            Self::MetricRegistrationFailed { metric, .. } => {
                write!(formatter, "failed to register metric `{metric}`")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SubscriberInstallFailed { .. } => None,
            Self::MetricRegistrationFailed { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_install_failed_display() {
        let err = TelemetryError::SubscriberInstallFailed {
            reason: "already set".into(),
        };
        assert_eq!(err.to_string(), "failed to install tracing subscriber");
        assert!(err.source().is_none());
    }
}
