//! Error types and handling for the passage planner

use thiserror::Error;

/// Main error type for the passage planner
#[derive(Error, Debug)]
pub enum PlannerError {
    /// Malformed request input (missing or out-of-range coordinates, empty route, ...)
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// The mandatory route branch failed and no fallback route could be computed
    #[error("Route unavailable: {message}")]
    RouteUnavailable { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PlannerError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new route-unavailable error
    pub fn route_unavailable<S: Into<String>>(message: S) -> Self {
        Self::RouteUnavailable {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error is the caller's fault and must not be retried
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, PlannerError::Validation { .. })
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            PlannerError::Validation { message } => format!("Invalid input: {message}"),
            PlannerError::RouteUnavailable { .. } => {
                "No route could be planned between these ports. Check the departure and destination coordinates."
                    .to_string()
            }
            PlannerError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = PlannerError::validation("latitude 91 out of range");
        assert!(matches!(err, PlannerError::Validation { .. }));
        assert!(err.is_validation());

        let err = PlannerError::route_unavailable("no coordinates");
        assert!(matches!(err, PlannerError::RouteUnavailable { .. }));
        assert!(!err.is_validation());
    }

    #[test]
    fn test_user_messages() {
        let err = PlannerError::validation("crew size must be positive");
        assert!(err.user_message().contains("crew size must be positive"));

        let err = PlannerError::config("bad level");
        assert!(err.user_message().contains("config file"));
        assert!(err.to_string().contains("bad level"));
    }
}
