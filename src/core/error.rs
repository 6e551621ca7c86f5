use thiserror::Error;

/// Failure taxonomy for a single rate fetch. Every variant is recoverable;
/// the scheduler decides when to try again.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("API key not configured")]
    MissingCredential,
    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {0}")]
    BadStatus(u16),
    #[error("failed to decode rates payload: {0}")]
    Decode(String),
}

impl FetchError {
    /// Message suitable for end-user display. Credential problems point at
    /// configuration; everything else reads as a connectivity issue.
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::MissingCredential => "API key error. Check configuration.",
            _ => "Failed to update rates. Check connection.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors_point_at_configuration() {
        assert_eq!(
            FetchError::MissingCredential.user_message(),
            "API key error. Check configuration."
        );
    }

    #[test]
    fn test_other_errors_point_at_connection() {
        for err in [
            FetchError::InvalidEndpoint("::".to_string()),
            FetchError::Transport("connection reset".to_string()),
            FetchError::BadStatus(503),
            FetchError::Decode("missing field".to_string()),
        ] {
            assert_eq!(err.user_message(), "Failed to update rates. Check connection.");
        }
    }
}
