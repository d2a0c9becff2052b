use thiserror::Error;

/// Failure to get any response out of the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("backend unreachable: {0}")]
    Unreachable(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Network(#[from] TransportError),

    /// Non-2xx response, after at most one refresh-and-retry.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid request url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Builds a status error, falling back to a generic message when the
    /// server did not provide one.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.is_empty() {
            format!("request failed with status {}", status)
        } else {
            message
        };
        ApiError::Status { status, message }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status_code() == Some(401)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_message_falls_back_to_status() {
        let err = ApiError::status(502, "");
        assert_eq!(err.to_string(), "request failed with status 502");
        assert_eq!(err.status_code(), Some(502));
    }

    #[test]
    fn test_server_message_is_kept_verbatim() {
        let err = ApiError::status(400, "bad input");
        assert_eq!(err.to_string(), "bad input");
        assert!(!err.is_unauthorized());
    }
}
