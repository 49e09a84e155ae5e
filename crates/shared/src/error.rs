use thiserror::Error;

/// Errors from talking to the assistant backend.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode reply: {0}")]
    Decode(String),

    #[error("invalid base url '{0}'")]
    InvalidBaseUrl(String),

    #[error("invalid review: {0}")]
    InvalidReview(String),
}

impl ClientError {
    /// Shorten a response body for logs and error text.
    pub fn status(status: u16, body: &str) -> Self {
        let body = body.trim();
        let body = if body.chars().count() > 300 {
            format!("{}...", body.chars().take(300).collect::<String>())
        } else {
            body.to_string()
        };
        ClientError::Status { status, body }
    }
}
