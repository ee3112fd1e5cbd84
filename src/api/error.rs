/// An error response from the API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The API responded with something other than 200 OK.
    #[error("unexpected response, status={status}, body={body}")]
    Status {
        /// The HTTP status on the overall response.
        status: http::StatusCode,
        /// The raw response body, for diagnostics.
        body: String,
    },
    /// The API response could not be decoded.
    #[error("invalid response ({status})")]
    InvalidResponse {
        /// The HTTP status on the overall response.
        status: http::StatusCode,
        /// Where in the body decoding failed.
        #[source]
        source: serde_path_to_error::Error<serde_json::Error>,
    },
    /// The response body could not be read.
    #[error("failed to read response body")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// The HTTP status of the response that caused the error, if one was
    /// received.
    pub fn status(&self) -> Option<http::StatusCode> {
        match self {
            ApiError::Status { status, .. } | ApiError::InvalidResponse { status, .. } => {
                Some(*status)
            }
            ApiError::Io(_) => None,
        }
    }
}
