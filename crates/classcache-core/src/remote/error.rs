use reqwest::StatusCode;
use thiserror::Error;

/// Why a call to the sheet endpoint did not go through.
///
/// The endpoint is a single script URL, so the only useful split is between
/// "the script refused this request" (4xx, usually a bad deployment URL or an
/// unknown table), "the script is down" (5xx), and not reaching it at all.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Endpoint rejected the request ({status}): {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("Endpoint unavailable ({status}): {body}")]
    Unavailable { status: StatusCode, body: String },

    #[error("Could not reach endpoint: {0}")]
    Unreachable(#[from] reqwest::Error),

    /// A 2xx whose body is not JSON, e.g. a login page served instead of data.
    #[error("Unreadable response body: {0}")]
    MalformedBody(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Longest response body kept in an error message.
const MAX_ERROR_BODY_LENGTH: usize = 500;

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

impl RemoteError {
    /// Classify a non-success response.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let body = truncate_body(body);
        if status.is_server_error() {
            RemoteError::Unavailable { status, body }
        } else {
            RemoteError::Rejected { status, body }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        assert!(matches!(
            RemoteError::from_status(StatusCode::FORBIDDEN, "nope"),
            RemoteError::Rejected { ref body, .. } if body == "nope"
        ));
        assert!(matches!(
            RemoteError::from_status(StatusCode::NOT_FOUND, ""),
            RemoteError::Rejected { .. }
        ));
        assert!(matches!(
            RemoteError::from_status(StatusCode::BAD_GATEWAY, "down"),
            RemoteError::Unavailable { .. }
        ));
    }

    #[test]
    fn test_long_body_is_truncated() {
        let body = "é".repeat(400);
        let err = RemoteError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &body);
        let message = err.to_string();
        assert!(message.contains("truncated, 800 total bytes"));
    }
}
