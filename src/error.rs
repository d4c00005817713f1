//! Error types for VEAP client operations.
//!
//! Every failure that can reach a watched value carries a code (0 for a failed
//! round-trip, otherwise the VEAP status) and an optional detail message. The
//! `Display` output is the human-readable description shown next to a value.

use thiserror::Error;

/// Errors produced by the VEAP client, pollers and registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The round-trip to the server could not complete
    #[error("Request to the VEAP server failed{}", detail(.message))]
    Transport { message: Option<String> },

    /// The server answered with a non-2xx VEAP status
    #[error("VEAP status: {}{}", status_text(.code), detail(.message))]
    Protocol { code: u16, message: Option<String> },

    /// A 2xx response that does not have the expected structure
    #[error("{0}")]
    MalformedResponse(String),

    /// The address is already present in the watch registry
    #[error("Address is already watched: {0}")]
    AlreadyWatched(String),

    /// Text could not be converted into a value of the target type
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Configuration or logging setup failure
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn transport(message: impl Into<String>) -> Self {
        ClientError::Transport {
            message: Some(message.into()),
        }
    }

    pub fn protocol(code: u16, message: Option<String>) -> Self {
        ClientError::Protocol { code, message }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        ClientError::MalformedResponse(message.into())
    }

    /// Wire-level code: 0 for transport failures, the status for protocol failures.
    pub fn code(&self) -> Option<u16> {
        match self {
            ClientError::Transport { .. } => Some(0),
            ClientError::Protocol { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Builds the error reported inside a batch read result.
    ///
    /// Code 0 is the server's way of saying the underlying read did not complete.
    pub fn from_code(code: u16, message: Option<String>) -> Self {
        let message = message.filter(|m| !m.is_empty());
        if code == 0 {
            ClientError::Transport { message }
        } else {
            ClientError::Protocol { code, message }
        }
    }
}

fn detail(message: &Option<String>) -> String {
    match message {
        Some(m) if !m.is_empty() => format!(" ({})", m),
        _ => String::new(),
    }
}

fn status_text(code: &u16) -> String {
    describe_status(*code)
}

/// Human-readable description of a VEAP status code.
pub fn describe_status(code: u16) -> String {
    let text = match code {
        200 => "OK",
        201 => "OK, object created",
        400 => "Invalid request, HTTP protocol error",
        401 => "Authentication required",
        403 => "Access denied",
        404 => "Object/service not found",
        405 => "Method not allowed",
        422 => "Request does not conform to the VEAP protocol",
        500 => "Unexpected server error",
        _ => return format!("? ({})", code),
    };
    format!("{} ({})", text, code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_display_with_and_without_detail() {
        let err = ClientError::Transport { message: None };
        assert_eq!(err.to_string(), "Request to the VEAP server failed");

        let err = ClientError::transport("connection refused");
        assert_eq!(
            err.to_string(),
            "Request to the VEAP server failed (connection refused)"
        );
        assert_eq!(err.code(), Some(0));
    }

    #[test]
    fn test_protocol_display() {
        let err = ClientError::protocol(404, Some("no such object".to_string()));
        assert_eq!(
            err.to_string(),
            "VEAP status: Object/service not found (404) (no such object)"
        );
        assert_eq!(err.code(), Some(404));

        let err = ClientError::protocol(599, None);
        assert_eq!(err.to_string(), "VEAP status: ? (599)");
    }

    #[test]
    fn test_from_code_maps_zero_to_transport() {
        assert_eq!(
            ClientError::from_code(0, Some(String::new())),
            ClientError::Transport { message: None }
        );
        assert_eq!(
            ClientError::from_code(403, None),
            ClientError::Protocol {
                code: 403,
                message: None
            }
        );
    }

    #[test]
    fn test_non_wire_errors_have_no_code() {
        assert_eq!(ClientError::malformed("bad").code(), None);
        assert_eq!(ClientError::AlreadyWatched("/a".into()).code(), None);
    }
}
