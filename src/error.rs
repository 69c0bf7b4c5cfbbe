use thiserror::Error;

pub const INDEXER_UNAVAILABLE: &str = "Could not query Fulcrum indexer.";
pub const RATE_LIMIT_EXCEEDED: &str = "rate limit exceeded";

/// A failed call into the blockchain gateway.
///
/// Indexers report failures either as a plain error (anything with a message)
/// or as a full-node style object carrying an `error` string. Both are kept
/// apart here and only collapsed into a single message by
/// [`GatewayFault::message`].
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayFault {
    Exception { message: String },
    NodeError { error: String },
    Timeout { elapsed_ms: u64 },
}

impl GatewayFault {
    pub fn exception(message: impl Into<String>) -> Self {
        GatewayFault::Exception {
            message: message.into(),
        }
    }

    pub fn node_error(error: impl Into<String>) -> Self {
        GatewayFault::NodeError {
            error: error.into(),
        }
    }

    /// The `error` string of a full-node style failure wins over anything else.
    pub fn message(&self) -> String {
        match self {
            GatewayFault::NodeError { error } => error.clone(),
            GatewayFault::Exception { message } => message.clone(),
            GatewayFault::Timeout { elapsed_ms } => {
                format!("gateway call timed out after {} ms", elapsed_ms)
            }
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            GatewayFault::Timeout { .. } => 504,
            _ => 422,
        }
    }
}

impl std::fmt::Display for GatewayFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

/// Everything a handler can fail with. Each variant knows the HTTP-style
/// status it is reported with, on both transports.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Validation(String),
    #[error("{}", RATE_LIMIT_EXCEEDED)]
    RateLimitExceeded { identity: String },
    #[error("{0}")]
    Gateway(GatewayFault),
    #[error("{}", INDEXER_UNAVAILABLE)]
    IndexerUnavailable,
    #[error("unknown endpoint {0}")]
    UnknownEndpoint(String),
    #[error("unknown method {0}")]
    UnknownMethod(String),
    #[error("{0}")]
    Unhandled(String),
}

impl GatewayError {
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::Validation(_) => 422,
            GatewayError::RateLimitExceeded { .. } => 429,
            GatewayError::Gateway(fault) => fault.status(),
            GatewayError::IndexerUnavailable => 422,
            GatewayError::UnknownEndpoint(_) | GatewayError::UnknownMethod(_) => 404,
            GatewayError::Unhandled(_) => 500,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        GatewayError::Validation(message.into())
    }
}

impl From<GatewayFault> for GatewayError {
    fn from(fault: GatewayFault) -> Self {
        GatewayError::Gateway(fault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_error_is_preferred_message() {
        let fault = GatewayFault::node_error("bad-txns-inputs-missingorspent");
        assert_eq!(fault.message(), "bad-txns-inputs-missingorspent");
        assert_eq!(
            GatewayError::from(fault).to_string(),
            "bad-txns-inputs-missingorspent"
        );
    }

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(GatewayError::validation("x").status(), 422);
        assert_eq!(
            GatewayError::RateLimitExceeded {
                identity: String::from("peer")
            }
            .status(),
            429
        );
        assert_eq!(GatewayError::IndexerUnavailable.status(), 422);
        assert_eq!(
            GatewayError::UnknownEndpoint(String::from("nope")).status(),
            404
        );
        assert_eq!(
            GatewayError::from(GatewayFault::Timeout { elapsed_ms: 10 }).status(),
            504
        );
        assert_eq!(GatewayError::Unhandled(String::from("boom")).status(), 500);
    }

    #[test]
    fn rate_limit_message() {
        let err = GatewayError::RateLimitExceeded {
            identity: String::from("QmPeer"),
        };
        assert_eq!(err.to_string(), "rate limit exceeded");
    }
}
