use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Network-level failure codes that the retry engine treats as transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkErrorCode {
    /// The peer reset or aborted the connection.
    ConnectionReset,
    /// The socket or request timed out inside the transport.
    TimedOut,
    /// The host name could not be resolved.
    NameNotResolved,
}

impl NetworkErrorCode {
    /// Returns the conventional errno-style label for the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionReset => "ECONNRESET",
            Self::TimedOut => "ETIMEDOUT",
            Self::NameNotResolved => "ENOTFOUND",
        }
    }
}

impl fmt::Display for NetworkErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregates every failure mode exposed by the client facade.
///
/// Each variant carries whatever identity the failure has: the provider it came from,
/// the HTTP status returned by the backend, a network code, or a wrapped cause. The
/// retry engine only looks at [`LLMError::status`] and [`LLMError::network_code`] when
/// deciding whether another attempt is worthwhile.
#[derive(Debug, Error)]
pub enum LLMError {
    /// Represents transport-layer or networking failures.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        /// Classified network code, when the transport could recognize one.
        code: Option<NetworkErrorCode>,
    },
    /// Reports invalid or missing credentials (HTTP 401/403).
    #[error("auth failure ({status}): {message}")]
    Auth { status: u16, message: String },
    /// Indicates that the provider throttled the request (HTTP 429).
    #[error("rate limited: {message}")]
    RateLimit {
        /// Raw message returned by the upstream provider.
        message: String,
        /// Optional wait duration suggested by the provider before retrying.
        retry_after: Option<Duration>,
    },
    /// Signals validation failures in the request payload.
    #[error("invalid request: {message}")]
    Validation { message: String },
    /// Raised when building or validating configuration fails.
    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfig {
        /// Name of the configuration field that failed validation.
        field: String,
        /// Additional context explaining why the field is invalid.
        reason: String,
    },
    /// Wraps provider-defined errors that cannot be normalized further.
    #[error("provider {provider} error: {message}")]
    Provider {
        /// Name of the provider adapter, such as `openai_chat`.
        provider: &'static str,
        /// HTTP status returned with the error, if any.
        status: Option<u16>,
        /// Human-readable error message returned by the provider.
        message: String,
    },
    /// A single attempt did not finish within its deadline.
    #[error("request to {provider} timed out after {}ms", .timeout.as_millis())]
    Timeout {
        provider: &'static str,
        timeout: Duration,
    },
    /// Every permitted attempt failed with a retryable error.
    #[error("request to {provider} failed after {retries} retries: {source}")]
    RetryExhausted {
        provider: &'static str,
        /// Number of retries performed after the initial attempt.
        retries: u32,
        /// The failure of the final attempt.
        source: Box<LLMError>,
    },
    /// The active provider has no streaming capability.
    #[error("streaming is not supported by {provider}")]
    StreamingUnsupported { provider: &'static str },
    /// A streaming call failed while opening or iterating the stream.
    #[error("streaming from {provider} failed: {source}")]
    Stream {
        provider: &'static str,
        source: Box<LLMError>,
    },
    /// Signals that an SSE channel closed mid-event or delivered garbage.
    #[error("stream closed unexpectedly: {message}")]
    StreamClosed { message: String },
    /// Catches opaque or unexpected failures.
    #[error("unknown error: {message}")]
    Unknown { message: String },
}

impl LLMError {
    /// Creates an [`LLMError::Transport`] without a network code.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_assist::error::LLMError;
    ///
    /// let err = LLMError::transport("tls handshake failed");
    /// assert!(matches!(err, LLMError::Transport { code: None, .. }));
    /// ```
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            message: message.into(),
            code: None,
        }
    }

    /// Creates an [`LLMError::Transport`] tagged with a classified network code.
    pub fn network<T: Into<String>>(code: NetworkErrorCode, message: T) -> Self {
        Self::Transport {
            message: message.into(),
            code: Some(code),
        }
    }

    /// Creates an [`LLMError::Provider`] with no status code.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_assist::error::LLMError;
    ///
    /// let err = LLMError::provider("openai_chat", "bad JSON payload");
    /// assert!(matches!(err, LLMError::Provider { provider: "openai_chat", status: None, .. }));
    /// ```
    pub fn provider<T: Into<String>>(provider: &'static str, message: T) -> Self {
        Self::Provider {
            provider,
            status: None,
            message: message.into(),
        }
    }

    /// Creates an [`LLMError::InvalidConfig`].
    pub fn config<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Maps a non-2xx HTTP status returned by `provider` onto the matching variant.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_assist::error::LLMError;
    ///
    /// let err = LLMError::from_status("openai", 503, "overloaded", None);
    /// assert_eq!(err.status(), Some(503));
    /// assert!(matches!(LLMError::from_status("openai", 401, "no", None), LLMError::Auth { .. }));
    /// ```
    pub fn from_status<T: Into<String>>(
        provider: &'static str,
        status: u16,
        message: T,
        retry_after: Option<Duration>,
    ) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Auth { status, message },
            429 => Self::RateLimit {
                message,
                retry_after,
            },
            _ => Self::Provider {
                provider,
                status: Some(status),
                message,
            },
        }
    }

    /// HTTP-style status code attached to the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } => Some(*status),
            Self::RateLimit { .. } => Some(429),
            Self::Provider { status, .. } => *status,
            _ => None,
        }
    }

    /// Network-level code attached to the failure, if any.
    pub fn network_code(&self) -> Option<NetworkErrorCode> {
        match self {
            Self::Transport { code, .. } => *code,
            _ => None,
        }
    }

    /// Provider the failure is attributed to, if known.
    pub fn provider_name(&self) -> Option<&'static str> {
        match self {
            Self::Provider { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::RetryExhausted { provider, .. }
            | Self::StreamingUnsupported { provider }
            | Self::Stream { provider, .. } => Some(*provider),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn status_is_reported_for_http_failures() {
        assert_eq!(
            LLMError::Auth {
                status: 403,
                message: "forbidden".into()
            }
            .status(),
            Some(403)
        );
        assert_eq!(
            LLMError::RateLimit {
                message: "slow down".into(),
                retry_after: None
            }
            .status(),
            Some(429)
        );
        assert_eq!(LLMError::transport("reset").status(), None);
        assert_eq!(
            LLMError::Timeout {
                provider: "openai",
                timeout: Duration::from_millis(10)
            }
            .status(),
            None
        );
    }

    #[test]
    fn retry_exhausted_exposes_wrapped_cause() {
        let err = LLMError::RetryExhausted {
            provider: "gemini",
            retries: 2,
            source: Box::new(LLMError::network(NetworkErrorCode::ConnectionReset, "reset")),
        };
        assert_eq!(err.provider_name(), Some("gemini"));
        let cause = err.source().expect("source");
        assert!(cause.to_string().contains("reset"));
        assert!(err.to_string().contains("2 retries"));
    }

    #[test]
    fn timeout_message_mentions_deadline() {
        let err = LLMError::Timeout {
            provider: "openai",
            timeout: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "request to openai timed out after 1500ms");
    }
}
