//! The error taxonomy surfaced across invocation handling and startup.

use crate::trace_id::TraceIdError;

/// Boxed catch-all error used at crate boundaries where callers bring their
/// own error type (handler errors, encoder/decoder failures from third-party
/// crates).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything that can go wrong while driving one invocation or starting up.
///
/// The variant a [`RuntimeError`] carries determines how it is reported:
/// invocation-scoped errors become an `/invocation/{id}/error` POST and the
/// machine returns to waiting for the next event; `HandlerInitFailure` and
/// `ProtocolViolation` are fatal and end the process.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The event decoder rejected the invocation payload.
    #[error("request decoding failed: {0}")]
    RequestDecoding(#[source] BoxError),

    /// The output encoder failed to produce response bytes.
    #[error("response encoding failed: {0}")]
    ResponseEncoding(#[source] BoxError),

    /// The user handler returned an error or panicked.
    #[error("handler failed: {0}")]
    HandlerFailure(#[source] BoxError),

    /// Handler construction failed during startup.
    #[error("handler initialization failed: {0}")]
    HandlerInitFailure(#[source] BoxError),

    /// The Runtime API sent a response this crate cannot make sense of.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// A network-level failure talking to the Runtime API.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// A malformed `lambda-runtime-trace-id` header.
    #[error("invalid trace id: {0}")]
    TraceIdInvalid(#[from] TraceIdError),
}

impl RuntimeError {
    /// The stable tag used as `errorType` in the JSON error body posted back
    /// to the Runtime API.
    pub fn error_type(&self) -> &'static str {
        match self {
            RuntimeError::RequestDecoding(_) => "RequestDecoding",
            RuntimeError::ResponseEncoding(_) => "ResponseEncoding",
            RuntimeError::HandlerFailure(_) => "HandlerFailure",
            RuntimeError::HandlerInitFailure(_) => "HandlerInitFailure",
            RuntimeError::ProtocolViolation(_) => "ProtocolViolation",
            RuntimeError::Transport(_) => "Transport",
            RuntimeError::TraceIdInvalid(_) => "TraceIdInvalid",
        }
    }

    /// Whether this error is fatal to the process (init failures and
    /// protocol violations) as opposed to scoped to one invocation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RuntimeError::HandlerInitFailure(_) | RuntimeError::ProtocolViolation(_)
        )
    }
}
