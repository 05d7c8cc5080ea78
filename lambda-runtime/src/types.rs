//! Core data types shared across the Runtime API client, the lifecycle
//! machine, and the handler adapters.

use crate::error::RuntimeError;
use bytes::Bytes;
use http::HeaderMap;
use std::future::Future;
use std::pin::Pin;

/// Everything the Runtime API tells us about one invocation, taken verbatim
/// from the headers on a `GET .../invocation/next` response.
///
/// `trace_id` is carried unparsed: decoding it into a [`crate::trace_id::TraceId`]
/// is the caller's job, since a malformed header must not prevent the
/// handler from running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// `lambda-runtime-aws-request-id`. Uniquely identifies this invocation
    /// until its report is acknowledged.
    pub request_id: String,
    /// `lambda-runtime-deadline-ms`: absolute wall-clock deadline in epoch
    /// milliseconds.
    pub deadline_epoch_millis: u64,
    /// `lambda-runtime-invoked-function-arn`.
    pub invoked_function_arn: String,
    /// `lambda-runtime-trace-id`, unparsed. Empty string if the header was
    /// absent.
    pub trace_id: String,
    /// `lambda-runtime-cognito-identity`, opaque JSON if present.
    pub cognito_identity: Option<String>,
    /// `lambda-runtime-client-context`, opaque JSON if present.
    pub client_context: Option<String>,
}

impl Invocation {
    /// Build an [`Invocation`] from the headers of a `next` response.
    ///
    /// Fails with [`RuntimeError::ProtocolViolation`] when a required header
    /// is missing or unparsable; the driver treats this as fatal, since it
    /// means the Runtime API and this crate disagree about the wire
    /// contract.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, RuntimeError> {
        let get_str = |name: &'static str| -> Result<&str, RuntimeError> {
            headers
                .get(name)
                .ok_or_else(|| RuntimeError::ProtocolViolation(format!("missing {name} header")))?
                .to_str()
                .map_err(|e| RuntimeError::ProtocolViolation(format!("{name} header is not ASCII: {e}")))
        };

        let request_id = get_str("lambda-runtime-aws-request-id")?.to_owned();
        let deadline_epoch_millis = get_str("lambda-runtime-deadline-ms")?
            .parse::<u64>()
            .map_err(|e| RuntimeError::ProtocolViolation(format!("invalid lambda-runtime-deadline-ms: {e}")))?;
        let invoked_function_arn = get_str("lambda-runtime-invoked-function-arn")?.to_owned();
        let trace_id = headers
            .get("lambda-runtime-trace-id")
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default();
        let cognito_identity = headers
            .get("lambda-runtime-cognito-identity")
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
        let client_context = headers
            .get("lambda-runtime-client-context")
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

        Ok(Self {
            request_id,
            deadline_epoch_millis,
            invoked_function_arn,
            trace_id,
            cognito_identity,
            client_context,
        })
    }
}

/// A chunk producer for a streamed [`LambdaResponse`]: given a writer handle,
/// emit zero or more byte chunks and then resolve.
pub type StreamProducer =
    Box<dyn FnOnce(crate::streaming::StreamWriter) -> Pin<Box<dyn Future<Output = Result<(), RuntimeError>> + Send>> + Send>;

/// What a handler hands back to the driver for one invocation.
pub enum LambdaResponse {
    /// No response body; the platform is told "success, empty".
    None,
    /// A single opaque byte payload, sent as the full response body.
    Buffered(Bytes),
    /// A producer that streams the response body in chunks over an HTTP/1.1
    /// chunked-transfer connection.
    Streamed(StreamProducer),
}

impl std::fmt::Debug for LambdaResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LambdaResponse::None => f.write_str("LambdaResponse::None"),
            LambdaResponse::Buffered(bytes) => f.debug_tuple("LambdaResponse::Buffered").field(&bytes.len()).finish(),
            LambdaResponse::Streamed(_) => f.write_str("LambdaResponse::Streamed(..)"),
        }
    }
}

impl LambdaResponse {
    /// Wrap a byte buffer as a buffered response.
    pub fn buffered(bytes: impl Into<Bytes>) -> Self {
        LambdaResponse::Buffered(bytes.into())
    }

    /// Wrap an async producer as a streamed response.
    pub fn streamed<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(crate::streaming::StreamWriter) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), RuntimeError>> + Send + 'static,
    {
        LambdaResponse::Streamed(Box::new(move |writer| Box::pin(producer(writer))))
    }
}
