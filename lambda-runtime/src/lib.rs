#![deny(clippy::all, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]
#![warn(missing_docs, nonstandard_style, rust_2018_idioms)]

//! Core runtime loop for AWS Lambda custom runtimes.
//!
//! The mechanism for defining a function is the same one the wider
//! ecosystem already uses: implement [`tower::Service`] over a request type
//! and hand it to [`run_typed`]. [`service_fn`] wraps a plain async closure
//! into a `Service` when a full type isn't worth naming.
//!
//! ```no_run
//! use lambda_runtime::{service_fn, Error, LambdaContext};
//! use serde_json::Value;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     lambda_runtime::run_typed(service_fn(handler)).await
//! }
//!
//! async fn handler((event, _ctx): (Value, LambdaContext)) -> Result<Value, Error> {
//!     Ok(event)
//! }
//! ```

mod client;
mod config;
mod context;
mod deserializer;
mod diagnostic;
mod error;
mod handler;
mod lifecycle;
#[cfg(feature = "tracing")]
mod logging;
mod requests;
/// Streaming response support.
pub mod streaming;
mod runtime;
mod trace_id;
mod types;

pub use config::{ConfigError, RuntimeConfig};
pub use context::{BackgroundTaskCollector, LambdaContext};
pub use diagnostic::Diagnostic;
pub use error::{BoxError, RuntimeError};
pub use handler::{ByteHandler, TypedAdapter};
pub use lifecycle::MaxInvocations;
pub use tower::{self, service_fn, Service};
pub use trace_id::{SegmentId, TraceId, TraceIdError};
pub use types::{Invocation, LambdaResponse, StreamProducer};

use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, trace};

/// Error type most call sites use: anything a handler, encoder, or decoder
/// can produce, boxed.
pub type Error = BoxError;

/// Run a typed handler: `event` is decoded from the invocation payload with
/// [`serde_json`], `output` is encoded back into the response body.
///
/// This is almost always what a `main` function wants; reach for [`run`]
/// directly only when the handler already speaks raw bytes.
///
/// # Example
/// ```no_run
/// use lambda_runtime::{service_fn, Error, LambdaContext};
/// use serde_json::Value;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Error> {
///     lambda_runtime::run_typed(service_fn(handler)).await
/// }
///
/// async fn handler((event, _ctx): (Value, LambdaContext)) -> Result<Value, Error> {
///     Ok(event)
/// }
/// ```
pub async fn run_typed<F, Event, Output>(handler: F) -> Result<(), Error>
where
    F: Service<(Event, LambdaContext), Response = Output> + Send + 'static,
    F::Future: Send + 'static,
    F::Error: Into<BoxError>,
    Event: DeserializeOwned + Send + 'static,
    Output: Serialize + Send + 'static,
{
    run(TypedAdapter::new(handler)).await
}

/// Start the runtime with a handler that already speaks raw bytes in and
/// [`LambdaResponse`] out, and poll the [Lambda Runtime
/// API](https://docs.aws.amazon.com/lambda/latest/dg/runtimes-api.html) for
/// invocations until the process receives `SIGTERM`/`SIGINT` or the handler
/// fails to construct.
///
/// `handler` is already a constructed, ready-to-use [`ByteHandler`] — there
/// is no startup race to model here, since constructing it is the caller's
/// job. Handler construction failures that need to be reported to the
/// platform as an init error should happen before calling this function
/// fails fast: see [`try_run`] for a variant that accepts a fallible handler
/// factory instead.
pub async fn run<H>(handler: H) -> Result<(), Error>
where
    H: ByteHandler + Send + 'static,
{
    try_run(|| async move { Ok(handler) }).await
}

/// Like [`run`], but `handler_factory` may itself fail. A failure is
/// reported to the Runtime API as an init error and the process exits
/// non-zero, matching what happens when a Lambda function's static
/// initializer throws.
pub async fn try_run<F, Fut, H>(handler_factory: F) -> Result<(), Error>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<H, BoxError>>,
    H: ByteHandler + Send + 'static,
{
    #[cfg(feature = "tracing")]
    logging::init();

    trace!("loading runtime config from env");
    let config = RuntimeConfig::from_env().map_err(|e| -> BoxError { Box::new(e) })?;

    let shutdown_requested = Arc::new(AtomicBool::new(false));
    install_signal_handlers(shutdown_requested.clone());

    match runtime::drive(config, handler_factory, MaxInvocations::Unbounded, shutdown_requested).await {
        Ok(()) => Ok(()),
        Err(err) if err.is_fatal() => {
            error!(error = %err, "fatal runtime error, exiting");
            std::process::exit(1);
        }
        Err(err) => Err(Box::new(err)),
    }
}

/// Run the lifecycle for at most `count` invocations, then return instead of
/// exiting the process. Intended for tests and local harnesses; production
/// functions should use [`run`].
pub async fn run_bounded<H>(handler: H, count: u32) -> Result<(), Error>
where
    H: ByteHandler + Send + 'static,
{
    let config = RuntimeConfig::from_env().map_err(|e| -> BoxError { Box::new(e) })?;
    let shutdown_requested = Arc::new(AtomicBool::new(false));
    runtime::drive(
        config,
        || async move { Ok(handler) },
        MaxInvocations::Bounded(count),
        shutdown_requested,
    )
    .await
    .map_err(|e| -> BoxError { Box::new(e) })
}

#[cfg(unix)]
fn install_signal_handlers(shutdown_requested: Arc<AtomicBool>) {
    use tokio::signal::unix::{signal, SignalKind};

    for kind in [SignalKind::terminate(), SignalKind::interrupt()] {
        let shutdown_requested = shutdown_requested.clone();
        let Ok(mut stream) = signal(kind) else {
            continue;
        };
        tokio::spawn(async move {
            stream.recv().await;
            trace!("shutdown signal received, will close after the current invocation");
            shutdown_requested.store(true, Ordering::Relaxed);
        });
    }
}

#[cfg(not(unix))]
fn install_signal_handlers(shutdown_requested: Arc<AtomicBool>) {
    let _ = shutdown_requested;
}
