//! The byte-buffer handler capability (C6) and the typed adapter that
//! builds one out of a typed `Event -> Output` service (C7).
//!
//! The minimal handler contract is expressed as [`tower::Service`] over
//! `(Vec<u8>, LambdaContext)`, the same capability abstraction the teacher
//! crate uses for its typed handlers — one trait, no handler class
//! hierarchy, with adapters implementing it in terms of something more
//! convenient.

use crate::context::LambdaContext;
use crate::deserializer;
use crate::error::{BoxError, RuntimeError};
use crate::types::LambdaResponse;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use std::any::TypeId;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// The capability the driver calls once per invocation: raw request bytes
/// and a context in, a [`LambdaResponse`] or [`RuntimeError`] out.
pub trait ByteHandler: Service<(Vec<u8>, LambdaContext), Response = LambdaResponse, Error = RuntimeError> {}

impl<T> ByteHandler for T where T: Service<(Vec<u8>, LambdaContext), Response = LambdaResponse, Error = RuntimeError> {}

const DEFAULT_OUTPUT_BUFFER_CAPACITY: usize = 1024 * 1024;

fn is_unit_type<T: 'static>() -> bool {
    TypeId::of::<T>() == TypeId::of::<()>()
}

/// Adapts a typed `Service<(Event, LambdaContext), Response = Output>` into
/// the byte-buffer [`ByteHandler`] capability: decodes the request body into
/// `Event`, invokes the inner service, and encodes `Output` back into bytes.
///
/// When `Output` is `()`, encoding is skipped entirely and the adapter
/// returns [`LambdaResponse::None`].
pub struct TypedAdapter<F, Event, Output> {
    inner: F,
    buffer: Arc<Mutex<Vec<u8>>>,
    _marker: PhantomData<fn(Event) -> Output>,
}

impl<F, Event, Output> TypedAdapter<F, Event, Output>
where
    Output: 'static,
{
    /// Wrap a typed service. Allocates the reusable output buffer eagerly
    /// (skipped for `Output = ()`, which never encodes anything).
    pub fn new(inner: F) -> Self {
        let capacity = if is_unit_type::<Output>() { 0 } else { DEFAULT_OUTPUT_BUFFER_CAPACITY };
        Self {
            inner,
            buffer: Arc::new(Mutex::new(Vec::with_capacity(capacity))),
            _marker: PhantomData,
        }
    }
}

impl<F, Event, Output> Service<(Vec<u8>, LambdaContext)> for TypedAdapter<F, Event, Output>
where
    F: Service<(Event, LambdaContext), Response = Output> + Send + 'static,
    F::Future: Send + 'static,
    F::Error: Into<BoxError>,
    Event: DeserializeOwned + Send + 'static,
    Output: Serialize + Send + 'static,
{
    type Response = LambdaResponse;
    type Error = RuntimeError;
    type Future = Pin<Box<dyn Future<Output = Result<LambdaResponse, RuntimeError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(|e| RuntimeError::HandlerFailure(e.into()))
    }

    fn call(&mut self, (body, ctx): (Vec<u8>, LambdaContext)) -> Self::Future {
        let event: Event = match deserializer::deserialize(&body) {
            Ok(event) => event,
            Err(err) => return Box::pin(async move { Err(RuntimeError::RequestDecoding(Box::new(err))) }),
        };

        let fut = self.inner.call((event, ctx));
        let buffer = self.buffer.clone();

        Box::pin(async move {
            let output = fut.await.map_err(|e| RuntimeError::HandlerFailure(e.into()))?;

            if is_unit_type::<Output>() {
                return Ok(LambdaResponse::None);
            }

            let mut buffer = buffer.lock().expect("output buffer poisoned by a prior panic");
            buffer.clear();
            serde_json::to_writer(&mut *buffer, &output).map_err(|e| RuntimeError::ResponseEncoding(Box::new(e)))?;
            Ok(LambdaResponse::Buffered(Bytes::copy_from_slice(&buffer)))
        })
    }
}
