//! HTTP body utilities. The buffered/streamed duality here is what lets the
//! runtime crate post either a single JSON payload or a chunked stream of
//! bytes through the same request-building code path.
//!
//! Adapted from axum's body type (MIT licensed):
//! <https://github.com/tokio-rs/axum/blob/main/axum/LICENSE>

use crate::{BoxError, Error};
use bytes::Bytes;
use http_body::Frame;
use http_body_util::{BodyExt, Collected};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use sync_wrapper::SyncWrapper;

pub mod sender;

type BoxBody = http_body_util::combinators::UnsyncBoxBody<Bytes, Error>;

fn boxed<B>(body: B) -> BoxBody
where
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    try_downcast(body).unwrap_or_else(|body| body.map_err(Into::into).boxed_unsync())
}

fn try_downcast<T, K>(k: K) -> Result<T, K>
where
    T: 'static,
    K: Send + 'static,
{
    let mut k = Some(k);
    if let Some(k) = <dyn std::any::Any>::downcast_mut::<Option<T>>(&mut k) {
        Ok(k.take().unwrap())
    } else {
        Err(k.unwrap())
    }
}

/// The body type used for Runtime API requests and responses.
///
/// Covers three shapes: empty, a single buffered frame, and a channel-backed
/// stream used for `streamed` [`LambdaResponse`](../../lambda_runtime/enum.LambdaResponse.html)
/// payloads sent with chunked transfer encoding.
#[derive(Debug)]
pub struct Body(BoxBody);

impl Body {
    /// Wrap any [`http_body::Body`] whose error converts into [`BoxError`].
    pub fn new<B>(body: B) -> Self
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        try_downcast(body).unwrap_or_else(|body| Self(boxed(body)))
    }

    /// A body with no frames.
    pub fn empty() -> Self {
        Self::new(http_body_util::Empty::new())
    }

    /// Create a channel-backed body along with the [`sender::Sender`] used to
    /// push chunks into it. Used for streamed responses: the runtime driver
    /// holds the sender and forwards bytes the handler's producer emits.
    pub fn channel() -> (sender::Sender, Body) {
        let (tx, body) = sender::channel();
        (tx, Self::new(body))
    }

    /// Collect every frame of the body into a single buffer.
    pub async fn collect(self) -> Result<Collected<Bytes>, Error> {
        self.0.collect().await
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

macro_rules! body_from_impl {
    ($ty:ty) => {
        impl From<$ty> for Body {
            fn from(buf: $ty) -> Self {
                Self::new(http_body_util::Full::from(buf))
            }
        }
    };
}

body_from_impl!(&'static [u8]);
body_from_impl!(Vec<u8>);
body_from_impl!(&'static str);
body_from_impl!(String);
body_from_impl!(Bytes);

impl http_body::Body for Body {
    type Data = Bytes;
    type Error = Error;

    #[inline]
    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.0).poll_frame(cx)
    }

    #[inline]
    fn size_hint(&self) -> http_body::SizeHint {
        self.0.size_hint()
    }

    #[inline]
    fn is_end_stream(&self) -> bool {
        self.0.is_end_stream()
    }
}

pin_project! {
    /// Body backed by a `futures` stream, used by `Body::from_stream` callers
    /// outside this crate (the runtime's streamed-handler adapter).
    pub struct StreamBody<S> {
        #[pin]
        stream: SyncWrapper<S>,
    }
}

impl<S> StreamBody<S> {
    /// Wrap a fallible byte stream as a body.
    pub fn new(stream: S) -> Self {
        Self {
            stream: SyncWrapper::new(stream),
        }
    }
}

impl<S> http_body::Body for StreamBody<S>
where
    S: futures_util::TryStream,
    S::Ok: Into<Bytes>,
    S::Error: Into<BoxError>,
{
    type Data = Bytes;
    type Error = Error;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        use futures_util::TryStream;
        let stream = self.project().stream.get_pin_mut();
        match futures_util::ready!(TryStream::try_poll_next(stream, cx)) {
            Some(Ok(chunk)) => Poll::Ready(Some(Ok(Frame::data(chunk.into())))),
            Some(Err(err)) => Poll::Ready(Some(Err(Error::from(err.into())))),
            None => Poll::Ready(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_downcast() {
        assert_eq!(try_downcast::<i32, _>(5_u32), Err(5_u32));
        assert_eq!(try_downcast::<i32, _>(5_i32), Ok(5_i32));
    }

    #[tokio::test]
    async fn empty_body_collects_to_nothing() {
        let body = Body::empty();
        let collected = body.collect().await.unwrap();
        assert!(collected.to_bytes().is_empty());
    }

    #[tokio::test]
    async fn buffered_body_round_trips() {
        let body: Body = "hello".into();
        let collected = body.collect().await.unwrap();
        assert_eq!(collected.to_bytes(), Bytes::from_static(b"hello"));
    }
}
