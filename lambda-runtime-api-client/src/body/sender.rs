//! A channel-backed [`http_body::Body`] and its [`Sender`] half.
//!
//! Adapted from hyper's `Body::channel` (MIT licensed):
//! <https://github.com/hyperium/hyper/blob/master/LICENSE>

use crate::Error;
use bytes::Bytes;
use futures_channel::mpsc;
use futures_util::Stream;
use http_body::{Body, Frame, SizeHint};
use std::pin::Pin;
use std::task::{Context, Poll};

type BodySender = mpsc::UnboundedSender<Result<Bytes, Error>>;

/// The writer half of a [`super::Body::channel`] pair.
///
/// Dropping the sender ends the body normally, emitting no more frames.
#[must_use = "Sender does nothing unless sent on"]
pub struct Sender {
    data_tx: BodySender,
}

impl Sender {
    /// Push a chunk onto the body. Never blocks; backpressure on a Runtime
    /// API connection is handled by hyper at the socket layer, not here.
    pub async fn send_data(&mut self, chunk: Bytes) -> Result<(), Error> {
        self.data_tx
            .unbounded_send(Ok(chunk))
            .map_err(|_| Box::<dyn std::error::Error + Send + Sync>::from("body receiver dropped"))
    }

    /// Terminate the stream with an error, surfaced to the body's reader as
    /// the final frame. Used when a streaming handler's producer fails after
    /// it has already flushed bytes: at that point the response headers are
    /// already sent, so the only way to report the failure is mid-stream.
    pub fn send_error(&mut self, err: Error) {
        let _ = self.data_tx.unbounded_send(Err(err));
    }
}

/// The reader half of a [`super::Body::channel`] pair.
pub struct ChannelBody {
    data_rx: mpsc::UnboundedReceiver<Result<Bytes, Error>>,
}

/// Create a new channel-backed body and its sender.
pub fn channel() -> (Sender, ChannelBody) {
    let (data_tx, data_rx) = mpsc::unbounded();
    (Sender { data_tx }, ChannelBody { data_rx })
}

impl Body for ChannelBody {
    type Data = Bytes;
    type Error = Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match futures_util::ready!(Pin::new(&mut self.data_rx).poll_next(cx)) {
            Some(Ok(chunk)) => Poll::Ready(Some(Ok(Frame::data(chunk)))),
            Some(Err(err)) => Poll::Ready(Some(Err(err))),
            None => Poll::Ready(None),
        }
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn streams_chunks_in_order() {
        let (mut tx, body) = channel();
        tokio::spawn(async move {
            tx.send_data(Bytes::from_static(b"hel")).await.unwrap();
            tx.send_data(Bytes::from_static(b"lo")).await.unwrap();
        });
        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn mid_stream_error_surfaces_to_reader() {
        let (mut tx, body) = channel();
        tx.send_data(Bytes::from_static(b"he")).await.unwrap();
        tx.send_error(Box::<dyn std::error::Error + Send + Sync>::from("boom"));
        drop(tx);
        let result = body.collect().await;
        assert!(result.is_err());
    }
}
