//! Writer handle passed to a streaming handler's producer.

use crate::error::RuntimeError;
use bytes::Bytes;
use lambda_runtime_api_client::body::sender::Sender;

/// Handle a streamed [`crate::types::LambdaResponse`] producer uses to push
/// chunks onto the Runtime API response connection.
///
/// Tracks whether any byte has been written yet: once the first chunk is
/// flushed, the response headers are already on the wire, so a producer
/// failure after that point can no longer be reported as a normal invocation
/// error — it has to surface as a `HandlerFailure` raised from inside the
/// stream itself.
pub struct StreamWriter {
    sender: Sender,
    wrote_any: bool,
}

impl StreamWriter {
    pub(crate) fn new(sender: Sender) -> Self {
        Self { sender, wrote_any: false }
    }

    /// Push a chunk onto the response stream.
    pub async fn write(&mut self, chunk: impl Into<Bytes>) -> Result<(), RuntimeError> {
        self.sender
            .send_data(chunk.into())
            .await
            .map_err(RuntimeError::Transport)?;
        self.wrote_any = true;
        Ok(())
    }

    /// Whether at least one chunk has been written.
    pub fn has_written(&self) -> bool {
        self.wrote_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body::Body;
    use http_body_util::BodyExt;
    use lambda_runtime_api_client::body::sender::channel;

    #[tokio::test]
    async fn writes_are_forwarded_in_order() {
        let (sender, body) = channel();
        let mut writer = StreamWriter::new(sender);
        assert!(!writer.has_written());
        tokio::spawn(async move {
            writer.write(Bytes::from_static(b"hel")).await.unwrap();
            writer.write(Bytes::from_static(b"lo")).await.unwrap();
        });
        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected, Bytes::from_static(b"hello"));
    }

    #[test]
    fn size_hint_has_no_known_length() {
        let (_sender, body) = channel();
        assert!(body.size_hint().upper().is_none());
    }
}
