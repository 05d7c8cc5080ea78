//! The Runtime API domain client (C3): polls for invocations and reports
//! their outcome, on top of the transport-only `lambda_runtime_api_client::Client`.

use crate::config::RuntimeConfig;
use crate::diagnostic::Diagnostic;
use crate::error::RuntimeError;
use crate::requests::{EventCompletionRequest, EventErrorRequest, InitErrorRequest, IntoRequest, NextEventRequest};
use crate::types::{Invocation, LambdaResponse};
use http_body_util::BodyExt;
use lambda_runtime_api_client::Client as TransportClient;
use std::time::Duration;

/// Thin domain wrapper over the transport client: knows the four Runtime API
/// endpoints and how to turn their responses into [`Invocation`]s, but
/// nothing about the lifecycle machine or handler dispatch.
pub(crate) struct RuntimeClient {
    transport: TransportClient,
    /// Applied to `response`/`error`/`init/error` POSTs only; `next` blocks
    /// without a client-side deadline since it waits on the platform itself.
    request_timeout: Option<Duration>,
}

impl RuntimeClient {
    pub(crate) fn new(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        let transport = TransportClient::builder()
            .with_endpoint(config.base_uri().parse().map_err(|e| {
                RuntimeError::Transport(format!("invalid Runtime API base uri: {e}").into())
            })?)
            .build()
            .map_err(RuntimeError::Transport)?;
        Ok(Self {
            transport,
            request_timeout: config.request_timeout,
        })
    }

    async fn call_with_timeout(&self, req: http::Request<lambda_runtime_api_client::body::Body>) -> Result<http::Response<hyper::body::Incoming>, RuntimeError> {
        match self.request_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.transport.call(req))
                .await
                .map_err(|_| RuntimeError::Transport("timed out waiting for the Runtime API".into()))?
                .map_err(RuntimeError::Transport),
            None => self.transport.call(req).await.map_err(RuntimeError::Transport),
        }
    }

    /// `GET invocation/next`. Blocks until the platform has an invocation
    /// ready; there is no client-side timeout on this call.
    pub(crate) async fn next(&self) -> Result<(Invocation, Vec<u8>), RuntimeError> {
        let req = NextEventRequest.into_request().map_err(RuntimeError::Transport)?;
        let resp = self.transport.call(req).await.map_err(RuntimeError::Transport)?;
        let (parts, body) = resp.into_parts();
        let invocation = Invocation::from_headers(&parts.headers)?;
        let body = body
            .collect()
            .await
            .map_err(|e| RuntimeError::Transport(Box::new(e)))?
            .to_bytes()
            .to_vec();
        Ok((invocation, body))
    }

    /// `POST invocation/{request_id}/response`.
    pub(crate) async fn respond(&self, request_id: &str, response: LambdaResponse) -> Result<(), RuntimeError> {
        let req = EventCompletionRequest { request_id, response }
            .into_request()
            .map_err(RuntimeError::Transport)?;
        self.call_with_timeout(req).await?;
        Ok(())
    }

    /// `POST invocation/{request_id}/error`.
    pub(crate) async fn fail_invocation(&self, request_id: &str, diagnostic: Diagnostic) -> Result<(), RuntimeError> {
        let req = EventErrorRequest { request_id, diagnostic }
            .into_request()
            .map_err(RuntimeError::Transport)?;
        self.call_with_timeout(req).await?;
        Ok(())
    }

    /// `POST init/error`.
    pub(crate) async fn fail_init(&self, diagnostic: Diagnostic) -> Result<(), RuntimeError> {
        let req = InitErrorRequest { diagnostic }.into_request().map_err(RuntimeError::Transport)?;
        self.call_with_timeout(req).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn config_for(server: &MockServer) -> RuntimeConfig {
        let url = server.base_url();
        let (host, port) = url.trim_start_matches("http://").split_once(':').unwrap();
        RuntimeConfig {
            host: host.to_string(),
            port: port.parse().unwrap(),
            request_timeout: None,
        }
    }

    #[tokio::test]
    async fn next_parses_headers_and_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/2018-06-01/runtime/invocation/next");
            then.status(200)
                .header("lambda-runtime-aws-request-id", "abc-1")
                .header("lambda-runtime-deadline-ms", "10000")
                .header("lambda-runtime-invoked-function-arn", "arn:aws:lambda:us-east-1:1:function:fn")
                .body(r#"{"n":3}"#);
        });

        let client = RuntimeClient::new(&config_for(&server)).unwrap();
        let (invocation, body) = client.next().await.unwrap();

        mock.assert_async().await;
        assert_eq!(invocation.request_id, "abc-1");
        assert_eq!(body, br#"{"n":3}"#);
    }

    #[tokio::test]
    async fn respond_posts_buffered_body_with_content_length() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/2018-06-01/runtime/invocation/abc-1/response")
                .header("content-length", "12")
                .body(r#"{"result":9}"#);
            then.status(200);
        });

        let client = RuntimeClient::new(&config_for(&server)).unwrap();
        client
            .respond("abc-1", LambdaResponse::buffered(&br#"{"result":9}"#[..]))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn fail_invocation_posts_unhandled_error_type() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/2018-06-01/runtime/invocation/abc-2/error")
                .header("lambda-runtime-function-error-type", "Unhandled");
            then.status(200);
        });

        let client = RuntimeClient::new(&config_for(&server)).unwrap();
        client
            .fail_invocation(
                "abc-2",
                Diagnostic {
                    error_type: "RequestDecoding".into(),
                    error_message: "bad payload".into(),
                },
            )
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn respond_times_out_against_a_slow_server() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/2018-06-01/runtime/invocation/abc-3/response");
            then.status(200).delay(std::time::Duration::from_millis(200));
        });

        let mut config = config_for(&server);
        config.request_timeout = Some(std::time::Duration::from_millis(20));
        let client = RuntimeClient::new(&config).unwrap();

        let err = client
            .respond("abc-3", LambdaResponse::buffered(&b"{}"[..]))
            .await
            .unwrap_err();

        assert!(matches!(err, RuntimeError::Transport(_)));
    }

    #[tokio::test]
    async fn fail_init_posts_to_fixed_path() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/2018-06-01/runtime/init/error");
            then.status(200);
        });

        let client = RuntimeClient::new(&config_for(&server)).unwrap();
        client
            .fail_init(Diagnostic {
                error_type: "HandlerInitFailure".into(),
                error_message: "DBUnreachable".into(),
            })
            .await
            .unwrap();

        mock.assert_async().await;
    }
}
