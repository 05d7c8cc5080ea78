#![deny(clippy::all)]
#![warn(missing_docs, nonstandard_style, rust_2018_idioms)]

//! A minimal HTTP client for the [AWS Lambda Runtime
//! API](https://docs.aws.amazon.com/lambda/latest/dg/runtimes-api.html).
//!
//! This crate knows nothing about Lambda invocations, handlers, or the
//! runtime's lifecycle — it only knows how to hold open a keep-alive
//! HTTP/1.1 connection to a base URI and send it requests. The
//! `lambda_runtime` crate builds the Runtime API protocol on top of this.

use http::{
    uri::{PathAndQuery, Scheme},
    Request, Response, Uri,
};
use hyper::body::Incoming;
use hyper_util::client::legacy::connect::HttpConnector;
use std::convert::TryInto;

mod error;
pub use error::*;
pub mod body;

#[cfg(feature = "tracing")]
pub mod tracing;

const USER_AGENT_HEADER: &str = "User-Agent";
const DEFAULT_USER_AGENT: &str = concat!("lambda-rust-runtime/", env!("CARGO_PKG_VERSION"));
const CUSTOM_USER_AGENT: Option<&str> = option_env!("LAMBDA_RUNTIME_USER_AGENT");

/// Client for the Runtime API. Holds a single persistent HTTP/1.1
/// connection (`hyper-util`'s legacy client handles keep-alive and
/// reconnect-after-transport-error transparently).
#[derive(Debug)]
pub struct Client {
    base: Uri,
    inner: hyper_util::client::legacy::Client<HttpConnector, body::Body>,
}

impl Client {
    /// Start building a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder {
            connector: HttpConnector::new(),
            uri: None,
        }
    }

    /// Send a request to the Runtime API. The request's URI only needs a
    /// path; [`Client`] rewrites scheme and authority to the configured
    /// base before sending.
    pub async fn call(&self, req: Request<body::Body>) -> Result<Response<Incoming>, BoxError> {
        let req = self.set_origin(req)?;
        self.inner.request(req).await.map_err(Into::into)
    }

    fn with(base: Uri, connector: HttpConnector) -> Self {
        let inner = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
            .http1_max_buf_size(1024 * 1024)
            .build(connector);
        Self { base, inner }
    }

    fn set_origin<B>(&self, req: Request<B>) -> Result<Request<B>, BoxError> {
        let (mut parts, body) = req.into_parts();
        let scheme = self.base.scheme().unwrap_or(&Scheme::HTTP);
        let authority = self
            .base
            .authority()
            .ok_or("Runtime API base URI is missing an authority")?;
        let base_path = self.base.path().trim_end_matches('/');
        let path = parts
            .uri
            .path_and_query()
            .ok_or("request URI is missing a path")?;
        let pq: PathAndQuery = format!("{base_path}{path}").parse()?;

        parts.uri = Uri::builder()
            .scheme(scheme.as_ref())
            .authority(authority.as_ref())
            .path_and_query(pq)
            .build()?;
        Ok(Request::from_parts(parts, body))
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    connector: HttpConnector,
    uri: Option<Uri>,
}

impl ClientBuilder {
    /// Use a non-default HTTP connector (mainly useful in tests).
    pub fn with_connector(self, connector: HttpConnector) -> Self {
        Self { connector, ..self }
    }

    /// Set the base URI explicitly instead of reading `AWS_LAMBDA_RUNTIME_API`.
    pub fn with_endpoint(self, uri: Uri) -> Self {
        Self { uri: Some(uri), ..self }
    }

    /// Build the client. Falls back to the `AWS_LAMBDA_RUNTIME_API`
    /// environment variable (`host:port`) when no endpoint was set
    /// explicitly.
    pub fn build(self) -> Result<Client, BoxError> {
        let uri = match self.uri {
            Some(uri) => uri,
            None => {
                let raw = std::env::var("AWS_LAMBDA_RUNTIME_API")?;
                let raw = if raw.contains("://") { raw } else { format!("http://{raw}") };
                raw.try_into()?
            }
        };
        Ok(Client::with(uri, self.connector))
    }
}

/// Start a request builder pre-populated with the Runtime API user agent.
///
/// Override the product token at compile time with the
/// `LAMBDA_RUNTIME_USER_AGENT` environment variable.
pub fn build_request() -> http::request::Builder {
    const USER_AGENT: &str = match CUSTOM_USER_AGENT {
        Some(value) => value,
        None => DEFAULT_USER_AGENT,
    };
    Request::builder().header(USER_AGENT_HEADER, USER_AGENT)
}
