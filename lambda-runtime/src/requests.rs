//! Request framing for the four Runtime API endpoints.

use crate::diagnostic::Diagnostic;
use crate::error::BoxError;
use crate::types::LambdaResponse;
use http::{Method, Request, Uri};
use lambda_runtime_api_client::{body::Body, build_request};

pub(crate) trait IntoRequest {
    fn into_request(self) -> Result<Request<Body>, BoxError>;
}

/// `GET /2018-06-01/runtime/invocation/next`
pub(crate) struct NextEventRequest;

impl IntoRequest for NextEventRequest {
    fn into_request(self) -> Result<Request<Body>, BoxError> {
        Ok(build_request()
            .method(Method::GET)
            .uri(Uri::from_static("/2018-06-01/runtime/invocation/next"))
            .body(Body::empty())?)
    }
}

/// `POST /2018-06-01/runtime/invocation/{request_id}/response`
pub(crate) struct EventCompletionRequest<'a> {
    pub(crate) request_id: &'a str,
    pub(crate) response: LambdaResponse,
}

impl<'a> IntoRequest for EventCompletionRequest<'a> {
    fn into_request(self) -> Result<Request<Body>, BoxError> {
        let uri: Uri = format!("/2018-06-01/runtime/invocation/{}/response", self.request_id).parse()?;
        match self.response {
            LambdaResponse::None => Ok(build_request()
                .method(Method::POST)
                .uri(uri)
                .header(http::header::CONTENT_LENGTH, "0")
                .body(Body::empty())?),
            LambdaResponse::Buffered(bytes) => Ok(build_request()
                .method(Method::POST)
                .uri(uri)
                .header(http::header::CONTENT_LENGTH, bytes.len())
                .body(Body::from(bytes))?),
            LambdaResponse::Streamed(producer) => {
                let (sender, body) = Body::channel();
                let writer = crate::streaming::StreamWriter::new(sender);
                tokio::spawn(async move {
                    if let Err(err) = producer(writer).await {
                        tracing::error!(error = %err, "streaming producer failed");
                    }
                });
                Ok(build_request()
                    .method(Method::POST)
                    .uri(uri)
                    .header(http::header::TRANSFER_ENCODING, "chunked")
                    .body(body)?)
            }
        }
    }
}

/// `POST /2018-06-01/runtime/invocation/{request_id}/error`
pub(crate) struct EventErrorRequest<'a> {
    pub(crate) request_id: &'a str,
    pub(crate) diagnostic: Diagnostic,
}

impl<'a> IntoRequest for EventErrorRequest<'a> {
    fn into_request(self) -> Result<Request<Body>, BoxError> {
        let uri: Uri = format!("/2018-06-01/runtime/invocation/{}/error", self.request_id).parse()?;
        let body = serde_json::to_vec(&self.diagnostic)?;
        Ok(build_request()
            .method(Method::POST)
            .uri(uri)
            .header("lambda-runtime-function-error-type", "Unhandled")
            .header(http::header::CONTENT_TYPE, "application/json")
            .header(http::header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))?)
    }
}

/// `POST /2018-06-01/runtime/init/error`
pub(crate) struct InitErrorRequest {
    pub(crate) diagnostic: Diagnostic,
}

impl IntoRequest for InitErrorRequest {
    fn into_request(self) -> Result<Request<Body>, BoxError> {
        let body = serde_json::to_vec(&self.diagnostic)?;
        Ok(build_request()
            .method(Method::POST)
            .uri(Uri::from_static("/2018-06-01/runtime/init/error"))
            .header("lambda-runtime-function-error-type", "Unhandled")
            .header(http::header::CONTENT_TYPE, "application/json")
            .header(http::header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_event_request_targets_the_fixed_path() {
        let req = NextEventRequest.into_request().unwrap();
        assert_eq!(req.method(), Method::GET);
        assert_eq!(req.uri(), &Uri::from_static("/2018-06-01/runtime/invocation/next"));
    }

    #[test]
    fn completion_request_sets_zero_content_length_for_none() {
        let req = EventCompletionRequest {
            request_id: "abc-1",
            response: LambdaResponse::None,
        }
        .into_request()
        .unwrap();
        assert_eq!(req.headers().get(http::header::CONTENT_LENGTH).unwrap(), "0");
    }

    #[test]
    fn completion_request_carries_exact_content_length_for_buffered() {
        let req = EventCompletionRequest {
            request_id: "abc-1",
            response: LambdaResponse::buffered(&b"{\"result\":9}"[..]),
        }
        .into_request()
        .unwrap();
        assert_eq!(req.uri(), &Uri::from_static("/2018-06-01/runtime/invocation/abc-1/response"));
        assert_eq!(req.headers().get(http::header::CONTENT_LENGTH).unwrap(), "12");
    }

    #[test]
    fn error_request_carries_unhandled_error_type_header() {
        let req = EventErrorRequest {
            request_id: "abc-2",
            diagnostic: Diagnostic {
                error_type: "RequestDecoding".into(),
                error_message: "bad payload".into(),
            },
        }
        .into_request()
        .unwrap();
        assert_eq!(req.uri(), &Uri::from_static("/2018-06-01/runtime/invocation/abc-2/error"));
        assert_eq!(
            req.headers().get("lambda-runtime-function-error-type").unwrap(),
            "Unhandled"
        );
    }

    #[test]
    fn init_error_request_targets_fixed_path() {
        let req = InitErrorRequest {
            diagnostic: Diagnostic {
                error_type: "HandlerInitFailure".into(),
                error_message: "DBUnreachable".into(),
            },
        }
        .into_request()
        .unwrap();
        assert_eq!(req.uri(), &Uri::from_static("/2018-06-01/runtime/init/error"));
        assert_eq!(req.method(), Method::POST);
    }
}
