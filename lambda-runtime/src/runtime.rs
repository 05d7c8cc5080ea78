//! The runtime driver (C8): composes the Runtime API client, the lifecycle
//! machine, and a handler into the top-level poll/dispatch/report loop.

use crate::client::RuntimeClient;
use crate::config::RuntimeConfig;
use crate::context::{BackgroundTaskScope, LambdaContext};
use crate::diagnostic::Diagnostic;
use crate::error::{BoxError, RuntimeError};
use crate::handler::ByteHandler;
use crate::lifecycle::{self, Action, Event, HandlerOutcome, MaxInvocations, State};
use crate::types::Invocation;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use tracing::{error, trace, Instrument};

/// Drive the lifecycle machine to completion against a real Runtime API
/// connection and a constructed handler.
///
/// `handler_factory` models the "construct handler" half of the startup
/// race in the lifecycle machine: it runs while the transport connection is
/// being established, and its failure is reported as an init error rather
/// than propagated as a plain `Result::Err` from this function, so a test
/// can assert that a `POST /init/error` actually happened.
pub(crate) async fn drive<F, Fut, H>(
    config: RuntimeConfig,
    handler_factory: F,
    max_invocations: MaxInvocations,
    shutdown_requested: Arc<AtomicBool>,
) -> Result<(), RuntimeError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<H, BoxError>>,
    H: ByteHandler,
{
    let client = RuntimeClient::new(&config)?;

    let (mut state, action) = lifecycle::step(State::Initialized, Event::Connect, max_invocations);
    debug_assert_eq!(action, Action::OpenTransportAndConstructHandler);

    // The transport connects lazily on first request, so opening it and
    // constructing the handler are raced for real here, not just modeled as
    // a race: whichever of `handler_factory()` or the first `GET next` (the
    // call that forces the connection open) completes first feeds its event
    // into the machine before the other. If `next` wins, its result is kept
    // and handed to the dispatch loop below instead of being fetched again.
    let handler_fut = handler_factory();
    let next_fut = client.next();
    tokio::pin!(handler_fut);
    tokio::pin!(next_fut);

    let mut handler_result: Option<Result<H, BoxError>> = None;
    let mut prefetched_next: Option<Result<(Invocation, Vec<u8>), RuntimeError>> = None;
    let mut pending_action = Action::None;

    while handler_result.is_none() || prefetched_next.is_none() {
        tokio::select! {
            result = &mut handler_fut, if handler_result.is_none() => {
                let outcome = match &result {
                    Ok(_) => HandlerOutcome::Ok,
                    Err(e) => HandlerOutcome::Err(e.to_string()),
                };
                handler_result = Some(result);
                let (next_state, action) = lifecycle::step(state, Event::HandlerInit(outcome), max_invocations);
                state = next_state;
                pending_action = action;
            }
            result = &mut next_fut, if prefetched_next.is_none() => {
                prefetched_next = Some(result);
                let (next_state, action) = lifecycle::step(state, Event::Connected, max_invocations);
                state = next_state;
                pending_action = action;
            }
        }
    }

    let handler_result = handler_result.expect("loop only exits once both futures resolve");
    let mut prefetched_next = prefetched_next;

    let mut handler = match handler_result {
        Ok(handler) => handler,
        Err(err) => {
            return finish_init_failure(&client, &mut state, &mut pending_action, err).await;
        }
    };

    let mut fatal_transport_error: Option<RuntimeError> = None;

    loop {
        match pending_action {
            Action::SendNext => {
                if shutdown_requested.load(Ordering::Relaxed) {
                    let (next_state, action) = lifecycle::step(state, Event::Close, max_invocations);
                    state = next_state;
                    pending_action = action;
                    continue;
                }

                let next_result = match prefetched_next.take() {
                    Some(result) => result,
                    None => {
                        trace!("polling for next invocation");
                        client.next().await
                    }
                };

                match next_result {
                    Ok((invocation, body)) => {
                        let request_id = invocation.request_id.clone();
                        let (next_state, action) = lifecycle::step(
                            state,
                            Event::Next {
                                request_id: request_id.clone(),
                            },
                            max_invocations,
                        );
                        state = next_state;
                        debug_assert_eq!(action, Action::None);

                        let outcome = run_one_invocation(&mut handler, invocation, body).await;

                        let (next_state, action) = lifecycle::step(state, Event::InvocationDone, max_invocations);
                        state = next_state;
                        debug_assert_eq!(action, Action::ReportInvocationOutcome);

                        report_outcome(&client, &request_id, outcome).await;

                        let (next_state, action) = lifecycle::step(state, Event::Reported, max_invocations);
                        state = next_state;
                        pending_action = action;
                    }
                    Err(err) => {
                        error!(error = %err, "transport error polling for next invocation");
                        let (next_state, action) = lifecycle::step(
                            state,
                            Event::TransportError { message: err.to_string() },
                            max_invocations,
                        );
                        state = next_state;
                        pending_action = action;
                        fatal_transport_error.get_or_insert(err);
                    }
                }
            }
            Action::CloseTransport => {
                let (next_state, action) = lifecycle::step(state, Event::TransportClosed, max_invocations);
                state = next_state;
                pending_action = action;
                if matches!(state, State::Shutdown) {
                    return match fatal_transport_error {
                        Some(err) => Err(err),
                        None => Ok(()),
                    };
                }
                debug_assert!(matches!(pending_action, Action::None));
            }
            Action::ProtocolViolation { description } => {
                return Err(RuntimeError::ProtocolViolation(description));
            }
            Action::None => {
                return Err(RuntimeError::ProtocolViolation(format!(
                    "driver idled with no pending action in state {state:?}"
                )));
            }
            Action::OpenTransportAndConstructHandler | Action::ReportInitError { .. } | Action::ReportInvocationOutcome => {
                return Err(RuntimeError::ProtocolViolation(format!(
                    "action {pending_action:?} should never reach the top of the drive loop"
                )));
            }
        }
    }
}

async fn finish_init_failure(
    client: &RuntimeClient,
    state: &mut State,
    pending_action: &mut Action,
    err: BoxError,
) -> Result<(), RuntimeError> {
    let message = match std::mem::replace(pending_action, Action::None) {
        Action::ReportInitError { message } => message,
        other => {
            return Err(RuntimeError::ProtocolViolation(format!(
                "expected ReportInitError action after handler construction failed, got {other:?}"
            )));
        }
    };

    let diagnostic = Diagnostic {
        error_type: "HandlerInitFailure".to_string(),
        error_message: message,
    };
    if let Err(report_err) = client.fail_init(diagnostic).await {
        error!(error = %report_err, "failed to report init error to the Runtime API");
    }

    let (next_state, action) = lifecycle::step(std::mem::replace(state, State::Shutdown), Event::Reported, MaxInvocations::Unbounded);
    *state = next_state;
    debug_assert_eq!(action, Action::CloseTransport);
    let (next_state, _) = lifecycle::step(std::mem::replace(state, State::Shutdown), Event::TransportClosed, MaxInvocations::Unbounded);
    *state = next_state;

    Err(RuntimeError::HandlerInitFailure(err))
}

async fn run_one_invocation<H>(handler: &mut H, invocation: Invocation, body: Vec<u8>) -> Result<crate::types::LambdaResponse, RuntimeError>
where
    H: ByteHandler,
{
    let (collector, scope) = BackgroundTaskScope::new();
    let ctx = LambdaContext::new(&invocation, collector);
    let span = ctx.request_span();

    let result = async {
        match handler.ready().await {
            Ok(ready) => ready.call((body, ctx)).await,
            Err(err) => Err(err),
        }
    }
    .instrument(span)
    .await;

    scope.drain().await;
    result
}

async fn report_outcome(client: &RuntimeClient, request_id: &str, outcome: Result<crate::types::LambdaResponse, RuntimeError>) {
    let report_result = match outcome {
        Ok(response) => client.respond(request_id, response).await,
        Err(err) => {
            error!(error = %err, "invocation failed"); // logged in CloudWatch
            let diagnostic = Diagnostic::from(&err);
            client.fail_invocation(request_id, diagnostic).await
        }
    };

    if let Err(err) = report_result {
        // Reporting is never retried: the platform's own retry policy on
        // the next `next` call takes over from here.
        error!(error = %err, "failed to report invocation outcome to the Runtime API");
    }
}
