//! The per-invocation context (C5): metadata, deadline, and a scoped handle
//! for handler-spawned background work.
//!
//! The background-task collector is channel-based rather than an
//! `Arc<Mutex<JoinSet>>` shared between the handler and the driver: the
//! handler only ever needs to hand off a future, never to poll the set of
//! outstanding tasks, so a plain `mpsc` sender avoids holding a lock across
//! an await point on either side.

use crate::types::Invocation;
use futures::future::BoxFuture;
use futures_channel::mpsc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A handle a handler uses to spawn fire-and-forget async work that must
/// still complete before its invocation is considered done.
#[derive(Clone)]
pub struct BackgroundTaskCollector {
    tasks_tx: mpsc::UnboundedSender<BoxFuture<'static, ()>>,
}

impl BackgroundTaskCollector {
    /// Hand a future to the driver to be joined once the invocation's
    /// handler call returns. The future is not polled by this call.
    pub fn spawn<F>(&self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        // The receiver only drops once the invocation's drain step is done,
        // so this send should never fail in practice; if it does, the task
        // is simply never run rather than panicking the handler.
        let _ = self.tasks_tx.unbounded_send(Box::pin(future));
    }
}

/// The driver-owned half of a [`BackgroundTaskCollector`], scoped to exactly
/// one invocation. Constructed fresh per invocation and drained before the
/// lifecycle machine is told the invocation is done.
pub(crate) struct BackgroundTaskScope {
    tasks_rx: mpsc::UnboundedReceiver<BoxFuture<'static, ()>>,
}

impl BackgroundTaskScope {
    pub(crate) fn new() -> (BackgroundTaskCollector, Self) {
        let (tasks_tx, tasks_rx) = mpsc::unbounded();
        (BackgroundTaskCollector { tasks_tx }, Self { tasks_rx })
    }

    /// Join every task the handler spawned during this invocation. A task
    /// that panics is logged, not propagated: background work failing never
    /// fails the invocation that spawned it.
    pub(crate) async fn drain(mut self) {
        use futures::StreamExt;
        let mut join_set = tokio::task::JoinSet::new();
        while let Some(task) = self.tasks_rx.next().await {
            join_set.spawn(task);
        }
        while let Some(result) = join_set.join_next().await {
            if let Err(err) = result {
                tracing::error!(error = %err, "background task panicked");
            }
        }
    }
}

/// Per-invocation metadata, logger, deadline, and background-task handle
/// passed to the handler.
///
/// Constructed uniquely by the runtime driver for each invocation and valid
/// only for that invocation's lifetime; nothing about it is retained once
/// the handler call returns and its background tasks have drained.
#[derive(Clone)]
pub struct LambdaContext {
    /// Uniquely identifies this invocation.
    pub request_id: String,
    /// Raw `lambda-runtime-trace-id` header value, empty if absent.
    pub trace_id: String,
    /// ARN of the function, version, or alias invoked.
    pub invoked_function_arn: String,
    /// Absolute deadline in epoch milliseconds.
    pub deadline_epoch_millis: u64,
    /// Opaque Cognito identity payload, if present.
    pub cognito_identity: Option<String>,
    /// Opaque mobile client context payload, if present.
    pub client_context: Option<String>,
    /// Handle for spawning scoped background work.
    pub background_tasks: BackgroundTaskCollector,
}

impl LambdaContext {
    pub(crate) fn new(invocation: &Invocation, background_tasks: BackgroundTaskCollector) -> Self {
        Self {
            request_id: invocation.request_id.clone(),
            trace_id: invocation.trace_id.clone(),
            invoked_function_arn: invocation.invoked_function_arn.clone(),
            deadline_epoch_millis: invocation.deadline_epoch_millis,
            cognito_identity: invocation.cognito_identity.clone(),
            client_context: invocation.client_context.clone(),
            background_tasks,
        }
    }

    /// Time remaining before the platform forcibly terminates this
    /// invocation. `Duration::ZERO` once the deadline has already passed.
    pub fn remaining_time(&self) -> Duration {
        let now_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Duration::from_millis(self.deadline_epoch_millis.saturating_sub(now_millis))
    }

    /// Spawn fire-and-forget work that must complete before this invocation
    /// is considered done.
    pub fn add_background_task<F>(&self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.background_tasks.spawn(future);
    }

    /// A span tagging every log line emitted while this invocation's
    /// handler call is in flight with its request and trace ids.
    pub(crate) fn request_span(&self) -> tracing::Span {
        tracing::info_span!("invocation", request_id = %self.request_id, trace_id = %self.trace_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn sample_invocation() -> Invocation {
        Invocation {
            request_id: "abc-1".into(),
            deadline_epoch_millis: u64::MAX,
            invoked_function_arn: "arn".into(),
            trace_id: "1-5759e988-bd862e3fe1be46a994272793".into(),
            cognito_identity: None,
            client_context: None,
        }
    }

    #[tokio::test]
    async fn background_tasks_are_joined_before_drain_returns() {
        let (collector, scope) = BackgroundTaskScope::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let ctx = LambdaContext::new(&sample_invocation(), collector);
        for _ in 0..3 {
            let counter = counter.clone();
            ctx.add_background_task(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(ctx);

        scope.drain().await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn a_panicking_background_task_does_not_stop_the_drain() {
        let (collector, scope) = BackgroundTaskScope::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let ctx = LambdaContext::new(&sample_invocation(), collector);
        ctx.add_background_task(async { panic!("boom") });
        let counter2 = counter.clone();
        ctx.add_background_task(async move {
            counter2.fetch_add(1, Ordering::SeqCst);
        });
        drop(ctx);

        scope.drain().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remaining_time_is_zero_once_past_deadline() {
        let mut invocation = sample_invocation();
        invocation.deadline_epoch_millis = 1;
        let (collector, _scope) = BackgroundTaskScope::new();
        let ctx = LambdaContext::new(&invocation, collector);
        assert_eq!(ctx.remaining_time(), Duration::ZERO);
    }
}
