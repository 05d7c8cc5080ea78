//! The lifecycle state machine (C4): sequences startup, per-invocation
//! states, and shutdown.
//!
//! Deliberately free of I/O and clocks, per the rationale the original
//! design notes give for keeping this pure: every transition is a plain
//! `(State, Event) -> (State, Action)` function, which is what makes it
//! exhaustively and property-testable without a mock server.

/// Outcome of handler construction, carried opaquely — the machine never
/// inspects `Ok`/`Err` payloads, only which arm they're in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Construction succeeded.
    Ok,
    /// Construction failed; the message is carried for reporting only.
    Err(String),
}

/// What sub-state `Running` is in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunningSub {
    /// Idle, waiting on the next `GET .../invocation/next`.
    WaitingForNext,
    /// A handler call is in flight for this request id.
    RunningHandler { request_id: String },
    /// The result or error for the last handler call is being reported.
    ReportingResult,
}

/// The lifecycle states of §4.4.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// Constructed; no connection, no handler.
    Initialized,
    /// Handler construction and transport connect are racing.
    Starting {
        /// `None` until `handlerInit` arrives.
        handler: Option<HandlerOutcome>,
        /// Whether `connected` has already arrived.
        connected: bool,
    },
    /// Steady state: handler is ready and the transport is connected.
    Running {
        /// Number of invocations completed so far (used for bounded exit).
        completed: u32,
        /// Whether a `close` arrived mid-invocation and should be honored
        /// once the current report finishes.
        shutdown_pending: bool,
        /// The `Running` sub-state.
        sub: RunningSub,
    },
    /// Construction failed after connect succeeded; reporting it.
    ReportingInitializationError {
        /// The failure message, carried through to the `reported` event.
        message: String,
    },
    /// Closing the transport intentionally.
    ShuttingDown,
    /// Terminal state.
    Shutdown,
}

/// Inputs into the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Begin connecting to the Runtime API and constructing the handler.
    Connect,
    /// The transport connection has been established.
    Connected,
    /// Handler construction finished, successfully or not.
    HandlerInit(HandlerOutcome),
    /// A `next` call returned this request id.
    Next { request_id: String },
    /// The in-flight invocation's handler call finished.
    InvocationDone,
    /// The report for the last invocation has been acknowledged.
    Reported,
    /// A graceful shutdown was requested (bounded exit or external signal).
    Close,
    /// The transport connection closed.
    TransportClosed,
    /// A transport-level error occurred.
    TransportError { message: String },
}

/// Side effects the driver must execute in response to a transition. The
/// machine only describes them — it never performs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No side effect; just wait for the next event.
    None,
    /// Open the transport connection and start constructing the handler.
    OpenTransportAndConstructHandler,
    /// Issue `GET invocation/next`.
    SendNext,
    /// Report the in-flight invocation's outcome.
    ReportInvocationOutcome,
    /// POST `/init/error` with the carried message.
    ReportInitError {
        /// The init failure's message.
        message: String,
    },
    /// Close the transport connection.
    CloseTransport,
    /// Unrecoverable: an event arrived in a state that cannot handle it.
    ProtocolViolation {
        /// Description of the offending (state, event) pair.
        description: String,
    },
}

/// How many `next` events to admit before shutting down. `Unbounded` is the
/// steady-state production mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxInvocations {
    /// No bound: run until externally closed.
    Unbounded,
    /// Shut down after exactly this many invocations have been reported.
    Bounded(u32),
}

impl MaxInvocations {
    fn exhausted(self, completed: u32) -> bool {
        match self {
            MaxInvocations::Unbounded => false,
            MaxInvocations::Bounded(limit) => completed >= limit,
        }
    }
}

/// Advance the machine by one event. Pure: no I/O, no clock, no shared
/// mutable state — a property this module's tests lean on heavily.
pub fn step(state: State, event: Event, max_invocations: MaxInvocations) -> (State, Action) {
    use Event::*;
    use State::*;

    match (state, event) {
        (Initialized, Connect) => (
            Starting {
                handler: None,
                connected: false,
            },
            Action::OpenTransportAndConstructHandler,
        ),

        (
            Starting {
                handler: Some(HandlerOutcome::Ok),
                connected: false,
            },
            Connected,
        ) => (
            Running {
                completed: 0,
                shutdown_pending: false,
                sub: RunningSub::WaitingForNext,
            },
            Action::SendNext,
        ),

        (
            Starting {
                handler: Some(HandlerOutcome::Err(message)),
                connected: false,
            },
            Connected,
        ) => (ReportingInitializationError { message: message.clone() }, Action::ReportInitError { message }),

        (
            Starting {
                handler: None,
                connected: false,
            },
            Connected,
        ) => (
            Starting {
                handler: None,
                connected: true,
            },
            Action::None,
        ),

        (
            Starting {
                handler: None,
                connected: false,
            },
            HandlerInit(init @ self::HandlerOutcome::Ok),
        ) => (
            Starting {
                handler: Some(init),
                connected: false,
            },
            Action::None,
        ),

        (
            Starting {
                handler: None,
                connected: true,
            },
            HandlerInit(self::HandlerOutcome::Ok),
        ) => (
            Running {
                completed: 0,
                shutdown_pending: false,
                sub: RunningSub::WaitingForNext,
            },
            Action::SendNext,
        ),

        (
            Starting {
                handler: None,
                connected: false,
            },
            HandlerInit(init @ self::HandlerOutcome::Err(_)),
        ) => (
            Starting {
                handler: Some(init),
                connected: false,
            },
            Action::None,
        ),

        (
            Starting {
                handler: None,
                connected: true,
            },
            HandlerInit(self::HandlerOutcome::Err(message)),
        ) => (ReportingInitializationError { message: message.clone() }, Action::ReportInitError { message }),

        (
            Running {
                completed,
                shutdown_pending,
                sub: RunningSub::WaitingForNext,
            },
            Next { request_id },
        ) => (
            Running {
                completed,
                shutdown_pending,
                sub: RunningSub::RunningHandler { request_id },
            },
            Action::None,
        ),

        (
            Running {
                completed,
                shutdown_pending,
                sub: RunningSub::RunningHandler { .. },
            },
            InvocationDone,
        ) => (
            Running {
                completed,
                shutdown_pending,
                sub: RunningSub::ReportingResult,
            },
            Action::ReportInvocationOutcome,
        ),

        (
            Running {
                completed,
                shutdown_pending,
                sub: RunningSub::ReportingResult,
            },
            Reported,
        ) => {
            let completed = completed + 1;
            if shutdown_pending || max_invocations.exhausted(completed) {
                (ShuttingDown, Action::CloseTransport)
            } else {
                (
                    Running {
                        completed,
                        shutdown_pending: false,
                        sub: RunningSub::WaitingForNext,
                    },
                    Action::SendNext,
                )
            }
        }

        (ReportingInitializationError { .. }, Reported) => (ShuttingDown, Action::CloseTransport),

        (
            Running {
                completed: _,
                shutdown_pending: _,
                sub: RunningSub::WaitingForNext,
            },
            Close,
        ) => (ShuttingDown, Action::CloseTransport),

        (
            Running {
                completed,
                sub,
                shutdown_pending: _,
            },
            Close,
        ) => (
            Running {
                completed,
                shutdown_pending: true,
                sub,
            },
            Action::None,
        ),

        (ShuttingDown, TransportClosed) => (Shutdown, Action::None),
        (
            Running {
                sub: RunningSub::WaitingForNext,
                ..
            },
            TransportClosed,
        ) => (Shutdown, Action::None),

        (any, TransportError { message }) => match any {
            Shutdown => (
                Shutdown,
                Action::ProtocolViolation {
                    description: format!("transportError after Shutdown: {message}"),
                },
            ),
            _ => (ShuttingDown, Action::CloseTransport),
        },

        (state, event) => (
            state.clone(),
            Action::ProtocolViolation {
                description: format!("event {event:?} is invalid in state {state:?}"),
            },
        ),
    }
}
