//! Session state machine types.

/// Why a streaming exchange was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbortCause {
    /// The timeout budget expired.
    Timeout,
    /// The user cancelled explicitly.
    User,
}

impl std::fmt::Display for AbortCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::User => write!(f, "user"),
        }
    }
}

/// Lifecycle state of the streaming session.
///
/// `Idle → Sending → Streaming → {Done | Aborted | Errored}`; every
/// terminal state returns to `Idle` once reconciliation has run. A new
/// exchange can only start from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No exchange in flight.
    Idle,
    /// Request dispatched, no response bytes yet.
    Sending,
    /// Response body is being consumed.
    Streaming,
    /// Stream completed normally.
    Done,
    /// Cancelled by timeout or explicit request.
    Aborted(AbortCause),
    /// Transport failed before or during the stream.
    Errored,
}

impl SessionState {
    /// Whether a new exchange may start.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Whether this is a terminal state of an exchange.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted(_) | Self::Errored)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Sending => write!(f, "sending"),
            Self::Streaming => write!(f, "streaming"),
            Self::Done => write!(f, "done"),
            Self::Aborted(cause) => write!(f, "aborted ({cause})"),
            Self::Errored => write!(f, "errored"),
        }
    }
}

/// Result of one `send` exchange. I/O failures are values here, not
/// errors — the session converts them to user-facing notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Stream completed; transcript reconciled with the backend.
    Completed,
    /// Cancelled by timeout or explicit request.
    Aborted(AbortCause),
    /// Transport failed before or during the stream.
    Failed {
        /// User-facing description of the failure.
        detail: String,
    },
}
