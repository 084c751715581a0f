//! Stream frame events for the chat streaming endpoint.

/// One recognized frame from the streaming chat response.
///
/// The decoder emits `Token` and `Done`; the transport layer injects
/// `Error` when the connection drops mid-stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A token fragment to append to the assistant message.
    Token {
        /// The fragment text, spacing included.
        text: String,
    },
    /// The backend signalled completion (`event: done`).
    Done,
    /// The transport failed mid-stream.
    Error {
        /// Description of what went wrong.
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_carries_fragment_verbatim() {
        let event = StreamEvent::Token {
            text: " there".into(),
        };
        match &event {
            StreamEvent::Token { text } => assert_eq!(text, " there"),
            _ => unreachable!("expected Token"),
        }
    }

    #[test]
    fn events_are_comparable() {
        assert_eq!(StreamEvent::Done, StreamEvent::Done);
        assert_ne!(
            StreamEvent::Done,
            StreamEvent::Error {
                detail: "dropped".into()
            }
        );
    }
}
