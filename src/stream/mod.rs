//! Incremental decoding of the chat streaming response.

pub mod decoder;
pub mod events;

pub use decoder::{FrameDecoder, Utf8StreamDecoder};
pub use events::StreamEvent;
