//! Decoding of the generation service's streamed response body.

pub mod decoder;
pub mod event_stream;

pub use decoder::FrameDecoder;
pub use event_stream::EventStream;
