// Token streaming: line framing shared by both ends, the wire event format, the
// server-side relay and the client-side decoder.

pub mod decoder;
pub mod framing;
pub mod relay;
pub mod wire;

pub use decoder::{DecodedStream, StreamDecoder};
pub use wire::WireEvent;
