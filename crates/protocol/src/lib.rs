//! Wire frames for external script engine processes.
//!
//! One engine process speaks a line protocol on its standard streams:
//!
//! 1. The host writes a request line: `[contextId, source]` to evaluate, or
//!    `[contextId]` to discard that context's state
//! 2. The engine writes exactly one response line: `[status, value]`
//!
//! Responses arrive in request order; there is no id on the response side.
//! Correlation relies on the host never issuing a second request before the
//! first response is read.
//!
//! # Main Types
//!
//! - [`Request`] - Host to engine frames
//! - [`Response`] - Engine to host frames, classified into a [`Reply`]
//! - [`Framing`] - Single-line or chunked transport of an encoded request
//! - [`Reassembler`] - Engine-side reassembly of chunked requests

pub mod chunk;
pub mod escape;
pub mod frame;

pub use chunk::{END_SENTINEL, MIN_CHUNK_SIZE, Reassembler, split_frame};
pub use escape::escape_non_ascii;
pub use frame::{ContextId, Framing, Reply, Request, Response, STATUS_OK};
