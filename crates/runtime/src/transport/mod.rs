//! Line transport over an engine's standard streams
//!
//! Requests are encoded with the descriptor's [`Framing`] and written with a
//! single `write_all` followed by an explicit flush, so the engine sees the
//! whole frame before the host starts reading. Responses are read one line at
//! a time.
//!
//! I/O failures surface as [`Error::ProtocolDesync`]: once a write or read
//! fails the stream position is unknown and the transport is not reused.


use std::io::{BufRead, Write};

use jsbridge_protocol::{Framing, Request};

use crate::error::{Error, Result};

/// Boxed engine input stream.
pub type Writer = Box<dyn Write + Send>;
/// Boxed engine output stream.
pub type Reader = Box<dyn BufRead + Send>;

/// Request/response line transport.
pub struct LineTransport {
	writer: Option<Writer>,
	reader: Option<Reader>,
	framing: Framing,
}

impl LineTransport {
	pub fn new(writer: Writer, reader: Reader, framing: Framing) -> Self {
		Self {
			writer: Some(writer),
			reader: Some(reader),
			framing,
		}
	}

	pub fn framing(&self) -> Framing {
		self.framing
	}

	/// Encodes and writes one request, then flushes.
	pub fn send(&mut self, request: &Request) -> Result<()> {
		let wire = self.framing.encode(request)?;
		let writer = self
			.writer
			.as_mut()
			.ok_or_else(|| Error::ProtocolDesync("engine input is closed".to_string()))?;

		writer
			.write_all(wire.as_bytes())
			.and_then(|()| writer.flush())
			.map_err(|e| Error::ProtocolDesync(format!("failed to write request: {e}")))
	}

	/// Reads one response line. Returns `None` at end of stream.
	pub fn recv_line(&mut self) -> Result<Option<String>> {
		let reader = self
			.reader
			.as_mut()
			.ok_or_else(|| Error::ProtocolDesync("engine output is closed".to_string()))?;

		let mut line = String::new();
		let read = reader
			.read_line(&mut line)
			.map_err(|e| Error::ProtocolDesync(format!("failed to read response: {e}")))?;
		if read == 0 {
			return Ok(None);
		}
		Ok(Some(line))
	}

	/// Sends `request` and reads the line answering it.
	pub fn round_trip(&mut self, request: &Request) -> Result<Option<String>> {
		self.send(request)?;
		self.recv_line()
	}

	/// Closes both streams. Closing an already closed transport is a no-op.
	pub fn close(&mut self) {
		// Input first so the engine sees end of stream.
		drop(self.writer.take());
		drop(self.reader.take());
	}

	pub fn is_closed(&self) -> bool {
		self.writer.is_none() && self.reader.is_none()
	}
}

impl std::fmt::Debug for LineTransport {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LineTransport")
			.field("framing", &self.framing)
			.field("closed", &self.is_closed())
			.finish()
	}
}
