//! Runtime descriptors.
//!
//! A [`RuntimeDescriptor`] names one kind of external engine and how to reach
//! it. Descriptors are immutable once built and are shared behind an `Arc`
//! by every context that uses them.

use std::path::{Path, PathBuf};

use jsbridge_protocol::Framing;

/// Chunk size used when a descriptor needs line-safe transport but sets no
/// explicit frame size.
pub const DEFAULT_LINE_SAFE_FRAME_SIZE: usize = 4096;

/// Substring identifying a syntax error in an engine's failure message.
pub const DEFAULT_SYNTAX_ERROR_MARKER: &str = "SyntaxError";

/// Immutable configuration for one kind of external engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeDescriptor {
	name: String,
	commands: Vec<String>,
	bootstrap: PathBuf,
	shared_process: bool,
	max_frame_size: Option<usize>,
	line_safe_transport: bool,
	syntax_error_marker: String,
}

impl RuntimeDescriptor {
	pub fn builder(name: impl Into<String>) -> DescriptorBuilder {
		DescriptorBuilder {
			descriptor: RuntimeDescriptor {
				name: name.into(),
				commands: Vec::new(),
				bootstrap: PathBuf::new(),
				shared_process: false,
				max_frame_size: None,
				line_safe_transport: false,
				syntax_error_marker: DEFAULT_SYNTAX_ERROR_MARKER.to_string(),
			},
		}
	}

	/// Display name, e.g. `"Persistent Node.js (V8)"`.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Candidate commands in preference order. Each is an executable name or
	/// path, optionally followed by whitespace-separated arguments.
	pub fn commands(&self) -> &[String] {
		&self.commands
	}

	/// Engine-side program implementing the protocol loop.
	pub fn bootstrap(&self) -> &Path {
		&self.bootstrap
	}

	/// Whether one process serves every context of this runtime.
	pub fn shared_process(&self) -> bool {
		self.shared_process
	}

	pub fn max_frame_size(&self) -> Option<usize> {
		self.max_frame_size
	}

	/// Whether the engine's input cannot carry arbitrarily long lines.
	pub fn line_safe_transport(&self) -> bool {
		self.line_safe_transport
	}

	pub fn syntax_error_marker(&self) -> &str {
		&self.syntax_error_marker
	}

	/// Wire layout for requests to this engine.
	pub fn framing(&self) -> Framing {
		match (self.max_frame_size, self.line_safe_transport) {
			(Some(size), _) => Framing::chunked(size),
			(None, true) => Framing::chunked(DEFAULT_LINE_SAFE_FRAME_SIZE),
			(None, false) => Framing::Line,
		}
	}
}

/// Builder for [`RuntimeDescriptor`].
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
	descriptor: RuntimeDescriptor,
}

impl DescriptorBuilder {
	/// Appends a candidate command.
	pub fn command(mut self, command: impl Into<String>) -> Self {
		self.descriptor.commands.push(command.into());
		self
	}

	/// Appends several candidate commands.
	pub fn commands<I, S>(mut self, commands: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.descriptor
			.commands
			.extend(commands.into_iter().map(Into::into));
		self
	}

	pub fn bootstrap(mut self, path: impl Into<PathBuf>) -> Self {
		self.descriptor.bootstrap = path.into();
		self
	}

	pub fn shared_process(mut self, shared: bool) -> Self {
		self.descriptor.shared_process = shared;
		self
	}

	pub fn max_frame_size(mut self, size: usize) -> Self {
		self.descriptor.max_frame_size = Some(size);
		self
	}

	pub fn line_safe_transport(mut self, line_safe: bool) -> Self {
		self.descriptor.line_safe_transport = line_safe;
		self
	}

	pub fn syntax_error_marker(mut self, marker: impl Into<String>) -> Self {
		self.descriptor.syntax_error_marker = marker.into();
		self
	}

	pub fn build(self) -> RuntimeDescriptor {
		self.descriptor
	}
}
