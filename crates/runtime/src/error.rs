//! Error types for engine runtimes.

use jsbridge_protocol::ContextId;
use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while selecting, starting, or talking to an engine.
#[derive(Debug, Error)]
pub enum Error {
	/// No executable could be resolved for the runtime.
	#[error("{0}")]
	Unavailable(String),

	/// An explicitly requested runtime name is not registered.
	#[error("{0} runtime is not defined")]
	NotDefined(String),

	/// The engine process could not be started despite a successful probe.
	#[error("Failed to launch {runtime}: {reason}")]
	SpawnFailed { runtime: String, reason: String },

	/// The engine closed its streams or answered with something unreadable.
	#[error("Protocol error: {0}")]
	ProtocolDesync(String),

	/// The engine rejected the source as malformed. Carries the raw message.
	#[error("{0}")]
	Syntax(String),

	/// The evaluated code raised or threw. Carries the raw message.
	#[error("{0}")]
	Program(String),

	/// The runtime is the disabled stand-in.
	#[error("Script evaluation is disabled")]
	Disabled,

	/// The context was already closed.
	#[error("Context {0} is closed")]
	ContextClosed(ContextId),

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true for errors that end the usefulness of a runtime or process,
	/// as opposed to errors describing the evaluated code.
	pub fn is_fatal(&self) -> bool {
		matches!(
			self,
			Error::Unavailable(_)
				| Error::NotDefined(_)
				| Error::SpawnFailed { .. }
				| Error::ProtocolDesync(_)
				| Error::Io(_)
		)
	}

	/// Returns true if the engine reported a syntax error or a thrown error.
	pub fn is_recoverable(&self) -> bool {
		matches!(self, Error::Syntax(_) | Error::Program(_))
	}

	/// Returns the engine's raw message for syntax and program errors.
	pub fn engine_message(&self) -> Option<&str> {
		match self {
			Error::Syntax(message) | Error::Program(message) => Some(message),
			_ => None,
		}
	}
}
