//! Evaluation contexts
//!
//! A [`Context`] is one isolated evaluation session bound to a runtime. Its
//! globals persist between calls and are invisible to other contexts, even
//! when several contexts share one engine process.
//!
//! Contexts must be closed. [`Context::close`] is idempotent and is also run
//! on drop, but an explicit close (or [`with_context`](crate::Runtime)) is the
//! only way to observe a failed teardown.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use jsbridge_runtime::{ContextId, Error, Result};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates a context id unique for the life of the host process.
pub fn next_context_id() -> ContextId {
	NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Engine-side half of a context: sends raw source and tears down.
pub trait Session: Send {
	/// Correlation id of this session on the wire.
	fn id(&self) -> ContextId;

	/// Evaluates `source` as given and returns the engine's value.
	fn evaluate_string(&mut self, source: &str) -> Result<Value>;

	/// Releases the engine-side state. Called at most once.
	fn close(&mut self) -> Result<()>;
}

/// A logical evaluation session.
///
/// Calls on one context are serialized by an internal lock, so a context may
/// be shared between threads. Closing while another thread is still
/// evaluating on the same context is the caller's responsibility to avoid.
pub struct Context {
	id: ContextId,
	runtime: String,
	session: Mutex<Option<Box<dyn Session>>>,
}

impl Context {
	/// Wraps `session` and evaluates `preamble` in it.
	///
	/// The preamble is sent unwrapped, so its declarations become globals of
	/// the context. On failure the session is closed before returning.
	pub fn new(runtime: impl Into<String>, session: Box<dyn Session>, preamble: &str) -> Result<Self> {
		let context = Self {
			id: session.id(),
			runtime: runtime.into(),
			session: Mutex::new(Some(session)),
		};
		debug!(target = "jsbridge.context", runtime = %context.runtime, context_id = context.id, "context opened");

		context.evaluate_string(preamble)?;
		Ok(context)
	}

	pub fn id(&self) -> ContextId {
		self.id
	}

	/// Name of the runtime this context belongs to.
	pub fn runtime(&self) -> &str {
		&self.runtime
	}

	pub fn is_closed(&self) -> bool {
		self.session.lock().is_none()
	}

	/// Runs `source` as a function body. A `return` statement yields the
	/// result; without one the result is `null`.
	pub fn exec(&self, source: &str) -> Result<Value> {
		self.eval(&format!("(function(){{{source}}})()"))
	}

	/// Evaluates an expression and returns its JSON value.
	///
	/// Whitespace-only input yields `null` without contacting the engine.
	pub fn eval(&self, source: &str) -> Result<Value> {
		let expression = source.trim().trim_end_matches(';');
		if expression.trim().is_empty() {
			return Ok(Value::Null);
		}

		let encoded = self.evaluate_string(&format!("JSON.stringify([{expression}])"))?;
		match encoded {
			Value::String(text) => {
				let mut items: Vec<Value> = serde_json::from_str(&text)?;
				Ok(if items.is_empty() {
					Value::Null
				} else {
					items.swap_remove(0)
				})
			}
			other => Ok(other),
		}
	}

	/// Calls the function at `path` (e.g. `"JSON.parse"`) with `args`.
	pub fn call(&self, path: &str, args: &[Value]) -> Result<Value> {
		let args = serde_json::to_string(args)?;
		self.eval(&format!("{path}.apply(this, {args})"))
	}

	/// Sends raw source to the engine, without any wrapping.
	pub fn evaluate_string(&self, source: &str) -> Result<Value> {
		let mut session = self.session.lock();
		let session = session.as_mut().ok_or(Error::ContextClosed(self.id))?;
		session.evaluate_string(source)
	}

	/// Releases the context's engine-side state. Closing again is a no-op.
	pub fn close(&self) -> Result<()> {
		let Some(mut session) = self.session.lock().take() else {
			return Ok(());
		};
		let result = session.close();
		debug!(target = "jsbridge.context", runtime = %self.runtime, context_id = self.id, ok = result.is_ok(), "context closed");
		result
	}
}

impl fmt::Debug for Context {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Context")
			.field("id", &self.id)
			.field("runtime", &self.runtime)
			.field("closed", &self.is_closed())
			.finish()
	}
}

impl Drop for Context {
	fn drop(&mut self) {
		if let Err(e) = self.close() {
			warn!(target = "jsbridge.context", runtime = %self.runtime, context_id = self.id, error = %e, "teardown on drop failed");
		}
	}
}
