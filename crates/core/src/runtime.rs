//! The runtime capability shared by every engine flavour.

use std::fmt;

use jsbridge_runtime::Result;
use serde_json::Value;

use crate::context::Context;

/// One way of evaluating JavaScript.
///
/// Runtimes differ only in how they reach an engine; evaluation semantics
/// live in [`Context`].
pub trait Runtime: Send + Sync + fmt::Debug {
	/// Display name, e.g. `"Persistent Node.js (V8)"`.
	fn name(&self) -> &str;

	/// Whether the runtime can be used on this system. Never starts an engine.
	fn is_available(&self) -> bool;

	/// Deprecated runtimes are never picked by auto-detection.
	fn is_deprecated(&self) -> bool {
		false
	}

	/// Opens a context and evaluates `preamble` in it.
	fn compile(&self, preamble: &str) -> Result<Context>;

	/// Runs `source` as a function body in a throwaway context.
	fn exec(&self, source: &str) -> Result<Value> {
		let context = self.compile("")?;
		let result = context.exec(source);
		finish(context, result)
	}

	/// Evaluates an expression in a throwaway context.
	fn eval(&self, source: &str) -> Result<Value> {
		let context = self.compile("")?;
		let result = context.eval(source);
		finish(context, result)
	}

	/// Stops any engine process the runtime keeps running.
	fn shutdown(&self) {}

	/// Forgets the running engine process so the next context starts a new one.
	fn reset(&self) {}
}

impl dyn Runtime {
	/// Runs `f` with a context compiled from `preamble`, closing it on every
	/// exit path.
	pub fn with_context<T>(&self, preamble: &str, f: impl FnOnce(&Context) -> Result<T>) -> Result<T> {
		let context = self.compile(preamble)?;
		let result = f(&context);
		finish(context, result)
	}
}

/// Closes `context`, preferring the evaluation error over a teardown error.
fn finish<T>(context: Context, result: Result<T>) -> Result<T> {
	let closed = context.close();
	let value = result?;
	closed?;
	Ok(value)
}
