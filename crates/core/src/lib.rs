//! jsbridge - evaluate JavaScript through an external engine
//!
//! Delegates evaluation to whichever JavaScript engine is installed, talking
//! to it over its standard streams. Callers pick nothing: the selector finds
//! an available runtime (or honours `JSBRIDGE_RUNTIME`), and contexts hide
//! whether the engine process is shared or private.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  Selector / Runtimes │  Override, priority order, availability
//! └──────────┬───────────┘
//!            │ Arc<dyn Runtime>
//! ┌──────────▼───────────┐
//! │   Runtime::compile   │  ExternalRuntime, DisabledRuntime
//! └──────────┬───────────┘
//!            │ Context (exec / eval / call / close)
//! ┌──────────▼───────────┐
//! │   jsbridge-runtime   │  Process manager, pipe transport
//! └──────────┬───────────┘
//!            │ [id, source] ⇄ [status, value]
//! ┌──────────▼───────────┐
//! │    engine process    │  support/*_runner.js
//! └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! let runtime = jsbridge::runtime()?;
//! let context = runtime.compile("function add(a, b) { return a + b }")?;
//! assert_eq!(context.call("add", &[1.into(), 2.into()])?, 3);
//! context.close()?;
//! ```

pub mod context;
pub mod disabled;
pub mod external;
pub mod runtime;
pub mod runtimes;
pub mod select;

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

pub use context::{Context, Session};
pub use disabled::DisabledRuntime;
pub use external::ExternalRuntime;
pub use jsbridge_runtime::{Error, Result, RuntimeDescriptor};
pub use runtime::Runtime;
pub use runtimes::{Runtimes, SUPPORT_DIR_ENV, support_dir};
pub use select::{RUNTIME_ENV, Selector};

static DEFAULT_RUNTIME: Mutex<Option<Arc<dyn Runtime>>> = Mutex::new(None);

/// Selects a runtime from the built-in table, honouring `JSBRIDGE_RUNTIME`.
///
/// Every call builds a fresh table, so the returned runtime owns its own
/// engine process. Use [`runtime`] to share one.
pub fn autodetect() -> Result<Arc<dyn Runtime>> {
	Selector::from_env(Runtimes::builtin()).select()
}

/// The process-wide default runtime, auto-detected on first use.
pub fn runtime() -> Result<Arc<dyn Runtime>> {
	let mut slot = DEFAULT_RUNTIME.lock();
	if let Some(runtime) = slot.as_ref() {
		return Ok(Arc::clone(runtime));
	}
	let runtime = autodetect()?;
	*slot = Some(Arc::clone(&runtime));
	Ok(runtime)
}

/// Replaces the process-wide default runtime.
///
/// # Errors
///
/// Returns [`Error::Unavailable`] if `runtime` cannot run here; the current
/// default is left in place.
pub fn set_runtime(runtime: Arc<dyn Runtime>) -> Result<()> {
	if !runtime.is_available() {
		return Err(Error::Unavailable(format!(
			"{} runtime is not available on this system",
			runtime.name()
		)));
	}
	debug!(target = "jsbridge.select", runtime = runtime.name(), "default runtime assigned");
	*DEFAULT_RUNTIME.lock() = Some(runtime);
	Ok(())
}

/// Runs `source` as a function body on the default runtime.
pub fn exec(source: &str) -> Result<Value> {
	runtime()?.exec(source)
}

/// Evaluates an expression on the default runtime.
pub fn eval(source: &str) -> Result<Value> {
	runtime()?.eval(source)
}

/// Opens a context on the default runtime, evaluating `preamble` in it.
pub fn compile(preamble: &str) -> Result<Context> {
	runtime()?.compile(preamble)
}
