//! Runtimes backed by an engine process reached over stdio.
//!
//! An [`ExternalRuntime`] probes its descriptor's commands once, on the first
//! availability check or compile, and caches the result for its lifetime. A
//! [`ProcessManager`] built from the resolved command then starts or attaches
//! to engine processes as contexts are opened.

use std::fmt;
use std::sync::{Arc, OnceLock};

use jsbridge_runtime::{
	CommandLauncher, ContextId, Error, Launch, Locate, PathLocator, ProcessHandle, ProcessManager, Result,
	RuntimeDescriptor, resolve,
};
use serde_json::Value;
use tracing::debug;

use crate::context::{Context, Session, next_context_id};
use crate::runtime::Runtime;

/// A runtime spawning an external engine.
pub struct ExternalRuntime {
	descriptor: Arc<RuntimeDescriptor>,
	locator: Box<dyn Locate>,
	manager: OnceLock<Option<ProcessManager>>,
}

impl ExternalRuntime {
	/// Resolves commands on `PATH`.
	pub fn new(descriptor: RuntimeDescriptor) -> Self {
		Self::with_locator(descriptor, PathLocator::from_env())
	}

	pub fn with_locator(descriptor: RuntimeDescriptor, locator: impl Locate + 'static) -> Self {
		Self {
			descriptor: Arc::new(descriptor),
			locator: Box::new(locator),
			manager: OnceLock::new(),
		}
	}

	/// Skips probing and starts processes through `launcher`.
	pub fn with_launcher(descriptor: RuntimeDescriptor, launcher: impl Launch + 'static) -> Self {
		let descriptor = Arc::new(descriptor);
		let manager = OnceLock::new();
		let _ = manager.set(Some(ProcessManager::new(Arc::clone(&descriptor), Box::new(launcher))));
		Self {
			descriptor,
			locator: Box::new(PathLocator::from_env()),
			manager,
		}
	}

	pub fn descriptor(&self) -> &RuntimeDescriptor {
		&self.descriptor
	}

	fn manager(&self) -> Option<&ProcessManager> {
		self.manager
			.get_or_init(|| {
				let command = resolve(self.descriptor.commands(), self.locator.as_ref())?;
				debug!(target = "jsbridge.probe", runtime = self.descriptor.name(), command = %command, "runtime available");
				Some(ProcessManager::new(
					Arc::clone(&self.descriptor),
					Box::new(CommandLauncher::new(command)),
				))
			})
			.as_ref()
	}
}

impl Runtime for ExternalRuntime {
	fn name(&self) -> &str {
		self.descriptor.name()
	}

	fn is_available(&self) -> bool {
		self.manager().is_some_and(|manager| manager.failure().is_none())
	}

	fn compile(&self, preamble: &str) -> Result<Context> {
		let manager = self.manager().ok_or_else(|| {
			Error::Unavailable(format!("{} runtime is not available on this system", self.name()))
		})?;

		let session = PipeSession {
			id: next_context_id(),
			marker: self.descriptor.syntax_error_marker().to_string(),
			handle: manager.start()?,
		};
		Context::new(self.name(), Box::new(session), preamble)
	}

	fn shutdown(&self) {
		if let Some(manager) = self.manager.get().and_then(Option::as_ref) {
			manager.shutdown();
		}
	}

	fn reset(&self) {
		if let Some(manager) = self.manager.get().and_then(Option::as_ref) {
			manager.reset();
		}
	}
}

impl fmt::Debug for ExternalRuntime {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ExternalRuntime")
			.field("descriptor", &self.descriptor)
			.field("manager", &self.manager.get())
			.finish()
	}
}

/// Context session over a shared or owned engine process.
struct PipeSession {
	id: ContextId,
	marker: String,
	handle: ProcessHandle,
}

impl Session for PipeSession {
	fn id(&self) -> ContextId {
		self.id
	}

	fn evaluate_string(&mut self, source: &str) -> Result<Value> {
		let request = jsbridge_protocol::Request::eval(self.id, source);
		match &mut self.handle {
			ProcessHandle::Shared(process) => process.lock().evaluate(&request, &self.marker),
			ProcessHandle::Owned(process) => process.evaluate(&request, &self.marker),
		}
	}

	fn close(&mut self) -> Result<()> {
		match &mut self.handle {
			ProcessHandle::Shared(process) => {
				let mut process = process.lock();
				// A dead or replaced engine holds no state for this context.
				if process.is_alive() {
					process.teardown(self.id)?;
				}
				Ok(())
			}
			ProcessHandle::Owned(process) => {
				process.close();
				Ok(())
			}
		}
	}
}
