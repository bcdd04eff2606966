//! Process manager: spawn-or-attach per runtime.
//!
//! For a shared-process descriptor the manager keeps one [`SharedProcess`]
//! and hands it to every context; the slot lock makes concurrent first use
//! spawn exactly once, and a dead process is replaced on the next attach. For
//! a per-context descriptor every start spawns a fresh process owned by the
//! caller.
//!
//! A spawn failure is remembered: the runtime stays unavailable for the life
//! of the manager instead of retrying the spawn on every call.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::descriptor::RuntimeDescriptor;
use crate::error::{Error, Result};
use crate::probe::ResolvedCommand;
use crate::process::{Lifeline, Process};

/// A process serving many contexts. The lock is held for a full
/// request/response exchange.
pub type SharedProcess = Arc<Mutex<Process>>;

/// Capability starting an engine process for a descriptor.
pub trait Launch: Send + Sync {
	fn launch(&self, descriptor: &RuntimeDescriptor) -> Result<Process>;
}

/// [`Launch`] spawning a resolved OS command.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
	command: ResolvedCommand,
}

impl CommandLauncher {
	pub fn new(command: ResolvedCommand) -> Self {
		Self { command }
	}
}

impl Launch for CommandLauncher {
	fn launch(&self, descriptor: &RuntimeDescriptor) -> Result<Process> {
		Process::spawn(descriptor, &self.command)
	}
}

/// Process handed to one context.
#[derive(Debug)]
pub enum ProcessHandle {
	/// Borrowed from the manager's shared slot.
	Shared(SharedProcess),
	/// Owned by the context and closed with it.
	Owned(Process),
}

/// The shared process and its lifeline, checked without the exchange lock.
struct Slot {
	process: SharedProcess,
	lifeline: Lifeline,
}

/// Starts and tracks engine processes for one runtime.
pub struct ProcessManager {
	descriptor: Arc<RuntimeDescriptor>,
	launcher: Box<dyn Launch>,
	shared: Mutex<Option<Slot>>,
	failure: OnceLock<String>,
}

impl ProcessManager {
	pub fn new(descriptor: Arc<RuntimeDescriptor>, launcher: Box<dyn Launch>) -> Self {
		Self {
			descriptor,
			launcher,
			shared: Mutex::new(None),
			failure: OnceLock::new(),
		}
	}

	/// Reason the runtime could not be spawned, if a spawn ever failed.
	pub fn failure(&self) -> Option<&str> {
		self.failure.get().map(String::as_str)
	}

	/// Returns a process for a new context: the shared one (spawned on first
	/// use) or a fresh owned one.
	pub fn start(&self) -> Result<ProcessHandle> {
		if self.descriptor.shared_process() {
			self.attach().map(ProcessHandle::Shared)
		} else {
			self.launch().map(ProcessHandle::Owned)
		}
	}

	/// Returns the live shared process, spawning it if there is none.
	///
	/// Never waits on an exchange in progress: liveness comes from the
	/// lifeline.
	pub fn attach(&self) -> Result<SharedProcess> {
		let mut slot = self.shared.lock();
		if let Some(current) = slot.as_ref() {
			if current.lifeline.is_alive() {
				return Ok(Arc::clone(&current.process));
			}
			info!(target = "jsbridge.process", runtime = self.descriptor.name(), "shared engine is dead; respawning");
		}

		let process = self.launch()?;
		let lifeline = process.lifeline();
		let process = Arc::new(Mutex::new(process));
		let previous = slot.replace(Slot {
			process: Arc::clone(&process),
			lifeline,
		});
		drop(slot);
		// The old process closes once its last context lets go of it.
		drop(previous);
		Ok(process)
	}

	/// Kills the shared process so the next attach respawns it. Contexts
	/// still holding it fail with a protocol error, including one blocked
	/// waiting on a hung engine.
	pub fn reset(&self) {
		let lifeline = self.shared.lock().as_ref().map(|slot| slot.lifeline.clone());
		if let Some(lifeline) = lifeline {
			info!(target = "jsbridge.process", runtime = self.descriptor.name(), "resetting shared engine");
			lifeline.kill();
		}
	}

	/// Closes the shared process, if any. A process busy with an exchange is
	/// killed instead.
	pub fn shutdown(&self) {
		let Some(slot) = self.shared.lock().take() else {
			return;
		};
		match slot.process.try_lock() {
			Some(mut process) => process.close(),
			None => slot.lifeline.kill(),
		}
		debug!(target = "jsbridge.process", runtime = self.descriptor.name(), "shared engine shut down");
	}

	fn launch(&self) -> Result<Process> {
		if let Some(reason) = self.failure.get() {
			return Err(Error::SpawnFailed {
				runtime: self.descriptor.name().to_string(),
				reason: reason.clone(),
			});
		}

		match self.launcher.launch(&self.descriptor) {
			Ok(process) => Ok(process),
			Err(Error::SpawnFailed { runtime, reason }) => {
				warn!(target = "jsbridge.process", runtime = %runtime, reason = %reason, "engine spawn failed; runtime disabled");
				let _ = self.failure.set(reason.clone());
				Err(Error::SpawnFailed { runtime, reason })
			}
			Err(err) => Err(err),
		}
	}
}

impl std::fmt::Debug for ProcessManager {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ProcessManager")
			.field("runtime", &self.descriptor.name())
			.field("failure", &self.failure.get())
			.finish()
	}
}

impl Drop for ProcessManager {
	fn drop(&mut self) {
		self.shutdown();
	}
}

#[cfg(test)]
mod tests {
	use std::thread;

	use jsbridge_protocol::Request;
	use serde_json::json;

	use super::*;
	use crate::testing::FakeLauncher;

	fn manager(shared: bool, launcher: FakeLauncher) -> ProcessManager {
		let descriptor = RuntimeDescriptor::builder("fake")
			.shared_process(shared)
			.build();
		ProcessManager::new(Arc::new(descriptor), Box::new(launcher))
	}

	#[test]
	fn test_shared_attach_is_idempotent() {
		let launcher = FakeLauncher::new();
		let manager = manager(true, launcher.clone());

		let first = manager.attach().unwrap();
		let second = manager.attach().unwrap();

		assert!(Arc::ptr_eq(&first, &second));
		assert_eq!(launcher.launches(), 1);
	}

	#[test]
	fn test_concurrent_first_use_spawns_once() {
		let launcher = FakeLauncher::new();
		let manager = Arc::new(manager(true, launcher.clone()));

		let handles: Vec<_> = (0..8)
			.map(|_| {
				let manager = Arc::clone(&manager);
				thread::spawn(move || manager.attach().map(|_| ()))
			})
			.collect();
		for handle in handles {
			handle.join().unwrap().unwrap();
		}

		assert_eq!(launcher.launches(), 1);
	}

	#[test]
	fn test_per_context_start_spawns_every_time() {
		let launcher = FakeLauncher::new();
		let manager = manager(false, launcher.clone());

		assert!(matches!(manager.start().unwrap(), ProcessHandle::Owned(_)));
		assert!(matches!(manager.start().unwrap(), ProcessHandle::Owned(_)));
		assert_eq!(launcher.launches(), 2);
	}

	#[test]
	fn test_dead_shared_process_is_respawned() {
		let launcher = FakeLauncher::new();
		let manager = manager(true, launcher.clone());

		let process = manager.attach().unwrap();
		let err = process
			.lock()
			.evaluate(&Request::eval(1, "__exit__"), "SyntaxError")
			.unwrap_err();
		assert!(err.is_fatal());

		let replacement = manager.attach().unwrap();
		assert!(!Arc::ptr_eq(&process, &replacement));
		assert_eq!(launcher.launches(), 2);
		assert_eq!(
			replacement
				.lock()
				.evaluate(&Request::eval(2, "2 + 2"), "SyntaxError")
				.unwrap(),
			json!(4)
		);
	}

	#[test]
	fn test_reset_forces_respawn() {
		let launcher = FakeLauncher::new();
		let manager = manager(true, launcher.clone());

		manager.attach().unwrap();
		manager.reset();
		manager.attach().unwrap();
		assert_eq!(launcher.launches(), 2);
	}

	#[test]
	fn test_reset_does_not_wait_for_a_busy_exchange() {
		let launcher = FakeLauncher::new();
		let manager = manager(true, launcher.clone());

		let process = manager.attach().unwrap();
		let busy = process.lock();

		manager.reset();
		assert!(!busy.is_alive());

		let replacement = manager.attach().unwrap();
		assert!(!Arc::ptr_eq(&process, &replacement));
		assert_eq!(
			replacement
				.lock()
				.evaluate(&Request::eval(1, "2 + 2"), "SyntaxError")
				.unwrap(),
			json!(4)
		);
		drop(busy);
	}

	#[test]
	fn test_spawn_failure_is_permanent() {
		let launcher = FakeLauncher::failing();
		let manager = manager(true, launcher.clone());

		assert!(matches!(manager.attach(), Err(Error::SpawnFailed { .. })));
		assert!(manager.failure().is_some());
		assert!(matches!(manager.attach(), Err(Error::SpawnFailed { .. })));
		assert_eq!(launcher.launches(), 1);
	}
}
