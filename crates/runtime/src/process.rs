//! Engine process management
//!
//! A [`Process`] wraps one spawned engine: its child handle and a
//! [`LineTransport`] over stdin/stdout. The child's stderr is drained on a
//! background thread into the log so a chatty engine never blocks on a full
//! pipe.
//!
//! A process is either alive or dead. It dies when it is closed, when a read
//! or write fails, or when a response is missing or unreadable. A dead
//! process refuses further requests; the manager replaces it on next attach.
//!
//! Liveness and the child handle live in a [`Lifeline`] shared outside the
//! exchange lock, so a hung engine can be killed while another thread is
//! blocked reading from it.

use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStderr, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use jsbridge_protocol::{ContextId, Framing, Reply, Request};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::descriptor::RuntimeDescriptor;
use crate::error::{Error, Result};
use crate::probe::ResolvedCommand;
use crate::transport::{LineTransport, Reader, Writer};

/// How long a closed engine gets to exit on its own before it is killed.
const EXIT_GRACE: Duration = Duration::from_millis(200);
const EXIT_POLL: Duration = Duration::from_millis(10);

/// Liveness flag and child handle of one engine, shared by clones.
#[derive(Debug, Clone)]
pub struct Lifeline {
	runtime: Arc<str>,
	state: Arc<LifelineState>,
}

#[derive(Debug)]
struct LifelineState {
	alive: AtomicBool,
	child: Mutex<Option<Child>>,
}

impl Lifeline {
	fn new(runtime: &str, child: Option<Child>) -> Self {
		Self {
			runtime: Arc::from(runtime),
			state: Arc::new(LifelineState {
				alive: AtomicBool::new(true),
				child: Mutex::new(child),
			}),
		}
	}

	/// Whether the engine can take requests. Reaps a child that has exited.
	pub fn is_alive(&self) -> bool {
		if !self.state.alive.load(Ordering::Acquire) {
			return false;
		}
		if let Some(child) = self.state.child.lock().as_mut() {
			if let Ok(Some(status)) = child.try_wait() {
				debug!(target = "jsbridge.process", runtime = %self.runtime, %status, "engine exited");
				self.state.alive.store(false, Ordering::Release);
			}
		}
		self.state.alive.load(Ordering::Acquire)
	}

	pub fn pid(&self) -> Option<u32> {
		self.state.child.lock().as_ref().map(Child::id)
	}

	/// Marks the engine unusable without touching the child.
	pub fn mark_dead(&self) {
		if self.state.alive.swap(false, Ordering::AcqRel) {
			warn!(target = "jsbridge.process", runtime = %self.runtime, pid = ?self.pid(), "marking engine process dead");
		}
	}

	/// Kills the child immediately and marks the engine dead.
	///
	/// A thread blocked reading the engine's stdout sees end of stream once
	/// the child is gone.
	pub fn kill(&self) {
		self.state.alive.store(false, Ordering::Release);
		let child = self.state.child.lock().take();
		if let Some(child) = child {
			self.kill_child(child);
		}
	}

	/// Waits briefly for the child to exit on its own, then kills it.
	fn reap(&self) {
		self.state.alive.store(false, Ordering::Release);
		let child = self.state.child.lock().take();
		let Some(mut child) = child else {
			return;
		};
		let deadline = Instant::now() + EXIT_GRACE;
		loop {
			match child.try_wait() {
				Ok(Some(status)) => {
					debug!(target = "jsbridge.process", runtime = %self.runtime, %status, "engine closed");
					return;
				}
				Ok(None) if Instant::now() < deadline => thread::sleep(EXIT_POLL),
				_ => break,
			}
		}
		self.kill_child(child);
	}

	fn kill_child(&self, mut child: Child) {
		if let Err(e) = child.kill() {
			debug!(target = "jsbridge.process", runtime = %self.runtime, error = %e, "kill failed");
		}
		let _ = child.wait();
		debug!(target = "jsbridge.process", runtime = %self.runtime, "engine killed");
	}
}

/// One engine process and its streams.
#[derive(Debug)]
pub struct Process {
	runtime: String,
	lifeline: Lifeline,
	transport: LineTransport,
}

impl Process {
	/// Spawns `command` running the descriptor's bootstrap program.
	///
	/// Returns as soon as the child is started; nothing is read from it.
	///
	/// # Errors
	///
	/// Returns [`Error::SpawnFailed`] if the OS refuses to start the child.
	pub fn spawn(descriptor: &RuntimeDescriptor, command: &ResolvedCommand) -> Result<Self> {
		let mut cmd = command.command(descriptor.bootstrap());
		cmd.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped());

		let spawn_failed = |reason: String| Error::SpawnFailed {
			runtime: descriptor.name().to_string(),
			reason,
		};

		let mut child = cmd
			.spawn()
			.map_err(|e| spawn_failed(format!("{command}: {e}")))?;

		let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
			let _ = child.kill();
			let _ = child.wait();
			return Err(spawn_failed("child streams were not captured".to_string()));
		};
		if let Some(stderr) = child.stderr.take() {
			drain_stderr(descriptor.name(), child.id(), stderr);
		}

		debug!(target = "jsbridge.process", runtime = descriptor.name(), pid = child.id(), command = %command, "spawned engine");

		Ok(Self {
			runtime: descriptor.name().to_string(),
			lifeline: Lifeline::new(descriptor.name(), Some(child)),
			transport: LineTransport::new(
				Box::new(stdin),
				Box::new(BufReader::new(stdout)),
				descriptor.framing(),
			),
		})
	}

	/// Wraps already connected streams, with no child to supervise.
	pub fn from_streams(runtime: impl Into<String>, writer: Writer, reader: Reader, framing: Framing) -> Self {
		let runtime = runtime.into();
		Self {
			lifeline: Lifeline::new(&runtime, None),
			runtime,
			transport: LineTransport::new(writer, reader, framing),
		}
	}

	pub fn runtime(&self) -> &str {
		&self.runtime
	}

	pub fn pid(&self) -> Option<u32> {
		self.lifeline.pid()
	}

	/// Handle that can check or end this process without holding it.
	pub fn lifeline(&self) -> Lifeline {
		self.lifeline.clone()
	}

	/// Whether the process can take requests. Reaps a child that has exited.
	pub fn is_alive(&self) -> bool {
		self.lifeline.is_alive()
	}

	/// Marks the process unusable. Its streams stay open until [`close`](Self::close).
	pub fn mark_dead(&self) {
		self.lifeline.mark_dead();
	}

	/// Sends one request and reads the line answering it.
	///
	/// Any transport failure marks the process dead.
	pub fn exchange(&mut self, request: &Request) -> Result<Option<String>> {
		if !self.lifeline.is_alive() {
			return Err(Error::ProtocolDesync(format!("{} process is not running", self.runtime)));
		}
		let result = self.transport.round_trip(request);
		if result.is_err() {
			self.mark_dead();
		}
		result
	}

	/// Evaluates a request and classifies the engine's answer.
	///
	/// Syntax and program errors leave the process usable. A missing or
	/// unreadable response marks it dead.
	pub fn evaluate(&mut self, request: &Request, syntax_marker: &str) -> Result<Value> {
		let line = self.exchange(request)?;
		match Reply::from_line(line.as_deref(), syntax_marker) {
			Ok(Reply::Ok(value)) => Ok(value),
			Ok(Reply::SyntaxError(message)) => Err(Error::Syntax(message)),
			Ok(Reply::ProgramError(message)) => Err(Error::Program(message)),
			Ok(Reply::Absent) => {
				self.mark_dead();
				Err(Error::ProtocolDesync(format!(
					"no response from {} for context {}",
					self.runtime,
					request.context_id()
				)))
			}
			Err(e) => {
				self.mark_dead();
				Err(Error::ProtocolDesync(format!("malformed response from {}: {e}", self.runtime)))
			}
		}
	}

	/// Tells the engine to discard a context's state.
	///
	/// Reads and discards exactly one response line to keep requests and
	/// responses paired.
	pub fn teardown(&mut self, context_id: ContextId) -> Result<()> {
		let line = self.exchange(&Request::teardown(context_id))?;
		if line.is_none() {
			self.mark_dead();
			return Err(Error::ProtocolDesync(format!(
				"no teardown response from {} for context {context_id}",
				self.runtime
			)));
		}
		debug!(target = "jsbridge.process", runtime = %self.runtime, context_id, "context torn down");
		Ok(())
	}

	/// Closes the streams and reaps the child, killing it if it does not exit
	/// within a short grace period. Safe to call repeatedly.
	pub fn close(&mut self) {
		self.lifeline.state.alive.store(false, Ordering::Release);
		self.transport.close();
		self.lifeline.reap();
	}

	/// Kills the child immediately and marks the process dead.
	pub fn kill(&mut self) {
		self.lifeline.kill();
		self.transport.close();
	}
}

impl Drop for Process {
	fn drop(&mut self) {
		self.close();
	}
}

fn drain_stderr(runtime: &str, pid: u32, stderr: ChildStderr) {
	let runtime = runtime.to_string();
	let spawned = thread::Builder::new()
		.name(format!("engine-stderr-{pid}"))
		.spawn(move || {
			for line in BufReader::new(stderr).lines() {
				match line {
					Ok(line) => debug!(target = "jsbridge.process", runtime = %runtime, pid, stderr = %line),
					Err(_) => break,
				}
			}
		});
	if let Err(e) = spawned {
		warn!(target = "jsbridge.process", pid, error = %e, "could not drain engine stderr");
	}
}
