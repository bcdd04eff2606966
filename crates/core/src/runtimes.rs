//! Runtime registry
//!
//! [`Runtimes`] is an ordered table of named runtimes. Entries registered with
//! [`Runtimes::register`] are auto-detection candidates, tried in registration
//! order; entries added with [`Runtimes::register_explicit`] can only be
//! selected by name.
//!
//! The built-in table, in preference order:
//!
//! | Name                       | Engine                      | Process     |
//! |----------------------------|-----------------------------|-------------|
//! | `PersistentNode`           | `nodejs`, `node`            | shared      |
//! | `PersistentJavaScriptCore` | macOS `jsc`                 | shared      |
//! | `PersistentJScript`        | `cscript //E:jscript`       | shared      |
//! | `Node`                     | `nodejs`, `node`            | per context |
//! | `Disabled`                 | none                        | by name     |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use jsbridge_runtime::RuntimeDescriptor;

use crate::disabled::DisabledRuntime;
use crate::external::ExternalRuntime;
use crate::runtime::Runtime;

/// Environment variable overriding the directory of bootstrap scripts.
pub const SUPPORT_DIR_ENV: &str = "JSBRIDGE_SUPPORT_DIR";

const JSC_PATH: &str = "/System/Library/Frameworks/JavaScriptCore.framework/Versions/A/Resources/jsc";

/// Directory holding the engine-side bootstrap scripts.
///
/// `JSBRIDGE_SUPPORT_DIR` wins when set; otherwise the `support/` directory
/// of this source tree.
pub fn support_dir() -> PathBuf {
	std::env::var_os(SUPPORT_DIR_ENV)
		.filter(|dir| !dir.is_empty())
		.map(PathBuf::from)
		.unwrap_or_else(|| PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../../support")))
}

struct Entry {
	name: String,
	runtime: Arc<dyn Runtime>,
	auto: bool,
}

/// Ordered table of named runtimes.
#[derive(Default)]
pub struct Runtimes {
	entries: Vec<Entry>,
}

impl Runtimes {
	/// An empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// The built-in runtimes, with bootstrap scripts from [`support_dir`].
	pub fn builtin() -> Self {
		Self::with_support_dir(&support_dir())
	}

	/// The built-in runtimes, with bootstrap scripts from `dir`.
	pub fn with_support_dir(dir: &Path) -> Self {
		let node_runner = dir.join("node_runner.js");
		let mut runtimes = Self::new();

		runtimes.register(
			"PersistentNode",
			ExternalRuntime::new(
				RuntimeDescriptor::builder("Persistent Node.js (V8)")
					.commands(["nodejs", "node"])
					.bootstrap(&node_runner)
					.shared_process(true)
					.build(),
			),
		);
		runtimes.register(
			"PersistentJavaScriptCore",
			ExternalRuntime::new(
				RuntimeDescriptor::builder("Persistent JavaScriptCore")
					.command(JSC_PATH)
					.bootstrap(dir.join("jsc_runner.js"))
					.shared_process(true)
					.build(),
			),
		);
		runtimes.register(
			"PersistentJScript",
			ExternalRuntime::new(
				RuntimeDescriptor::builder("Persistent JScript")
					.command("cscript //E:jscript //Nologo")
					.bootstrap(dir.join("jscript_runner.js"))
					.shared_process(true)
					.line_safe_transport(true)
					.build(),
			),
		);
		runtimes.register(
			"Node",
			ExternalRuntime::new(
				RuntimeDescriptor::builder("Node.js (V8)")
					.commands(["nodejs", "node"])
					.bootstrap(&node_runner)
					.build(),
			),
		);
		runtimes.register_explicit("Disabled", DisabledRuntime);
		runtimes
	}

	/// Adds an auto-detection candidate after the existing ones. A runtime
	/// registered under an existing name replaces it in place.
	pub fn register(&mut self, name: impl Into<String>, runtime: impl Runtime + 'static) {
		self.insert(name.into(), Arc::new(runtime), true);
	}

	/// Adds a runtime reachable only by name.
	pub fn register_explicit(&mut self, name: impl Into<String>, runtime: impl Runtime + 'static) {
		self.insert(name.into(), Arc::new(runtime), false);
	}

	fn insert(&mut self, name: String, runtime: Arc<dyn Runtime>, auto: bool) {
		let entry = Entry { name, runtime, auto };
		match self.entries.iter_mut().find(|existing| existing.name == entry.name) {
			Some(existing) => *existing = entry,
			None => self.entries.push(entry),
		}
	}

	pub fn get(&self, name: &str) -> Option<Arc<dyn Runtime>> {
		self.entries
			.iter()
			.find(|entry| entry.name == name)
			.map(|entry| Arc::clone(&entry.runtime))
	}

	/// Registered names, in registration order.
	pub fn names(&self) -> Vec<&str> {
		self.entries.iter().map(|entry| entry.name.as_str()).collect()
	}

	/// Auto-detection candidates with their names, in preference order.
	pub fn candidates(&self) -> impl Iterator<Item = (&str, &Arc<dyn Runtime>)> {
		self.entries
			.iter()
			.filter(|entry| entry.auto && !entry.runtime.is_deprecated())
			.map(|entry| (entry.name.as_str(), &entry.runtime))
	}

	/// First available auto-detection candidate.
	pub fn best_available(&self) -> Option<Arc<dyn Runtime>> {
		self.candidates()
			.find(|(_, runtime)| runtime.is_available())
			.map(|(_, runtime)| Arc::clone(runtime))
	}

	/// Stops every engine process the registered runtimes keep running.
	pub fn shutdown(&self) {
		for entry in &self.entries {
			entry.runtime.shutdown();
		}
	}
}

impl std::fmt::Debug for Runtimes {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_map()
			.entries(self.entries.iter().map(|entry| (&entry.name, entry.runtime.name())))
			.finish()
	}
}
