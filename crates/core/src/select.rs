//! Runtime selection
//!
//! Picks a runtime from a [`Runtimes`] table:
//! 1. A non-empty override name (from `JSBRIDGE_RUNTIME` or set explicitly)
//!    must name a registered, available runtime; otherwise selection fails.
//! 2. Without an override, the first available auto-detection candidate wins.
//!
//! An explicit request never falls through to another runtime.

use std::sync::Arc;

use jsbridge_runtime::{Error, Result};
use tracing::{debug, warn};

use crate::runtime::Runtime;
use crate::runtimes::Runtimes;

/// Environment variable naming the runtime to force.
pub const RUNTIME_ENV: &str = "JSBRIDGE_RUNTIME";

const NOT_FOUND: &str = "Could not find a JavaScript runtime. Install Node.js or set JSBRIDGE_RUNTIME to one of the registered runtimes.";

/// Chooses a runtime by override or availability.
#[derive(Debug)]
pub struct Selector {
	runtimes: Runtimes,
	override_name: Option<String>,
}

impl Selector {
	/// Auto-detects over `runtimes`, with no override.
	pub fn new(runtimes: Runtimes) -> Self {
		Self {
			runtimes,
			override_name: None,
		}
	}

	/// Takes the override from `JSBRIDGE_RUNTIME`.
	pub fn from_env(runtimes: Runtimes) -> Self {
		Self {
			runtimes,
			override_name: std::env::var(RUNTIME_ENV).ok(),
		}
	}

	/// Forces `name`. An empty name means auto-detect.
	pub fn with_override(mut self, name: impl Into<String>) -> Self {
		self.override_name = Some(name.into());
		self
	}

	pub fn runtimes(&self) -> &Runtimes {
		&self.runtimes
	}

	pub fn override_name(&self) -> Option<&str> {
		self.override_name.as_deref().filter(|name| !name.is_empty())
	}

	/// Returns the forced runtime or the best available one.
	///
	/// # Errors
	///
	/// - [`Error::NotDefined`] if the override names no registered runtime
	/// - [`Error::Unavailable`] if the forced runtime cannot run, or nothing
	///   can be auto-detected
	pub fn select(&self) -> Result<Arc<dyn Runtime>> {
		self.select_excluding(&[])
	}

	/// Like [`select`](Self::select), but auto-detection skips the runtimes
	/// named in `excluded`. An override is honoured regardless.
	pub fn select_excluding(&self, excluded: &[&str]) -> Result<Arc<dyn Runtime>> {
		if let Some(name) = self.override_name() {
			return self.forced(name);
		}

		let selected = self
			.runtimes
			.candidates()
			.filter(|(name, _)| !excluded.contains(name))
			.find(|(_, runtime)| runtime.is_available());
		match selected {
			Some((name, runtime)) => {
				debug!(target = "jsbridge.select", registered = name, runtime = runtime.name(), "auto-detected runtime");
				Ok(Arc::clone(runtime))
			}
			None => Err(Error::Unavailable(NOT_FOUND.to_string())),
		}
	}

	fn forced(&self, name: &str) -> Result<Arc<dyn Runtime>> {
		let runtime = self
			.runtimes
			.get(name)
			.ok_or_else(|| Error::NotDefined(name.to_string()))?;

		if !runtime.is_available() {
			return Err(Error::Unavailable(format!(
				"{} runtime is not available on this system",
				runtime.name()
			)));
		}
		if runtime.is_deprecated() {
			warn!(target = "jsbridge.select", registered = name, runtime = runtime.name(), "selected runtime is deprecated");
		}
		debug!(target = "jsbridge.select", registered = name, runtime = runtime.name(), "runtime forced by override");
		Ok(runtime)
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use jsbridge_runtime::testing::FakeLauncher;
	use jsbridge_runtime::{Locate, RuntimeDescriptor};

	use super::*;
	use crate::disabled::DisabledRuntime;
	use crate::external::ExternalRuntime;

	struct NoEngines;

	impl Locate for NoEngines {
		fn locate(&self, _program: &str) -> Option<PathBuf> {
			None
		}
	}

	fn available(name: &str) -> ExternalRuntime {
		let descriptor = RuntimeDescriptor::builder(name).shared_process(true).build();
		ExternalRuntime::with_launcher(descriptor, FakeLauncher::new())
	}

	fn missing(name: &str) -> ExternalRuntime {
		let descriptor = RuntimeDescriptor::builder(name).command("missing-engine").build();
		ExternalRuntime::with_locator(descriptor, NoEngines)
	}

	fn table() -> Runtimes {
		let mut runtimes = Runtimes::new();
		runtimes.register("Missing", missing("Missing Engine"));
		runtimes.register("First", available("First Engine"));
		runtimes.register("Second", available("Second Engine"));
		runtimes.register_explicit("Disabled", DisabledRuntime);
		runtimes
	}

	#[test]
	fn auto_detect_returns_first_available() {
		let runtime = Selector::new(table()).select().unwrap();
		assert_eq!(runtime.name(), "First Engine");
		assert!(runtime.is_available());
	}

	#[test]
	fn auto_detect_can_exclude_a_failed_runtime() {
		let runtime = Selector::new(table()).select_excluding(&["First"]).unwrap();
		assert_eq!(runtime.name(), "Second Engine");
	}

	#[test]
	fn nothing_available_is_unavailable() {
		let mut runtimes = Runtimes::new();
		runtimes.register("Missing", missing("Missing Engine"));
		let err = Selector::new(runtimes).select().unwrap_err();
		assert!(matches!(&err, Error::Unavailable(m) if m.contains("Could not find")), "got {err:?}");
	}

	#[test]
	fn override_picks_named_runtime() {
		let runtime = Selector::new(table()).with_override("Second").select().unwrap();
		assert_eq!(runtime.name(), "Second Engine");
	}

	#[test]
	fn override_naming_unavailable_runtime_does_not_fall_through() {
		let err = Selector::new(table()).with_override("Missing").select().unwrap_err();
		assert!(
			matches!(&err, Error::Unavailable(m) if m == "Missing Engine runtime is not available on this system"),
			"got {err:?}"
		);
	}

	#[test]
	fn unknown_override_is_not_defined() {
		let err = Selector::new(table()).with_override("Nope").select().unwrap_err();
		assert!(matches!(&err, Error::NotDefined(name) if name == "Nope"), "got {err:?}");
		assert_eq!(err.to_string(), "Nope runtime is not defined");
	}

	#[test]
	fn empty_override_auto_detects() {
		let selector = Selector::new(table()).with_override("");
		assert_eq!(selector.override_name(), None);
		assert_eq!(selector.select().unwrap().name(), "First Engine");
	}

	#[test]
	fn disabled_is_reachable_only_by_name() {
		let runtime = Selector::new(table()).with_override("Disabled").select().unwrap();
		assert_eq!(runtime.name(), "Disabled");
		assert!(matches!(runtime.eval("1"), Err(Error::Disabled)));
	}

	#[test]
	fn override_survives_exclusion() {
		let runtime = Selector::new(table())
			.with_override("First")
			.select_excluding(&["First"])
			.unwrap();
		assert_eq!(runtime.name(), "First Engine");
	}
}
