//! Engine executable discovery
//!
//! Resolves a descriptor's candidate commands against the filesystem without
//! starting anything. Each candidate is tried in order:
//! 1. A path (absolute, or relative with a separator) that is an executable file
//! 2. A bare name found on `PATH`, with the platform's executable suffix
//!
//! A candidate may carry arguments (`"cscript //E:jscript //Nologo"`); only the
//! leading token is resolved and the arguments are kept as given.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

/// Capability resolving an executable name to a path.
pub trait Locate: Send + Sync {
	/// Returns the path of `program` if it names an executable file.
	fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// [`Locate`] backed by a `PATH`-style search list.
#[derive(Debug, Clone, Default)]
pub struct PathLocator {
	search_path: Option<OsString>,
}

impl PathLocator {
	/// Searches the process's `PATH` at lookup time.
	pub fn from_env() -> Self {
		Self::default()
	}

	/// Searches `search_path` (a `PATH`-formatted list) instead of `PATH`.
	pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
		Self {
			search_path: Some(search_path.into()),
		}
	}
}

impl Locate for PathLocator {
	fn locate(&self, program: &str) -> Option<PathBuf> {
		let found = match &self.search_path {
			Some(search_path) => {
				let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
				which::which_in(program, Some(search_path), cwd)
			}
			None => which::which(program),
		};
		found.ok().filter(|path| path.is_file())
	}
}

/// A candidate command whose program resolved to an executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
	/// Resolved executable.
	pub program: PathBuf,
	/// Arguments carried by the candidate, before the bootstrap path.
	pub args: Vec<String>,
}

impl ResolvedCommand {
	/// Builds the command that runs `bootstrap` under this program.
	pub fn command(&self, bootstrap: &Path) -> Command {
		let mut command = Command::new(&self.program);
		command.args(&self.args).arg(bootstrap);
		command
	}
}

impl fmt::Display for ResolvedCommand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.program.display())?;
		for arg in &self.args {
			write!(f, " {arg}")?;
		}
		Ok(())
	}
}

/// Returns the first candidate whose program resolves.
///
/// Pure filesystem probe: no process is spawned.
pub fn resolve<S: AsRef<str>>(candidates: &[S], locator: &dyn Locate) -> Option<ResolvedCommand> {
	for candidate in candidates {
		let mut tokens = candidate.as_ref().split_whitespace();
		let Some(program) = tokens.next() else {
			continue;
		};

		match locator.locate(program) {
			Some(path) => {
				debug!(target = "jsbridge.probe", candidate = candidate.as_ref(), path = %path.display(), "resolved engine command");
				return Some(ResolvedCommand {
					program: path,
					args: tokens.map(ToOwned::to_owned).collect(),
				});
			}
			None => {
				debug!(target = "jsbridge.probe", candidate = candidate.as_ref(), "engine command not found");
			}
		}
	}
	None
}
