//! Drives real child processes: a `/bin/sh` script plays the engine, answering
//! the exact frames the bridge sends.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use jsbridge::{Error, ExternalRuntime, Runtime, RuntimeDescriptor};
use serde_json::json;
use tempfile::TempDir;

const ENGINE: &str = r#"#!/bin/sh
echo "$@" > "$(dirname "$0")/argv"
echo "engine starting" >&2
while IFS= read -r line; do
  case "$line" in
    *'JSON.stringify([2 + 2])'*) echo '["ok","[4]"]' ;;
    *'JSON.stringify([)])'*) echo '["err","SyntaxError: Unexpected token )"]' ;;
    *'boom'*) echo '["err","Error: boom"]' ;;
    *'hang up'*) exit 0 ;;
    *'stall'*) exec sleep 30 ;;
    *',""]') echo '["ok",null]' ;;
    *,*) echo '["err","ReferenceError: unsupported"]' ;;
    *) echo '["ok",null]' ;;
  esac
done
"#;

fn write_mock_engine(dir: &Path) -> PathBuf {
	let path = dir.join("mock-engine");
	fs::write(&path, ENGINE).unwrap();
	let mut perms = fs::metadata(&path).unwrap().permissions();
	perms.set_mode(0o755);
	fs::set_permissions(&path, perms).unwrap();
	path
}

fn runtime(dir: &Path, shared: bool) -> ExternalRuntime {
	let engine = write_mock_engine(dir);
	let bootstrap = dir.join("runner.js");
	fs::write(&bootstrap, "// unused by the mock engine\n").unwrap();

	let descriptor = RuntimeDescriptor::builder("Mock Shell")
		.command("definitely-not-installed-engine")
		.command(format!("{} --mock", engine.display()))
		.bootstrap(bootstrap)
		.shared_process(shared)
		.build();
	ExternalRuntime::new(descriptor)
}

#[test]
fn shared_engine_round_trip() {
	let temp = TempDir::new().unwrap();
	let runtime = runtime(temp.path(), true);
	assert!(runtime.is_available());

	let first = runtime.compile("").unwrap();
	let second = runtime.compile("").unwrap();
	assert_eq!(first.eval("2 + 2").unwrap(), json!(4));
	first.close().unwrap();
	assert_eq!(second.eval("2 + 2").unwrap(), json!(4));
	second.close().unwrap();

	let argv = fs::read_to_string(temp.path().join("argv")).unwrap();
	assert_eq!(argv.trim(), format!("--mock {}", temp.path().join("runner.js").display()));
}

#[test]
fn engine_errors_keep_the_process() {
	let temp = TempDir::new().unwrap();
	let runtime = runtime(temp.path(), true);
	let context = runtime.compile("").unwrap();

	let err = context.eval(")").unwrap_err();
	assert!(matches!(&err, Error::Syntax(m) if m == "SyntaxError: Unexpected token )"), "got {err:?}");

	let err = context.exec("throw new Error('boom')").unwrap_err();
	assert!(matches!(&err, Error::Program(m) if m == "Error: boom"), "got {err:?}");

	assert_eq!(context.eval("2 + 2").unwrap(), json!(4));
}

#[test]
fn engine_exit_is_a_protocol_error_and_respawns() {
	let temp = TempDir::new().unwrap();
	let runtime = runtime(temp.path(), true);

	let doomed = runtime.compile("").unwrap();
	let err = doomed.eval("'hang up'").unwrap_err();
	assert!(matches!(err, Error::ProtocolDesync(_)), "got {err:?}");
	assert!(err.is_fatal());

	let fresh = runtime.compile("").unwrap();
	assert_eq!(fresh.eval("2 + 2").unwrap(), json!(4));
}

#[test]
fn per_context_engines_close_with_their_context() {
	let temp = TempDir::new().unwrap();
	let runtime = runtime(temp.path(), false);

	let context = runtime.compile("").unwrap();
	assert_eq!(context.eval("2 + 2").unwrap(), json!(4));
	context.close().unwrap();
	context.close().unwrap();
	assert!(matches!(context.eval("2 + 2"), Err(Error::ContextClosed(_))));

	assert_eq!(runtime.eval("2 + 2").unwrap(), json!(4));
}

#[test]
fn engine_removed_after_probe_is_a_spawn_failure() {
	let temp = TempDir::new().unwrap();
	let runtime = runtime(temp.path(), true);
	assert!(runtime.is_available());

	fs::remove_file(temp.path().join("mock-engine")).unwrap();

	let err = runtime.compile("").unwrap_err();
	assert!(matches!(&err, Error::SpawnFailed { runtime, .. } if runtime == "Mock Shell"), "got {err:?}");
	assert!(!runtime.is_available());
	assert!(matches!(runtime.eval("1"), Err(Error::SpawnFailed { .. })));
}

#[test]
fn shutdown_stops_the_shared_engine() {
	let temp = TempDir::new().unwrap();
	let runtime = runtime(temp.path(), true);

	let context = runtime.compile("").unwrap();
	runtime.shutdown();
	assert!(matches!(context.eval("2 + 2"), Err(Error::ProtocolDesync(_))));
	drop(context);

	assert_eq!(runtime.eval("2 + 2").unwrap(), json!(4));
}

#[test]
fn reset_kills_a_hung_engine() {
	let temp = TempDir::new().unwrap();
	let runtime = Arc::new(runtime(temp.path(), true));
	let context = runtime.compile("").unwrap();

	let (stuck_tx, stuck_rx) = mpsc::channel();
	thread::spawn(move || {
		let _ = stuck_tx.send(context.eval("'stall'"));
	});
	thread::sleep(Duration::from_millis(200));

	let (fresh_tx, fresh_rx) = mpsc::channel();
	let resetter = Arc::clone(&runtime);
	thread::spawn(move || {
		resetter.reset();
		let _ = fresh_tx.send(resetter.eval("2 + 2"));
	});

	let fresh = fresh_rx
		.recv_timeout(Duration::from_secs(5))
		.expect("reset and a new context must not wait on the hung engine");
	assert_eq!(fresh.unwrap(), json!(4));

	let stuck = stuck_rx
		.recv_timeout(Duration::from_secs(5))
		.expect("the blocked evaluation must end once the engine is killed");
	assert!(matches!(stuck, Err(Error::ProtocolDesync(_))), "got {stuck:?}");
}
