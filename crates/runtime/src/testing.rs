//! In-process fake engine for tests.
//!
//! The fake speaks the real line protocol over `std::io::pipe` pairs and runs
//! on its own thread, so contexts, chunking and teardown are exercised
//! end to end without a JavaScript engine installed. It understands a tiny
//! expression language:
//!
//! - integers, `true`/`false`/`null`, `'single'` or `"double"` quoted strings
//!   (with `\uXXXX` escapes)
//! - `a + b + ...` over integers
//! - `name = expr` assignments and `name` lookups, scoped per context
//! - `throw 'message'`, and `)` as a syntax error
//! - `echo.apply(this, [args])` returning its first argument
//! - `JSON.stringify([expr])` and `(function(){ body })()` wrappers
//! - `__exit__`, which makes the engine exit without answering

use std::collections::HashMap;
use std::io::{BufRead, BufReader, PipeReader, PipeWriter, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use jsbridge_protocol::{ContextId, Framing, Reassembler, Request, Response};
use parking_lot::Mutex;
use serde_json::Value;

use crate::descriptor::RuntimeDescriptor;
use crate::error::{Error, Result};
use crate::manager::Launch;
use crate::process::Process;

/// Record of everything a fake engine received.
#[derive(Debug, Clone, Default)]
pub struct EngineLog {
	lines: Arc<Mutex<Vec<String>>>,
	frames: Arc<Mutex<Vec<Request>>>,
}

impl EngineLog {
	/// Raw lines as written by the host, chunks and sentinels included.
	pub fn lines(&self) -> Vec<String> {
		self.lines.lock().clone()
	}

	/// Reassembled requests in arrival order.
	pub fn frames(&self) -> Vec<Request> {
		self.frames.lock().clone()
	}

	/// Context ids of received teardown requests.
	pub fn teardowns(&self) -> Vec<ContextId> {
		self.frames
			.lock()
			.iter()
			.filter(|frame| frame.is_teardown())
			.map(Request::context_id)
			.collect()
	}
}

/// Starts a fake engine thread and returns a process connected to it.
pub fn fake_process(runtime: &str, framing: Framing) -> (Process, EngineLog) {
	let log = EngineLog::default();
	(spawn_engine(runtime, framing, log.clone()), log)
}

fn spawn_engine(runtime: &str, framing: Framing, log: EngineLog) -> Process {
	let (engine_input, host_writer) = std::io::pipe().expect("pipe");
	let (host_reader, engine_output) = std::io::pipe().expect("pipe");
	thread::spawn(move || serve(engine_input, engine_output, log));
	Process::from_streams(
		runtime,
		Box::new(host_writer),
		Box::new(BufReader::new(host_reader)),
		framing,
	)
}

/// [`Launch`] starting fake engines, counting launches.
#[derive(Debug, Clone, Default)]
pub struct FakeLauncher {
	launches: Arc<AtomicUsize>,
	log: EngineLog,
	fail: bool,
}

impl FakeLauncher {
	pub fn new() -> Self {
		Self::default()
	}

	/// A launcher whose every launch fails as a spawn failure.
	pub fn failing() -> Self {
		Self {
			fail: true,
			..Self::default()
		}
	}

	pub fn launches(&self) -> usize {
		self.launches.load(Ordering::SeqCst)
	}

	/// Log shared by every engine this launcher started.
	pub fn log(&self) -> EngineLog {
		self.log.clone()
	}
}

impl Launch for FakeLauncher {
	fn launch(&self, descriptor: &RuntimeDescriptor) -> Result<Process> {
		self.launches.fetch_add(1, Ordering::SeqCst);
		if self.fail {
			return Err(Error::SpawnFailed {
				runtime: descriptor.name().to_string(),
				reason: "fake launcher refuses to start".to_string(),
			});
		}
		Ok(spawn_engine(descriptor.name(), descriptor.framing(), self.log.clone()))
	}
}

type Scope = HashMap<String, Value>;

enum Outcome {
	Value(Value),
	Error(String),
	Exit,
}

fn serve(input: PipeReader, mut output: PipeWriter, log: EngineLog) {
	let mut scopes: HashMap<ContextId, Scope> = HashMap::new();
	let mut reassembler = Reassembler::new();

	for line in BufReader::new(input).lines() {
		let Ok(line) = line else { break };
		log.lines.lock().push(line.clone());
		let Some(frame) = reassembler.push_line(&line) else {
			continue;
		};

		let response = match serde_json::from_str::<Request>(&frame) {
			Ok(request) => {
				log.frames.lock().push(request.clone());
				match request {
					Request::Teardown((id,)) => {
						scopes.remove(&id);
						Response::ok(Value::Null)
					}
					Request::Eval(id, source) => match evaluate(scopes.entry(id).or_default(), &source) {
						Outcome::Value(value) => Response::ok(value),
						Outcome::Error(message) => Response::err(message),
						Outcome::Exit => return,
					},
				}
			}
			Err(e) => Response::err(format!("bad frame: {e}")),
		};

		if writeln!(output, "{}", response.encode()).is_err() {
			break;
		}
	}
}

fn evaluate(scope: &mut Scope, source: &str) -> Outcome {
	if let Some(inner) = source
		.strip_prefix("JSON.stringify([")
		.and_then(|rest| rest.strip_suffix("])"))
	{
		return match evaluate(scope, inner) {
			Outcome::Value(value) => Outcome::Value(Value::String(Value::Array(vec![value]).to_string())),
			other => other,
		};
	}

	if let Some(body) = source
		.strip_prefix("(function(){")
		.and_then(|rest| rest.strip_suffix("})()"))
	{
		let body = body.trim();
		if body.is_empty() {
			return Outcome::Value(Value::Null);
		}
		if let Some(expr) = body.strip_prefix("return") {
			return evaluate(scope, expr);
		}
		return match evaluate(scope, body) {
			Outcome::Value(_) => Outcome::Value(Value::Null),
			other => other,
		};
	}

	expression(scope, source.trim())
}

fn expression(scope: &mut Scope, expr: &str) -> Outcome {
	if expr == "__exit__" {
		return Outcome::Exit;
	}
	if expr.is_empty() {
		return Outcome::Value(Value::Null);
	}
	if expr.starts_with(')') || expr.matches('(').count() != expr.matches(')').count() {
		return Outcome::Error("SyntaxError: Unexpected token )".to_string());
	}
	if let Some(thrown) = expr.strip_prefix("throw ") {
		return match literal(thrown.trim()) {
			Some(Value::String(message)) => Outcome::Error(message),
			Some(value) => Outcome::Error(value.to_string()),
			None => Outcome::Error(thrown.trim().to_string()),
		};
	}
	if let Some(args) = expr
		.strip_prefix("echo.apply(this, ")
		.and_then(|rest| rest.strip_suffix(')'))
	{
		return match serde_json::from_str::<Vec<Value>>(args) {
			Ok(args) => Outcome::Value(args.into_iter().next().unwrap_or(Value::Null)),
			Err(e) => Outcome::Error(format!("SyntaxError: {e}")),
		};
	}
	if let Some((name, rhs)) = expr.split_once('=') {
		let name = name.trim();
		if is_identifier(name) {
			return match expression(scope, rhs.trim()) {
				Outcome::Value(value) => {
					scope.insert(name.to_string(), value.clone());
					Outcome::Value(value)
				}
				other => other,
			};
		}
	}
	if expr.contains('+') && !expr.starts_with(['\'', '"']) {
		let mut sum = 0i64;
		for term in expr.split('+') {
			match expression(scope, term.trim()) {
				Outcome::Value(Value::Number(n)) if n.is_i64() => sum += n.as_i64().unwrap_or(0),
				Outcome::Value(other) => return Outcome::Error(format!("TypeError: cannot add {other}")),
				other => return other,
			}
		}
		return Outcome::Value(Value::from(sum));
	}
	if let Some(value) = literal(expr) {
		return Outcome::Value(value);
	}
	if is_identifier(expr) {
		return match scope.get(expr) {
			Some(value) => Outcome::Value(value.clone()),
			None => Outcome::Error(format!("ReferenceError: {expr} is not defined")),
		};
	}
	Outcome::Error(format!("SyntaxError: Unexpected token in {expr}"))
}

fn literal(expr: &str) -> Option<Value> {
	match expr {
		"true" => return Some(Value::Bool(true)),
		"false" => return Some(Value::Bool(false)),
		"null" | "undefined" => return Some(Value::Null),
		_ => {}
	}
	if let Ok(n) = expr.parse::<i64>() {
		return Some(Value::from(n));
	}
	let quote = expr.chars().next().filter(|c| *c == '\'' || *c == '"')?;
	let body = expr.strip_prefix(quote)?.strip_suffix(quote)?;
	unescape(body).map(Value::String)
}

/// Undoes `\uXXXX` (surrogate pairs included), `\\` and `\'`/`\"` escapes.
fn unescape(body: &str) -> Option<String> {
	let mut units: Vec<u16> = Vec::with_capacity(body.len());
	let mut chars = body.chars();
	while let Some(ch) = chars.next() {
		if ch != '\\' {
			let mut buf = [0u16; 2];
			units.extend_from_slice(ch.encode_utf16(&mut buf));
			continue;
		}
		match chars.next()? {
			'u' => {
				let hex: String = chars.by_ref().take(4).collect();
				units.push(u16::from_str_radix(&hex, 16).ok()?);
			}
			'n' => units.push(u16::from(b'\n')),
			other => {
				let mut buf = [0u16; 2];
				units.extend_from_slice(other.encode_utf16(&mut buf));
			}
		}
	}
	String::from_utf16(&units).ok()
}

fn is_identifier(name: &str) -> bool {
	let mut chars = name.chars();
	chars
		.next()
		.is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
		&& chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
