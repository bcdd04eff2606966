//! Result printing.
//!
//! Text output prints the bare value (strings unquoted). JSON output wraps
//! every result in an envelope on stdout:
//!
//! ```json
//! { "ok": true, "runtime": "Persistent Node.js (V8)", "value": 4 }
//! { "ok": false, "error": { "code": "syntax_error", "message": "SyntaxError: ..." } }
//! ```
//!
//! Errors are always also written to stderr.


use std::io::{self, Write};

use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

/// Output format for CLI results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// JSON envelope
	Json,
}

/// Envelope printed in JSON mode.
#[derive(Debug, Serialize)]
pub struct CommandResult<T: Serialize> {
	pub ok: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub runtime: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub value: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandError {
	pub code: &'static str,
	pub message: String,
}

impl CommandError {
	pub fn from_anyhow(err: &anyhow::Error) -> Self {
		let code = err
			.downcast_ref::<jsbridge::Error>()
			.map(error_code)
			.unwrap_or("failed");
		Self {
			code,
			message: format!("{err:#}"),
		}
	}
}

/// Stable machine-readable code for a bridge error.
pub fn error_code(err: &jsbridge::Error) -> &'static str {
	use jsbridge::Error;

	match err {
		Error::Unavailable(_) => "unavailable",
		Error::NotDefined(_) => "not_defined",
		Error::SpawnFailed { .. } => "spawn_failed",
		Error::ProtocolDesync(_) => "protocol_error",
		Error::Syntax(_) => "syntax_error",
		Error::Program(_) => "program_error",
		Error::Disabled => "disabled",
		Error::ContextClosed(_) => "context_closed",
		Error::Io(_) => "io_error",
		Error::Json(_) => "json_error",
	}
}

/// Renders a value for text mode: strings bare, everything else as JSON.
pub fn render_text(value: &Value) -> String {
	match value {
		Value::String(text) => text.clone(),
		other => other.to_string(),
	}
}

pub fn print_value(runtime: &str, value: &Value, format: OutputFormat) {
	match format {
		OutputFormat::Text => println!("{}", render_text(value)),
		OutputFormat::Json => print_json(&CommandResult {
			ok: true,
			runtime: Some(runtime.to_string()),
			value: Some(value),
			error: None,
		}),
	}
}

pub fn print_error(err: &anyhow::Error, format: OutputFormat) {
	let error = CommandError::from_anyhow(err);
	eprintln!("{} {}", "error:".red().bold(), error.message);

	if format == OutputFormat::Json {
		print_json(&CommandResult::<Value> {
			ok: false,
			runtime: None,
			value: None,
			error: Some(error),
		});
	}
}

pub fn print_json<T: Serialize>(value: &T) {
	let mut stdout = io::stdout().lock();
	match serde_json::to_string_pretty(value) {
		Ok(text) => {
			let _ = writeln!(stdout, "{text}");
		}
		Err(e) => eprintln!("failed to serialize output: {e}"),
	}
}
