//! Request and response frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chunk::{END_SENTINEL, MIN_CHUNK_SIZE, split_frame};
use crate::escape::escape_non_ascii;

/// Correlation key naming one logical context inside an engine process.
pub type ContextId = u64;

/// Status string of a successful response.
pub const STATUS_OK: &str = "ok";

/// Frame sent from the host to the engine.
///
/// Serializes to a JSON array: `[id, source]` for [`Eval`](Self::Eval) and
/// `[id]` for [`Teardown`](Self::Teardown).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Request {
	/// Evaluate source text inside the context's scope.
	Eval(ContextId, String),
	/// Discard the context's scope.
	Teardown((ContextId,)),
}

impl Request {
	/// Builds an evaluation request, escaping non-ASCII characters in `source`.
	pub fn eval(context_id: ContextId, source: &str) -> Self {
		Self::Eval(context_id, escape_non_ascii(source).into_owned())
	}

	/// Builds a teardown request.
	pub fn teardown(context_id: ContextId) -> Self {
		Self::Teardown((context_id,))
	}

	pub fn context_id(&self) -> ContextId {
		match self {
			Self::Eval(id, _) => *id,
			Self::Teardown((id,)) => *id,
		}
	}

	pub fn is_teardown(&self) -> bool {
		matches!(self, Self::Teardown(_))
	}

	/// Serializes the request to one line of JSON without a terminator.
	///
	/// Control characters in the source are escaped by the JSON encoder, so the
	/// result never contains a newline.
	pub fn encode(&self) -> serde_json::Result<String> {
		serde_json::to_string(self)
	}
}

/// How an encoded request is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
	/// The whole frame on one newline-terminated line.
	#[default]
	Line,
	/// The frame split into lines of at most `max_frame_size` bytes, followed
	/// by an [`END_SENTINEL`] line.
	Chunked { max_frame_size: usize },
}

impl Framing {
	/// Chunked framing, raising `max_frame_size` to [`MIN_CHUNK_SIZE`] if needed.
	pub fn chunked(max_frame_size: usize) -> Self {
		Self::Chunked {
			max_frame_size: max_frame_size.max(MIN_CHUNK_SIZE),
		}
	}

	/// Encodes `request` into the exact bytes to write, terminators included.
	pub fn encode(&self, request: &Request) -> serde_json::Result<String> {
		let frame = request.encode()?;
		Ok(self.wrap(&frame))
	}

	/// Lays out an already encoded frame.
	pub fn wrap(&self, frame: &str) -> String {
		match *self {
			Self::Line => {
				let mut line = String::with_capacity(frame.len() + 1);
				line.push_str(frame);
				line.push('\n');
				line
			}
			Self::Chunked { max_frame_size } => {
				let chunks = split_frame(frame, max_frame_size);
				let mut out =
					String::with_capacity(frame.len() + chunks.len() + END_SENTINEL.len() + 1);
				for chunk in chunks {
					out.push_str(chunk);
					out.push('\n');
				}
				out.push_str(END_SENTINEL);
				out.push('\n');
				out
			}
		}
	}
}

/// Frame sent from the engine back to the host: `[status, value]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
	/// `"ok"` on success, anything else on failure. `None` when the engine
	/// sent an empty array.
	pub status: Option<String>,
	/// Result value on success, error message on failure.
	pub value: Value,
}

impl Response {
	pub fn ok(value: Value) -> Self {
		Self {
			status: Some(STATUS_OK.to_string()),
			value,
		}
	}

	pub fn err(message: impl Into<String>) -> Self {
		Self {
			status: Some("err".to_string()),
			value: Value::String(message.into()),
		}
	}

	/// Serializes the response to one line of JSON without a terminator.
	pub fn encode(&self) -> String {
		match &self.status {
			Some(status) => serde_json::json!([status, self.value]).to_string(),
			None => "[]".to_string(),
		}
	}

	/// Parses one response line.
	///
	/// Returns `Ok(None)` for a blank line. A missing value element decodes as
	/// `null`.
	pub fn decode(line: &str) -> serde_json::Result<Option<Self>> {
		let line = line.trim();
		if line.is_empty() {
			return Ok(None);
		}

		let mut items: Vec<Value> = serde_json::from_str(line)?;
		let value = if items.len() > 1 {
			items.swap_remove(1)
		} else {
			Value::Null
		};
		let status = items
			.first()
			.and_then(Value::as_str)
			.map(ToOwned::to_owned);
		Ok(Some(Self { status, value }))
	}

	/// Classifies the response, treating any failure message containing
	/// `syntax_marker` as a syntax error.
	pub fn classify(self, syntax_marker: &str) -> Reply {
		if self.status.as_deref() == Some(STATUS_OK) {
			return Reply::Ok(self.value);
		}

		let message = match self.value {
			Value::String(message) => message,
			Value::Null => String::new(),
			other => other.to_string(),
		};
		if !syntax_marker.is_empty() && message.contains(syntax_marker) {
			Reply::SyntaxError(message)
		} else {
			Reply::ProgramError(message)
		}
	}
}

/// Classified outcome of one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
	/// The engine evaluated the source and returned a value.
	Ok(Value),
	/// The source could not be parsed. Carries the engine's raw message.
	SyntaxError(String),
	/// The source raised or threw. Carries the engine's raw message.
	ProgramError(String),
	/// The engine produced no response line.
	Absent,
}

impl Reply {
	/// Decodes and classifies one raw read. `None` means end of stream.
	pub fn from_line(line: Option<&str>, syntax_marker: &str) -> serde_json::Result<Self> {
		let Some(line) = line else {
			return Ok(Self::Absent);
		};
		Ok(match Response::decode(line)? {
			Some(response) => response.classify(syntax_marker),
			None => Self::Absent,
		})
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn eval_request_is_a_two_element_array() {
		let request = Request::eval(7, "2 + 2");
		assert_eq!(request.encode().unwrap(), r#"[7,"2 + 2"]"#);
	}

	#[test]
	fn teardown_request_is_a_one_element_array() {
		let request = Request::teardown(7);
		assert!(request.is_teardown());
		assert_eq!(request.encode().unwrap(), "[7]");
	}

	#[test]
	fn requests_decode_by_arity() {
		let eval: Request = serde_json::from_str(r#"[3,"x"]"#).unwrap();
		assert_eq!(eval, Request::Eval(3, "x".to_string()));
		let teardown: Request = serde_json::from_str("[3]").unwrap();
		assert_eq!(teardown, Request::teardown(3));
	}

	#[test]
	fn encoded_request_is_single_line_ascii() {
		let request = Request::eval(1, "var s = 'caf\u{e9}';\nreturn s");
		let line = request.encode().unwrap();
		assert!(!line.contains('\n'));
		assert!(line.is_ascii());
		assert!(line.contains(r"caf\\u00e9"));
	}

	#[test]
	fn line_framing_appends_one_newline() {
		let wire = Framing::Line.encode(&Request::teardown(9)).unwrap();
		assert_eq!(wire, "[9]\n");
	}

	#[test]
	fn chunked_framing_ends_with_sentinel() {
		let wire = Framing::chunked(8)
			.encode(&Request::eval(1, "'abcdefghijklmnop'"))
			.unwrap();
		let lines: Vec<&str> = wire.lines().collect();
		assert_eq!(lines.last(), Some(&END_SENTINEL));
		assert!(lines.iter().all(|line| line.len() <= 8));
		assert_eq!(
			lines[..lines.len() - 1].concat(),
			Request::eval(1, "'abcdefghijklmnop'").encode().unwrap()
		);
	}

	#[test]
	fn chunked_framing_clamps_tiny_sizes() {
		assert_eq!(
			Framing::chunked(1),
			Framing::Chunked {
				max_frame_size: MIN_CHUNK_SIZE
			}
		);
	}

	#[test]
	fn ok_response_decodes_value() {
		let reply = Reply::from_line(Some("[\"ok\",4]\n"), "SyntaxError").unwrap();
		assert_eq!(reply, Reply::Ok(json!(4)));
	}

	#[test]
	fn ok_response_without_value_is_null() {
		let reply = Reply::from_line(Some(r#"["ok"]"#), "SyntaxError").unwrap();
		assert_eq!(reply, Reply::Ok(Value::Null));
	}

	#[test]
	fn syntax_marker_selects_syntax_error() {
		let reply = Reply::from_line(
			Some(r#"["err","SyntaxError: Unexpected token )"]"#),
			"SyntaxError",
		)
		.unwrap();
		assert_eq!(
			reply,
			Reply::SyntaxError("SyntaxError: Unexpected token )".to_string())
		);
	}

	#[test]
	fn other_failures_are_program_errors() {
		let reply = Reply::from_line(Some(r#"["err","hello"]"#), "SyntaxError").unwrap();
		assert_eq!(reply, Reply::ProgramError("hello".to_string()));
	}

	#[test]
	fn non_string_error_values_are_stringified() {
		let reply = Reply::from_line(Some(r#"["err",{"code":1}]"#), "SyntaxError").unwrap();
		assert_eq!(reply, Reply::ProgramError(r#"{"code":1}"#.to_string()));
	}

	#[test]
	fn missing_or_blank_lines_are_absent() {
		assert_eq!(Reply::from_line(None, "SyntaxError").unwrap(), Reply::Absent);
		assert_eq!(
			Reply::from_line(Some("\n"), "SyntaxError").unwrap(),
			Reply::Absent
		);
	}

	#[test]
	fn malformed_lines_fail_to_decode() {
		assert!(Reply::from_line(Some("not json"), "SyntaxError").is_err());
	}

	#[test]
	fn response_encoding_matches_wire_shape() {
		assert_eq!(Response::ok(json!("[4]")).encode(), r#"["ok","[4]"]"#);
		assert_eq!(Response::err("boom").encode(), r#"["err","boom"]"#);
	}
}
