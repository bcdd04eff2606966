//! Chunked transport for engines behind line-length limits.
//!
//! A chunked request is written as several lines, each holding a slice of the
//! encoded frame, then a line holding only [`END_SENTINEL`]. The engine joins
//! the slices without separators before parsing.
//!
//! Slices never end inside an escape sequence. Besides the JSON string escapes
//! (`\n`, `\"`, `\u001f`), a transport-escaped character appears in the frame
//! as the seven bytes `\\u00e9` and is kept whole as well.

/// Line terminating a chunked request.
pub const END_SENTINEL: &str = "END";

/// Smallest usable chunk size: the longest escape sequence.
pub const MIN_CHUNK_SIZE: usize = 7;

/// Splits an encoded frame into slices of at most `max_frame_size` bytes.
///
/// `max_frame_size` is raised to [`MIN_CHUNK_SIZE`] if smaller. An empty frame
/// yields a single empty slice.
pub fn split_frame(frame: &str, max_frame_size: usize) -> Vec<&str> {
	let limit = max_frame_size.max(MIN_CHUNK_SIZE);
	if frame.len() <= limit {
		return vec![frame];
	}

	let bytes = frame.as_bytes();
	let mut chunks = Vec::with_capacity(frame.len() / limit + 1);
	let mut start = 0;
	let mut pos = 0;
	while pos < bytes.len() {
		let width = atom_width(frame, pos);
		if pos + width - start > limit {
			chunks.push(&frame[start..pos]);
			start = pos;
		}
		pos += width;
	}
	chunks.push(&frame[start..]);
	chunks
}

/// Width of the indivisible unit starting at `pos`.
fn atom_width(frame: &str, pos: usize) -> usize {
	let bytes = frame.as_bytes();
	let remaining = bytes.len() - pos;
	if bytes[pos] != b'\\' {
		return frame[pos..].chars().next().map_or(1, char::len_utf8);
	}

	let width = match bytes.get(pos + 1) {
		Some(b'u') => 6,
		Some(b'\\') if is_unicode_escape(&bytes[pos + 2..]) => 7,
		_ => 2,
	};
	width.min(remaining)
}

fn is_unicode_escape(bytes: &[u8]) -> bool {
	bytes.len() >= 5 && bytes[0] == b'u' && bytes[1..5].iter().all(u8::is_ascii_hexdigit)
}

/// Engine-side reassembly of request lines.
///
/// Accepts both layouts: a line that parses as a complete frame on its own is
/// returned immediately, and slices are buffered until [`END_SENTINEL`]. A
/// sentinel with nothing buffered (the frame already completed on its first
/// slice) is ignored.
#[derive(Debug, Default)]
pub struct Reassembler {
	pending: String,
}

impl Reassembler {
	pub fn new() -> Self {
		Self::default()
	}

	/// Feeds one line (without terminator). Returns a complete frame when one
	/// is available.
	pub fn push_line(&mut self, line: &str) -> Option<String> {
		let line = line.trim_end_matches(['\r', '\n']);
		if line == END_SENTINEL {
			if self.pending.is_empty() {
				return None;
			}
			return Some(std::mem::take(&mut self.pending));
		}

		self.pending.push_str(line);
		if serde_json::from_str::<serde_json::Value>(&self.pending).is_ok() {
			return Some(std::mem::take(&mut self.pending));
		}
		None
	}

	/// Whether a partial frame is buffered.
	pub fn is_pending(&self) -> bool {
		!self.pending.is_empty()
	}
}
