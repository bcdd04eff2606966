//! Transport escaping for non-ASCII source text.
//!
//! Request lines are written to the engine as ASCII. Every character at or
//! above U+0080 is replaced by a `\uXXXX` escape before the source is framed,
//! and the engine's own parser turns the escape back into the character.
//! Characters outside the Basic Multilingual Plane become a UTF-16 surrogate
//! pair, which is what a JavaScript parser expects.
//!
//! A character already preceded by an escaping backslash (`'\é'`) reuses that
//! backslash, so the escaped source still denotes the same character.

use std::borrow::Cow;
use std::fmt::Write;

/// Replaces every non-ASCII character with its `\uXXXX` escape.
///
/// ASCII input is returned borrowed.
pub fn escape_non_ascii(source: &str) -> Cow<'_, str> {
	if source.is_ascii() {
		return Cow::Borrowed(source);
	}

	let mut escaped = String::with_capacity(source.len() + 16);
	let mut units = [0u16; 2];
	let mut backslashes = 0usize;
	for ch in source.chars() {
		if ch.is_ascii() {
			backslashes = if ch == '\\' { backslashes + 1 } else { 0 };
			escaped.push(ch);
			continue;
		}
		for (i, unit) in ch.encode_utf16(&mut units).iter().enumerate() {
			// Writing to a String cannot fail.
			let _ = if i == 0 && backslashes % 2 == 1 {
				write!(escaped, "u{unit:04x}")
			} else {
				write!(escaped, "\\u{unit:04x}")
			};
		}
		backslashes = 0;
	}
	Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ascii_is_borrowed() {
		assert!(matches!(escape_non_ascii("1 + 1"), Cow::Borrowed("1 + 1")));
	}

	#[test]
	fn latin1_and_bmp_characters_are_escaped() {
		assert_eq!(escape_non_ascii("'café'"), "'caf\\u00e9'");
		assert_eq!(escape_non_ascii("\"☃\""), "\"\\u2603\"");
	}

	#[test]
	fn astral_characters_become_surrogate_pairs() {
		assert_eq!(escape_non_ascii("😀"), "\\ud83d\\ude00");
	}

	#[test]
	fn existing_backslashes_are_untouched() {
		assert_eq!(escape_non_ascii("'\\\\'"), "'\\\\'");
	}

	#[test]
	fn escaping_backslash_is_reused() {
		assert_eq!(escape_non_ascii(r"'\é'"), r"'\u00e9'");
		assert_eq!(escape_non_ascii(r"'\😀'"), r"'\ud83d\ude00'");
	}

	#[test]
	fn escaped_backslash_before_a_character_stays_literal() {
		assert_eq!(escape_non_ascii(r"'\\é'"), r"'\\\u00e9'");
		assert_eq!(escape_non_ascii(r"'\a é'"), r"'\a \u00e9'");
	}
}
