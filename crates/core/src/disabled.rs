//! Stand-in runtime that refuses to evaluate anything.

use jsbridge_runtime::{Error, Result};
use serde_json::Value;

use crate::context::Context;
use crate::runtime::Runtime;

/// Always available and always failing with [`Error::Disabled`].
///
/// Select it by name to turn evaluation off; auto-detection never picks it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRuntime;

impl Runtime for DisabledRuntime {
	fn name(&self) -> &str {
		"Disabled"
	}

	fn is_available(&self) -> bool {
		true
	}

	fn is_deprecated(&self) -> bool {
		true
	}

	fn compile(&self, _preamble: &str) -> Result<Context> {
		Err(Error::Disabled)
	}

	fn exec(&self, _source: &str) -> Result<Value> {
		Err(Error::Disabled)
	}

	fn eval(&self, _source: &str) -> Result<Value> {
		Err(Error::Disabled)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_operation_fails() {
		let runtime = DisabledRuntime;
		assert!(runtime.is_available());
		assert!(runtime.is_deprecated());
		assert!(matches!(runtime.compile("var a"), Err(Error::Disabled)));
		assert!(matches!(runtime.exec("return 1"), Err(Error::Disabled)));
		assert!(matches!(runtime.eval("1"), Err(Error::Disabled)));
	}
}
