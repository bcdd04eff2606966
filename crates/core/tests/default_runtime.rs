//! The process-wide default runtime. Kept in its own test binary since it
//! mutates global state.

use std::sync::Arc;

use jsbridge::{DisabledRuntime, Error, ExternalRuntime, Runtime, RuntimeDescriptor};

#[test]
fn default_runtime_can_be_assigned() {
	let disabled: Arc<dyn Runtime> = Arc::new(DisabledRuntime);
	jsbridge::set_runtime(Arc::clone(&disabled)).unwrap();

	assert!(Arc::ptr_eq(&jsbridge::runtime().unwrap(), &disabled));
	assert!(matches!(jsbridge::eval("1"), Err(Error::Disabled)));

	let missing: Arc<dyn Runtime> = Arc::new(ExternalRuntime::new(
		RuntimeDescriptor::builder("Missing")
			.command("definitely-not-installed-engine")
			.build(),
	));
	let err = jsbridge::set_runtime(missing).unwrap_err();
	assert!(matches!(&err, Error::Unavailable(m) if m.contains("Missing")), "got {err:?}");

	assert!(Arc::ptr_eq(&jsbridge::runtime().unwrap(), &disabled));
}
