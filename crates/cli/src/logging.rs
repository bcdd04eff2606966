use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs the stderr subscriber. `RUST_LOG` replaces the verbosity default.
pub fn init_logging(verbosity: u8) {
	// 0 = warnings (spawn failures, dead engines)
	// 1 (-v) = process lifecycle and runtime selection
	// 2+ (-vv) = every frame-level event, including engine stderr
	let filter = match verbosity {
		0 => "warn",
		1 => "warn,jsbridge=info",
		_ => "debug",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr.with_max_level(tracing::Level::TRACE))
		.with_target(true)
		.compact()
		.init();
}
