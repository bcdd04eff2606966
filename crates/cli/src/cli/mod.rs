#[cfg(test)]
mod tests;

use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

/// Root CLI for jsbridge.
#[derive(Parser, Debug)]
#[command(name = "jsbridge")]
#[command(about = "Evaluate JavaScript with whichever engine is installed")]
#[command(version)]
#[command(styles = styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: text (default) or json
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	/// Runtime to use instead of auto-detection (overrides JSBRIDGE_RUNTIME)
	#[arg(short, long, global = true, value_name = "NAME")]
	pub runtime: Option<String>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Evaluate an expression and print its value.
	Eval(SourceArgs),
	/// Run a function body; `return` sets the printed value.
	Exec(SourceArgs),
	/// Call a function with JSON arguments.
	Call(CallArgs),
	/// List known runtimes and whether they can run here.
	Runtimes,
}

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
	/// Source text; read from stdin when omitted or `-`.
	#[arg(value_name = "SOURCE")]
	pub source: Option<String>,

	/// Script evaluated in the context first.
	#[arg(short, long, value_name = "FILE")]
	pub preamble: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CallArgs {
	/// Function path, e.g. `JSON.stringify` or `add`.
	#[arg(value_name = "FUNCTION")]
	pub function: String,

	/// Arguments, each a JSON value.
	#[arg(value_name = "ARG", allow_negative_numbers = true)]
	pub args: Vec<String>,

	/// Script evaluated in the context first.
	#[arg(short, long, value_name = "FILE")]
	pub preamble: Option<PathBuf>,
}

fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Yellow.on_default().bold())
		.usage(AnsiColor::Yellow.on_default().bold())
		.literal(AnsiColor::Green.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
}
