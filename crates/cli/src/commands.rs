//! Command dispatch.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use colored::Colorize;
use jsbridge::{Context, Runtime, Runtimes, Selector};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::cli::{CallArgs, Cli, Commands, SourceArgs};
use crate::output::{self, OutputFormat};

pub fn dispatch(cli: Cli) -> Result<()> {
	let mut selector = Selector::from_env(Runtimes::builtin());
	if let Some(name) = cli.runtime {
		selector = selector.with_override(name);
	}

	let result = match cli.command {
		Commands::Eval(args) => {
			let source = read_source(&args)?;
			evaluate(&selector, args.preamble.as_deref(), cli.format, |context| context.eval(&source))
		}
		Commands::Exec(args) => {
			let source = read_source(&args)?;
			evaluate(&selector, args.preamble.as_deref(), cli.format, |context| context.exec(&source))
		}
		Commands::Call(args) => call(&selector, &args, cli.format),
		Commands::Runtimes => list_runtimes(&selector, cli.format),
	};

	selector.runtimes().shutdown();
	result
}

fn read_source(args: &SourceArgs) -> Result<String> {
	match args.source.as_deref() {
		Some(source) if source != "-" => Ok(source.to_string()),
		_ => {
			let mut source = String::new();
			std::io::stdin()
				.read_to_string(&mut source)
				.context("failed to read source from stdin")?;
			Ok(source)
		}
	}
}

fn read_preamble(path: Option<&Path>) -> Result<String> {
	match path {
		Some(path) => std::fs::read_to_string(path)
			.with_context(|| format!("failed to read preamble {}", path.display())),
		None => Ok(String::new()),
	}
}

fn evaluate(
	selector: &Selector,
	preamble: Option<&Path>,
	format: OutputFormat,
	op: impl FnOnce(&Context) -> jsbridge::Result<Value>,
) -> Result<()> {
	let preamble = read_preamble(preamble)?;
	let runtime = selector.select()?;
	debug!(target = "jsbridge.cli", runtime = runtime.name(), "evaluating");

	let value = runtime.with_context(&preamble, op)?;
	output::print_value(runtime.name(), &value, format);
	Ok(())
}

fn call(selector: &Selector, args: &CallArgs, format: OutputFormat) -> Result<()> {
	let values = args
		.args
		.iter()
		.map(|arg| serde_json::from_str(arg).with_context(|| format!("argument is not JSON: {arg}")))
		.collect::<Result<Vec<Value>>>()?;

	evaluate(selector, args.preamble.as_deref(), format, |context| {
		context.call(&args.function, &values)
	})
}

#[derive(Debug, Serialize)]
struct RuntimeInfo<'a> {
	name: &'a str,
	display_name: &'a str,
	available: bool,
	deprecated: bool,
	selected: bool,
}

fn list_runtimes(selector: &Selector, format: OutputFormat) -> Result<()> {
	let selected: Option<Arc<dyn Runtime>> = selector.select().ok();
	let runtimes = selector.runtimes();

	let entries: Vec<(&str, Arc<dyn Runtime>)> = runtimes
		.names()
		.into_iter()
		.filter_map(|name| runtimes.get(name).map(|runtime| (name, runtime)))
		.collect();
	let infos: Vec<RuntimeInfo<'_>> = entries
		.iter()
		.map(|(name, runtime)| RuntimeInfo {
			name: *name,
			display_name: runtime.name(),
			available: runtime.is_available(),
			deprecated: runtime.is_deprecated(),
			selected: selected.as_ref().is_some_and(|s| Arc::ptr_eq(s, runtime)),
		})
		.collect();

	match format {
		OutputFormat::Json => output::print_json(&infos),
		OutputFormat::Text => {
			let width = infos.iter().map(|info| info.name.len()).max().unwrap_or(0);
			for info in &infos {
				let marker = if info.selected { "*" } else { " " };
				let status = match (info.available, info.deprecated) {
					(true, true) => "available (deprecated)".yellow(),
					(true, false) => "available".green(),
					(false, _) => "unavailable".red(),
				};
				println!("{marker} {:width$}  {:28} {status}", info.name, info.display_name);
			}
		}
	}
	Ok(())
}
