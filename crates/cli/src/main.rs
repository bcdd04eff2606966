use clap::Parser;
use jsbridge_cli::cli::Cli;
use jsbridge_cli::{commands, logging, output};

fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;
	if let Err(err) = commands::dispatch(cli) {
		output::print_error(&err, format);
		std::process::exit(1);
	}
}
