use std::path::PathBuf;

use clap::Parser;

use super::*;

#[test]
fn parse_eval_with_source() {
	let cli = Cli::try_parse_from(["jsbridge", "eval", "1 + 1"]).unwrap();

	match cli.command {
		Commands::Eval(args) => {
			assert_eq!(args.source.as_deref(), Some("1 + 1"));
			assert_eq!(args.preamble, None);
		}
		_ => panic!("Expected Eval command"),
	}
	assert_eq!(cli.format, OutputFormat::Text);
	assert_eq!(cli.runtime, None);
}

#[test]
fn parse_exec_from_stdin_with_preamble() {
	let cli = Cli::try_parse_from(["jsbridge", "exec", "-p", "lib.js"]).unwrap();

	match cli.command {
		Commands::Exec(args) => {
			assert_eq!(args.source, None);
			assert_eq!(args.preamble, Some(PathBuf::from("lib.js")));
		}
		_ => panic!("Expected Exec command"),
	}
}

#[test]
fn parse_call_keeps_negative_numbers() {
	let cli = Cli::try_parse_from(["jsbridge", "call", "Math.max", "-1", "2"]).unwrap();

	match cli.command {
		Commands::Call(args) => {
			assert_eq!(args.function, "Math.max");
			assert_eq!(args.args, ["-1", "2"]);
		}
		_ => panic!("Expected Call command"),
	}
}

#[test]
fn global_flags_after_subcommand() {
	let cli = Cli::try_parse_from(["jsbridge", "runtimes", "-f", "json", "--runtime", "Node", "-vv"]).unwrap();

	assert!(matches!(cli.command, Commands::Runtimes));
	assert_eq!(cli.format, OutputFormat::Json);
	assert_eq!(cli.runtime.as_deref(), Some("Node"));
	assert_eq!(cli.verbose, 2);
}

#[test]
fn unknown_format_is_rejected() {
	assert!(Cli::try_parse_from(["jsbridge", "-f", "yaml", "runtimes"]).is_err());
}
