//! ollamactl CLI - manage an Ollama container on Docker or Podman

use clap::Parser;
use colored::Colorize;
use ollamactl::cli::Args;
use ollamactl::{execute_command, format_output, ExecutionContext, Host, OutputFormat, SystemRunner};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Usage errors exit 1; help and version are not errors.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_logging(args.verbose, args.no_color);

    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(e.exit_code());
        }
    }
}

fn init_logging(verbose: bool, no_color: bool) {
    if no_color {
        colored::control::set_override(false);
    }

    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .without_time()
        .init();
}

fn run(args: Args) -> ollamactl::Result<i32> {
    let ctx = ExecutionContext {
        dry_run: args.dry_run,
        output_format: if args.json { OutputFormat::Json } else { OutputFormat::Human },
        verbose: args.verbose,
        runtime: args.runtime,
        name: args.name,
        image: args.image,
        gpu: args.gpu,
        ..ExecutionContext::default()
    };
    let host = Host::current()?;

    let result = execute_command(&args.command, &ctx, &host, &SystemRunner)?;
    if let Some(text) = format_output(&result, &ctx.output_format) {
        println!("{}", text);
    }
    Ok(result.exit_code())
}
