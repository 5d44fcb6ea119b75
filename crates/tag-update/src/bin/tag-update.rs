//! CLI entrypoint for tag update processing.

#[path = "tag-update/cli.rs"]
mod cli;
#[path = "tag-update/completions.rs"]
mod completions;
#[path = "tag-update/run.rs"]
mod run;
#[path = "tag-update/style.rs"]
mod style;

use clap::Parser;

use cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    if let Err(err) = dispatch() {
        eprintln!("{}", style::error(format!("Error: {err:#}")));
        std::process::exit(1);
    }
    Ok(())
}

fn dispatch() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Apply {
            device,
            envelope,
            expected_id,
            json,
        } => run::run_apply(device, envelope, expected_id, json, cli.verbose),
        Command::Check {
            device,
            envelope,
            expected_id,
            json,
        } => run::run_check(device, envelope, expected_id, json, cli.verbose),
        Command::Tags { device } => run::run_tags(device, cli.verbose),
        Command::Completions { shell, output } => completions::run_completions(shell, output),
    }
}
