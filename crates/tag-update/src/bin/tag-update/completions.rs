//! Shell completion scripts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::Cli;
use crate::style;

/// Writes the completion script to `output`, or to stdout when absent.
pub fn run_completions(shell: Shell, output: Option<PathBuf>) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            clap_complete::generate(shell, &mut cmd, name, &mut writer);
            writer
                .flush()
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "{}",
                style::success(format!("{shell} completions written to {}", path.display()))
            );
        }
        None => clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout()),
    }
    Ok(())
}
