//! Completion command handler.

use std::io::Write;

use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::Shell;

use super::Cli;

#[derive(Args, Debug)]
pub struct CompletionArgs {
	/// Shell to generate completions for
	#[arg(value_enum)]
	pub shell: Shell,
}

/// Write the completion script for the requested shell.
pub fn run<W: Write>(args: CompletionArgs, mut writer: W) -> Result<()> {
	let mut command = Cli::command();
	let name = command.get_name().to_string();
	clap_complete::generate(args.shell, &mut command, name, &mut writer);
	writer.flush()?;
	Ok(())
}
