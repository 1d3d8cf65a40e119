mod expiry;
mod login;
mod logout;
mod status;

use std::time::Instant;

use serde::Serialize;

use crate::cli::{Cli, Commands};
use crate::error::Result;
use crate::output::{OutputFormat, ResultBuilder, print_result};
use crate::state::{StatePaths, load_config};

/// Runs the selected command and prints its success envelope.
///
/// Errors are returned unprinted; `main` renders them.
pub async fn dispatch(cli: Cli) -> Result<()> {
	let start = Instant::now();
	let format = cli.format;
	let command = cli.command.name();
	let paths = StatePaths::from_env();

	match cli.command {
		Commands::Login(args) => {
			let config = load_config(cli.config.as_deref(), &paths, |key| std::env::var(key).ok())?;
			let data = login::run(args, config, &paths).await?;
			emit(command, start, data, format);
		}
		Commands::Status(args) => emit(command, start, status::run(args, &paths).await?, format),
		Commands::Expiry(args) => emit(command, start, expiry::run(args)?, format),
		Commands::Logout(args) => emit(command, start, logout::run(args, &paths)?, format),
	}
	Ok(())
}

fn emit<T: Serialize>(command: &str, start: Instant, data: T, format: OutputFormat) {
	let result = ResultBuilder::started_at(command, start).data(data).build();
	print_result(&result, format);
}
