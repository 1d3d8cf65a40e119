use clap::Parser;
use extlogin_cli::{
	cli::Cli,
	commands,
	error::CliError,
	logging,
	output::{self, OutputFormat, ResultBuilder},
};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;
	let command = cli.command.name();

	if let Err(err) = commands::dispatch(cli).await {
		handle_error(command, err, format);
		std::process::exit(1);
	}
}

fn handle_error(command: &str, err: CliError, format: OutputFormat) {
	tracing::error!(target = "extlogin", command, error = %err, "command failed");

	let cmd_error = err.to_command_error();
	output::print_error_stderr(&cmd_error);

	if format != OutputFormat::Text {
		let result: output::CommandResult<()> = ResultBuilder::new(command).failure(cmd_error).build();
		output::print_result(&result, format);
	}
}
