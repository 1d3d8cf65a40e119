
use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

/// Log in to remote landscapes through the browser.
#[derive(Parser, Debug)]
#[command(name = "extlogin")]
#[command(about = "Browser-redirect login for remote landscapes")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: toon (default), json, ndjson, or text
	#[arg(short = 'f', long, global = true, value_enum, default_value = "toon")]
	pub format: OutputFormat,

	/// Config file (default: $XDG_CONFIG_HOME/extlogin/config.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Reuse a valid session or log in through the browser.
	Login(LoginArgs),
	/// Show whether the stored session is still valid.
	Status(LandscapeArgs),
	/// Show when a token expires.
	Expiry(ExpiryArgs),
	/// Forget the stored session.
	Logout(LandscapeArgs),
}

impl Commands {
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Login(_) => "login",
			Commands::Status(_) => "status",
			Commands::Expiry(_) => "expiry",
			Commands::Logout(_) => "logout",
		}
	}
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
	/// Landscape base URL (e.g. https://tenant.example.com)
	#[arg(value_name = "LANDSCAPE")]
	pub landscape: String,

	/// How long to wait for the token
	#[arg(long, value_name = "MS")]
	pub timeout_ms: Option<u64>,

	/// Local port the login page posts the token to
	#[arg(long, value_name = "PORT")]
	pub port: Option<u16>,

	/// Log in even if the stored session is still valid
	#[arg(long)]
	pub force: bool,

	/// Include the token in the output
	#[arg(long)]
	pub print_token: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LandscapeArgs {
	/// Landscape base URL
	#[arg(value_name = "LANDSCAPE")]
	pub landscape: String,
}

#[derive(Args, Debug, Clone)]
pub struct ExpiryArgs {
	/// Token to inspect, or `@-` to read it from stdin
	#[arg(value_name = "TOKEN", default_value = "@-")]
	pub token: String,
}

/// Cargo-like help colors.
fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
		.valid(AnsiColor::Cyan.on_default())
}
