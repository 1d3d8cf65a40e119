use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs the stderr subscriber. `RUST_LOG` takes precedence over `-v`.
pub fn init_logging(verbosity: u8) {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}

// 0 keeps stderr to the error line printed by the command itself.
fn default_filter(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "off",
		1 => "warn,extlogin=info,extlogin_cli=info",
		_ => "debug,hyper=info",
	}
}
