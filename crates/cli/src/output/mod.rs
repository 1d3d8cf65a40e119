//! Result envelope printed by every command.
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "ok": true,
//!   "command": "login",
//!   "data": { "landscape": "https://tenant.example.com", "reused": false, ... },
//!   "timings": { "durationMs": 8123 }
//! }
//! ```
//!
//! On failure `data` is replaced by `error` with a stable `code`:
//!
//! ```json
//! {
//!   "ok": false,
//!   "command": "login",
//!   "error": { "code": "TIMEOUT", "message": "Login timed out after 60000ms..." }
//! }
//! ```


use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use colored::Colorize;
use serde::{Deserialize, Serialize};

/// Bumped on breaking changes to the envelope shape.
pub const SCHEMA_VERSION: u32 = 1;

/// Output format for CLI results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// TOON output (default, token-efficient)
	#[default]
	Toon,
	/// JSON output
	Json,
	/// Newline-delimited JSON
	Ndjson,
	/// Human-readable text
	Text,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub schema_version: Option<u32>,

	pub ok: bool,

	/// Command name (`login`, `status`, `expiry`, `logout`)
	pub command: String,

	/// Present on success
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,

	/// Present on failure
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub timings: Option<Timings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,

	/// Message safe to show the user
	pub message: String,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Stable error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// The capture listener could not be started
	ListenFailed,
	/// A login for the landscape is already waiting
	AlreadyListening,
	/// The login page posted no usable token
	InvalidPayload,
	/// No token arrived before the deadline
	Timeout,
	/// No browser could be launched
	BrowserOpenFailed,
	/// Interrupted by the user
	Cancelled,
	/// No stored token for the landscape
	NotLoggedIn,
	/// Token could not be decoded
	InvalidToken,
	/// Session file could not be read or written
	SessionError,
	/// File I/O error
	IoError,
	/// Invalid argument or configuration
	InvalidInput,
	InternalError,
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let code = match self {
			ErrorCode::ListenFailed => "LISTEN_FAILED",
			ErrorCode::AlreadyListening => "ALREADY_LISTENING",
			ErrorCode::InvalidPayload => "INVALID_PAYLOAD",
			ErrorCode::Timeout => "TIMEOUT",
			ErrorCode::BrowserOpenFailed => "BROWSER_OPEN_FAILED",
			ErrorCode::Cancelled => "CANCELLED",
			ErrorCode::NotLoggedIn => "NOT_LOGGED_IN",
			ErrorCode::InvalidToken => "INVALID_TOKEN",
			ErrorCode::SessionError => "SESSION_ERROR",
			ErrorCode::IoError => "IO_ERROR",
			ErrorCode::InvalidInput => "INVALID_INPUT",
			ErrorCode::InternalError => "INTERNAL_ERROR",
		};
		f.write_str(code)
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
	pub duration_ms: u64,
}

impl From<Duration> for Timings {
	fn from(duration: Duration) -> Self {
		Timings {
			duration_ms: duration.as_millis() as u64,
		}
	}
}

pub struct ResultBuilder<T: Serialize> {
	schema_version: Option<u32>,
	command: String,
	data: Option<T>,
	error: Option<CommandError>,
	start_time: Instant,
}

impl<T: Serialize> ResultBuilder<T> {
	pub fn new(command: impl Into<String>) -> Self {
		Self::started_at(command, Instant::now())
	}

	/// Builder whose timings count from `start`.
	pub fn started_at(command: impl Into<String>, start: Instant) -> Self {
		Self {
			schema_version: Some(SCHEMA_VERSION),
			command: command.into(),
			data: None,
			error: None,
			start_time: start,
		}
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn failure(mut self, error: CommandError) -> Self {
		self.error = Some(error);
		self
	}

	pub fn build(self) -> CommandResult<T> {
		let ok = self.error.is_none() && self.data.is_some();

		CommandResult {
			schema_version: self.schema_version,
			ok,
			command: self.command,
			data: self.data,
			error: self.error,
			timings: Some(Timings::from(self.start_time.elapsed())),
		}
	}
}

/// Print a command result to stdout in the specified format
pub fn print_result<T: Serialize>(result: &CommandResult<T>, format: OutputFormat) {
	match format {
		OutputFormat::Toon => {
			if let Ok(json_value) = serde_json::to_value(result) {
				println!("{}", toon::encode(&json_value, None));
			}
		}
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Ndjson => {
			if let Ok(json) = serde_json::to_string(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => print_result_text(result),
	}
}

fn print_result_text<T: Serialize>(result: &CommandResult<T>) {
	let mut stdout = io::stdout().lock();

	if let Some(ref data) = result.data {
		if let Ok(value) = serde_json::to_value(data) {
			for line in text_lines(&value) {
				let _ = writeln!(stdout, "{line}");
			}
		}
	} else if let Some(ref error) = result.error {
		let _ = writeln!(stdout, "Error [{}]: {}", error.code, error.message);
	}
}

/// Renders a data object as `key: value` lines, skipping nulls.
fn text_lines(value: &serde_json::Value) -> Vec<String> {
	match value {
		serde_json::Value::Object(map) => map
			.iter()
			.filter(|(_, v)| !v.is_null())
			.map(|(k, v)| match v {
				serde_json::Value::String(s) => format!("{k}: {s}"),
				other => format!("{k}: {other}"),
			})
			.collect(),
		serde_json::Value::Null => Vec::new(),
		other => vec![other.to_string()],
	}
}

/// Print an error to stderr in human-readable format
pub fn print_error_stderr(error: &CommandError) {
	eprintln!("{} [{}]: {}", "Error".red().bold(), error.code, error.message);
}

/// Result data for `login`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
	pub landscape: String,
	/// True when a stored session was still valid and no browser was opened
	pub reused: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub expires_in_ms: Option<i64>,
	pub session_file: PathBuf,
	/// Only present with `--print-token`
	#[serde(skip_serializing_if = "Option::is_none")]
	pub token: Option<String>,
}

/// Result data for `status`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
	pub landscape: String,
	pub logged_in: bool,
	pub valid: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub expires_in_ms: Option<i64>,
}

/// Result data for `expiry`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryData {
	/// Milliseconds since the epoch, 0 when the token has no `exp` claim
	pub expires_at_ms: i64,
	pub expires_in_ms: i64,
	pub expired: bool,
}

/// Result data for `logout`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutData {
	pub landscape: String,
	pub removed: bool,
}
