use std::path::PathBuf;

use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Login(#[from] extlogin::Error),

	#[error("invalid input: {0}")]
	InvalidInput(String),

	#[error("config file {path}: {source}")]
	Config {
		path: PathBuf,
		#[source]
		source: anyhow::Error,
	},

	#[error("session file {path}: {source}")]
	SessionFile {
		path: PathBuf,
		#[source]
		source: anyhow::Error,
	},

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

fn login_code(err: &extlogin::Error) -> ErrorCode {
	use extlogin::Error;

	match err {
		Error::Listen { .. } => ErrorCode::ListenFailed,
		Error::AlreadyListening { .. } => ErrorCode::AlreadyListening,
		Error::InvalidPayload { .. } => ErrorCode::InvalidPayload,
		Error::Timeout { .. } => ErrorCode::Timeout,
		Error::BrowserOpenFailed { .. } => ErrorCode::BrowserOpenFailed,
		Error::Cancelled { .. } => ErrorCode::Cancelled,
		Error::InvalidLandscape { .. } => ErrorCode::InvalidInput,
		Error::NoSession { .. } => ErrorCode::NotLoggedIn,
		Error::SessionStore(_) => ErrorCode::SessionError,
		Error::Decode(_) => ErrorCode::InvalidToken,
	}
}

impl CliError {
	/// Converts to the envelope error. The message never carries OS or decoder detail.
	pub fn to_command_error(&self) -> CommandError {
		let (code, message, details) = match self {
			CliError::Login(err) => {
				let details = match err {
					extlogin::Error::Timeout { landscape, ms } => {
						Some(serde_json::json!({ "landscape": landscape, "timeoutMs": ms }))
					}
					extlogin::Error::BrowserOpenFailed { landscape, url } => {
						Some(serde_json::json!({ "landscape": landscape, "url": url }))
					}
					other => other.landscape().map(|l| serde_json::json!({ "landscape": l })),
				};
				(login_code(err), err.user_message(), details)
			}
			CliError::InvalidInput(msg) => (ErrorCode::InvalidInput, msg.clone(), None),
			CliError::Config { path, .. } => (
				ErrorCode::InvalidInput,
				format!("Could not load config file {}", path.display()),
				Some(serde_json::json!({ "path": path })),
			),
			CliError::SessionFile { path, .. } => (
				ErrorCode::SessionError,
				format!("Could not access the session file {}", path.display()),
				Some(serde_json::json!({ "path": path })),
			),
			CliError::Io(_) => (ErrorCode::IoError, "I/O error".to_string(), None),
			CliError::Json(_) => (ErrorCode::InternalError, "Could not encode output".to_string(), None),
		};

		CommandError { code, message, details }
	}
}
