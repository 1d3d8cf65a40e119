//! Error types for the external login flow.

use thiserror::Error;

use crate::landscape::Landscape;
use crate::token::DecodeError;

/// Result type alias for login operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can end a login attempt or a session lookup.
///
/// Every variant is recoverable at the caller boundary: the attempt simply
/// did not produce a token. [`Display`](std::fmt::Display) carries the
/// diagnostic detail for logs, [`Error::user_message`] the text to show.
#[derive(Debug, Error)]
pub enum Error {
	/// The capture listener could not bind, or failed while serving.
	#[error("Failed to listen for the token of {landscape}: {reason}")]
	Listen { landscape: Landscape, reason: String },

	/// A capture for this landscape is already pending.
	#[error("A login for {landscape} is already waiting for its token")]
	AlreadyListening { landscape: Landscape },

	/// The login page posted no token, or an HTML error page instead of one.
	#[error("Received an incorrect token from {landscape}")]
	InvalidPayload { landscape: Landscape },

	/// No token was captured before the deadline.
	#[error("Timed out after {ms}ms waiting for the token of {landscape}")]
	Timeout { landscape: Landscape, ms: u64 },

	/// The external browser could not be opened at the login URL.
	#[error("Could not open a browser at {url} for {landscape}")]
	BrowserOpenFailed { landscape: Landscape, url: String },

	/// The external cancel source settled the race first.
	#[error("Login for {landscape} was cancelled")]
	Cancelled { landscape: Landscape },

	/// The landscape identifier is not an absolute http(s) URL.
	#[error("Invalid landscape '{value}': {reason}")]
	InvalidLandscape { value: String, reason: String },

	/// The session store holds no token for this landscape.
	#[error("No token exists for {landscape}")]
	NoSession { landscape: Landscape },

	/// The session store could not be read.
	#[error("Session store error: {0}")]
	SessionStore(String),

	/// The token could not be decoded.
	#[error(transparent)]
	Decode(#[from] DecodeError),
}

impl Error {
	/// Short, human-readable message for this kind of failure.
	///
	/// Unlike [`Display`](std::fmt::Display), this never includes raw
	/// reasons from the OS or the decoder.
	pub fn user_message(&self) -> String {
		match self {
			Error::Listen { landscape, .. } => {
				format!("Could not start the local login listener for {landscape}. Is another login running?")
			}
			Error::AlreadyListening { landscape } => {
				format!("A login for {landscape} is already in progress.")
			}
			Error::InvalidPayload { landscape } => {
				format!("The login page of {landscape} did not return a valid token. Please log in again.")
			}
			Error::Timeout { landscape, ms } => {
				format!(
					"No response from the login page of {landscape} within {} seconds.",
					ms / 1000
				)
			}
			Error::BrowserOpenFailed { landscape, .. } => {
				format!("Could not open a browser to log in to {landscape}.")
			}
			Error::Cancelled { landscape } => format!("Login to {landscape} was cancelled."),
			Error::InvalidLandscape { value, .. } => format!("'{value}' is not a valid landscape URL."),
			Error::NoSession { landscape } => format!("You are not logged in to {landscape}."),
			Error::SessionStore(_) => "Could not read the stored login sessions.".to_string(),
			Error::Decode(_) => "The stored token is malformed. Please log in again.".to_string(),
		}
	}

	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout { .. })
	}

	/// Returns the landscape this error concerns, if any.
	pub fn landscape(&self) -> Option<&Landscape> {
		match self {
			Error::Listen { landscape, .. }
			| Error::AlreadyListening { landscape }
			| Error::InvalidPayload { landscape }
			| Error::Timeout { landscape, .. }
			| Error::BrowserOpenFailed { landscape, .. }
			| Error::Cancelled { landscape }
			| Error::NoSession { landscape } => Some(landscape),
			Error::InvalidLandscape { .. } | Error::SessionStore(_) | Error::Decode(_) => None,
		}
	}
}
