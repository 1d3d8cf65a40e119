//! Protocol types for the token capture rendezvous.
//!
//! The exchange is a single request:
//!
//! 1. The login page sends `OPTIONS` [`CAPTURE_PATH`] as a CORS preflight
//! 2. The login page sends `POST` [`CAPTURE_PATH`] with a [`CapturePayload`]
//! 3. The listener answers with a [`CaptureResponse`]
//!
//! Success and failure are carried in the response body, the HTTP status is
//! always `200`.

use serde::{Deserialize, Serialize};

/// Path the external login page posts the token to.
pub const CAPTURE_PATH: &str = "/ext-login";

/// Well-known local port the landscape login page expects the listener on.
pub const DEFAULT_CAPTURE_PORT: u16 = 55532;

/// Path on the landscape that starts the external login flow.
pub const DEFAULT_LOGIN_PATH: &str = "/ext-login";

/// Query parameter on the login URL naming the local listener port.
pub const LOGIN_PORT_PARAM: &str = "ext-login-port";

/// Body field carrying the token.
pub const TOKEN_FIELD: &str = "token";

/// Field name older landscapes post the token under.
pub const TOKEN_FIELD_LEGACY: &str = "jwt";

/// Prefix of an HTML error page posted in place of a token.
///
/// Known weak heuristic: a token whose value literally starts with this
/// marker is misclassified. Kept as-is for compatibility with deployed login
/// pages.
pub const HTML_ERROR_MARKER: &str = "<html>";

/// Returns `true` if the posted value is an HTML page rather than a token.
pub fn looks_like_html(value: &str) -> bool {
	value.starts_with(HTML_ERROR_MARKER)
}

/// Body posted by the external login page.
///
/// JSON and form-encoded bodies carry the same fields. When both are present
/// `token` wins over the legacy `jwt`. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturePayload {
	/// The issued token, [`None`] if the page posted nothing usable.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token: Option<String>,

	/// Token under the field name older landscapes use.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub jwt: Option<String>,
}

impl CapturePayload {
	pub fn new(token: impl Into<String>) -> Self {
		Self {
			token: Some(token.into()),
			jwt: None,
		}
	}

	/// Collects the token fields from decoded form pairs. The first
	/// occurrence of each field is kept.
	pub fn from_form<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: AsRef<str>,
		V: Into<String>,
	{
		let mut payload = Self::default();
		for (key, value) in pairs {
			let field = match key.as_ref() {
				TOKEN_FIELD => &mut payload.token,
				TOKEN_FIELD_LEGACY => &mut payload.jwt,
				_ => continue,
			};
			if field.is_none() {
				*field = Some(value.into());
			}
		}
		payload
	}

	/// Parses a JSON body. Unparseable bodies yield an empty payload.
	pub fn from_json(body: &[u8]) -> Self {
		serde_json::from_slice(body).unwrap_or_default()
	}

	/// Returns the token if it is present, non-empty and not an HTML page.
	pub fn usable_token(&self) -> Option<&str> {
		self.token
			.as_deref()
			.or(self.jwt.as_deref())
			.filter(|token| !token.is_empty() && !looks_like_html(token))
	}
}

/// Outcome reported back to the login page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStatus {
	/// The token was accepted and the rendezvous is complete.
	Ok,
	/// The payload was unusable, or a token was already captured.
	Error,
}

/// Response body for `POST` [`CAPTURE_PATH`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureResponse {
	pub status: CaptureStatus,
}

impl CaptureResponse {
	pub const OK: Self = Self {
		status: CaptureStatus::Ok,
	};
	pub const ERROR: Self = Self {
		status: CaptureStatus::Error,
	};

	pub fn is_ok(&self) -> bool {
		self.status == CaptureStatus::Ok
	}
}
