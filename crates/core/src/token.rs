//! Tokens and expiry arithmetic.
//!
//! A [`Token`] is an opaque JWT-shaped string. Only the `exp` claim of its
//! payload is ever read; the signature is never checked locally, the landscape
//! does that.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Signed token issued by the landscape's identity service.
///
/// `Debug` never prints the token value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn into_string(self) -> String {
		self.0
	}
}

impl fmt::Debug for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Token(<{} bytes>)", self.0.len())
	}
}

/// Failure to read the claims of a [`Token`].
#[derive(Debug, Error)]
pub enum DecodeError {
	#[error("token has no payload segment")]
	MissingPayload,

	#[error("token payload is not base64url: {0}")]
	Base64(#[from] base64::DecodeError),

	#[error("token payload is not a JSON claims object: {0}")]
	Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct Claims {
	/// Seconds since epoch, possibly fractional.
	#[serde(default)]
	exp: Option<f64>,
}

/// Decodes the `exp` claim of `token` as milliseconds since epoch.
///
/// A token without `exp` expires at epoch 0, i.e. it is always expired.
pub fn expiry_of(token: &Token) -> Result<i64, DecodeError> {
	let payload = token
		.as_str()
		.split('.')
		.nth(1)
		.filter(|segment| !segment.is_empty())
		.ok_or(DecodeError::MissingPayload)?;
	let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
	let claims: Claims = serde_json::from_slice(&bytes)?;
	Ok(claims.exp.map_or(0, |exp| (exp * 1000.0) as i64))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Now {
	System,
	Fixed(i64),
}

/// Expiry arithmetic against a clock.
///
/// [`TokenClock::system`] reads wall time; [`TokenClock::fixed`] pins "now"
/// for deterministic checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenClock {
	now: Now,
}

impl Default for TokenClock {
	fn default() -> Self {
		Self::system()
	}
}

impl TokenClock {
	pub fn system() -> Self {
		Self { now: Now::System }
	}

	/// Clock frozen at `now_ms` milliseconds since epoch.
	pub fn fixed(now_ms: i64) -> Self {
		Self {
			now: Now::Fixed(now_ms),
		}
	}

	/// Current time in milliseconds since epoch.
	pub fn now_ms(&self) -> i64 {
		match self.now {
			Now::Fixed(ms) => ms,
			Now::System => SystemTime::now()
				.duration_since(UNIX_EPOCH)
				.map_or(0, |elapsed| elapsed.as_millis() as i64),
		}
	}

	/// Milliseconds until `token` expires; negative once it has.
	pub fn ms_until_expiry(&self, token: &Token) -> Result<i64, DecodeError> {
		let until = expiry_of(token)? - self.now_ms();
		debug!(target = "extlogin", expires_in_secs = until / 1000, "token expiry");
		Ok(until)
	}

	pub fn is_expired(&self, token: &Token) -> Result<bool, DecodeError> {
		let expiry = expiry_of(token)?;
		debug!(target = "extlogin", expires_at_ms = expiry, "token expiry");
		Ok(self.now_ms() >= expiry)
	}

	/// `true` only for a decodable, unexpired token.
	pub fn is_valid(&self, token: &Token) -> bool {
		matches!(self.is_expired(token), Ok(false))
	}
}
