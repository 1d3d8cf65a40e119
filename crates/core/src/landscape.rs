//! Landscape identifiers.

use std::fmt;

use extlogin_protocol::LOGIN_PORT_PARAM;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Identifier of a remote landscape: the base URL of its login endpoint.
///
/// Used verbatim as the key for listeners and sessions. The value comes from
/// the user, so it is only ever echoed into headers through [`origin`](Self::origin).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Landscape(String);

impl Landscape {
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Parses the identifier as an absolute `http` or `https` URL.
	pub fn url(&self) -> Result<Url> {
		let url = Url::parse(&self.0).map_err(|e| Error::InvalidLandscape {
			value: self.0.clone(),
			reason: e.to_string(),
		})?;
		match url.scheme() {
			"http" | "https" if url.has_host() => Ok(url),
			scheme => Err(Error::InvalidLandscape {
				value: self.0.clone(),
				reason: format!("expected an http(s) URL with a host, got scheme '{scheme}'"),
			}),
		}
	}

	/// ASCII-serialized origin, safe to place in a response header.
	///
	/// Returns [`None`] when the identifier has no tuple origin.
	pub fn origin(&self) -> Option<String> {
		let url = self.url().ok()?;
		let origin = url.origin();
		origin.is_tuple().then(|| origin.ascii_serialization())
	}

	/// URL that starts the external login, telling the page which local port
	/// to post the token to.
	pub fn login_url(&self, login_path: &str, port: u16) -> Result<String> {
		let mut url = self.url()?;
		url.set_path(login_path);
		url.set_query(None);
		url.set_fragment(None);
		url.query_pairs_mut()
			.append_pair(LOGIN_PORT_PARAM, &port.to_string());
		Ok(url.into())
	}
}

impl fmt::Display for Landscape {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for Landscape {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

impl From<String> for Landscape {
	fn from(value: String) -> Self {
		Self(value)
	}
}
