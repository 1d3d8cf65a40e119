//! Listener and deadline configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use extlogin_protocol::{CAPTURE_PATH, DEFAULT_CAPTURE_PORT, DEFAULT_LOGIN_PATH};
use serde::{Deserialize, Serialize};

/// Default deadline for the token to arrive.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Default time a closing listener gets to finish in-flight responses.
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 2_000;

pub const ENV_PORT: &str = "EXTLOGIN_PORT";
pub const ENV_TIMEOUT_MS: &str = "EXTLOGIN_TIMEOUT_MS";

/// Settings for one login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginConfig {
	/// Interface the capture listener binds to.
	pub host: IpAddr,
	/// Capture listener port; `0` picks an ephemeral port.
	pub port: u16,
	pub capture_path: String,
	/// Path on the landscape that starts the external login.
	pub login_path: String,
	pub timeout_ms: u64,
	pub shutdown_grace_ms: u64,
}

impl Default for LoginConfig {
	fn default() -> Self {
		Self {
			host: IpAddr::V4(Ipv4Addr::LOCALHOST),
			port: DEFAULT_CAPTURE_PORT,
			capture_path: CAPTURE_PATH.to_string(),
			login_path: DEFAULT_LOGIN_PATH.to_string(),
			timeout_ms: DEFAULT_TIMEOUT_MS,
			shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
		}
	}
}

impl LoginConfig {
	pub fn with_port(mut self, port: u16) -> Self {
		self.port = port;
		self
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout_ms = timeout.as_millis() as u64;
		self
	}

	pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
		self.shutdown_grace_ms = grace.as_millis() as u64;
		self
	}

	pub fn bind_addr(&self) -> SocketAddr {
		SocketAddr::new(self.host, self.port)
	}

	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}

	pub fn shutdown_grace(&self) -> Duration {
		Duration::from_millis(self.shutdown_grace_ms)
	}

	/// Applies [`ENV_PORT`] and [`ENV_TIMEOUT_MS`] overrides from `lookup`.
	///
	/// Values that do not parse are ignored.
	pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
		if let Some(port) = lookup(ENV_PORT).and_then(|v| v.trim().parse().ok()) {
			self.port = port;
		}
		if let Some(ms) = lookup(ENV_TIMEOUT_MS).and_then(|v| v.trim().parse().ok()) {
			self.timeout_ms = ms;
		}
	}
}
