//! On-disk CLI state: the config file and the session file.

mod sessions;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use extlogin::LoginConfig;

pub use sessions::SessionFile;

use crate::error::{CliError, Result};

/// File paths for CLI state under `$XDG_CONFIG_HOME/extlogin/`.
#[derive(Debug, Clone)]
pub struct StatePaths {
	pub config: PathBuf,
	pub sessions: PathBuf,
}

impl StatePaths {
	pub fn from_env() -> Self {
		let config_home = std::env::var_os("XDG_CONFIG_HOME")
			.map(PathBuf::from)
			.or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
			.unwrap_or_else(|| PathBuf::from("."));

		Self::in_dir(config_home.join("extlogin"))
	}

	pub fn in_dir(dir: impl AsRef<Path>) -> Self {
		let dir = dir.as_ref();
		Self {
			config: dir.join("config.json"),
			sessions: dir.join("sessions.json"),
		}
	}
}

/// Loads the login config. Layers, last wins: defaults, file, environment.
///
/// An explicit `path` must exist; the default config file may be absent.
pub fn load_config(
	explicit: Option<&Path>,
	paths: &StatePaths,
	env: impl Fn(&str) -> Option<String>,
) -> Result<LoginConfig> {
	let mut config = match explicit {
		Some(path) => read_json(path).map_err(|source| CliError::Config {
			path: path.to_path_buf(),
			source,
		})?,
		None if paths.config.exists() => read_json(&paths.config).map_err(|source| CliError::Config {
			path: paths.config.clone(),
			source,
		})?,
		None => LoginConfig::default(),
	};
	config.apply_env(env);
	Ok(config)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
	let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
	serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn save_json<T: serde::Serialize>(path: &Path, data: &T) -> anyhow::Result<()> {
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
	}
	fs::write(path, serde_json::to_string_pretty(data)?).with_context(|| format!("writing {}", path.display()))?;
	Ok(())
}

/// Writes `data` and restricts the file to its owner.
fn save_secret_json<T: serde::Serialize>(path: &Path, data: &T) -> anyhow::Result<()> {
	save_json(path, data)?;
	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		fs::set_permissions(path, fs::Permissions::from_mode(0o600))
			.with_context(|| format!("restricting {}", path.display()))?;
	}
	Ok(())
}
