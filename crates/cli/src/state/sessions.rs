use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use extlogin::{Landscape, SessionStore, Token};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{read_json, save_secret_json};
use crate::error::{CliError, Result};

const SESSIONS_SCHEMA: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionsDoc {
	#[serde(default)]
	schema: u32,
	#[serde(default)]
	sessions: BTreeMap<Landscape, Token>,
}

/// One token per landscape, persisted as JSON with owner-only permissions.
#[derive(Debug, Clone)]
pub struct SessionFile {
	path: PathBuf,
}

impl SessionFile {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load(&self) -> Result<SessionsDoc> {
		if !self.path.exists() {
			return Ok(SessionsDoc::default());
		}
		read_json(&self.path).map_err(|source| self.error(source))
	}

	fn save(&self, mut doc: SessionsDoc) -> Result<()> {
		doc.schema = SESSIONS_SCHEMA;
		save_secret_json(&self.path, &doc).map_err(|source| self.error(source))
	}

	fn error(&self, source: anyhow::Error) -> CliError {
		CliError::SessionFile {
			path: self.path.clone(),
			source,
		}
	}

	pub fn get(&self, landscape: &Landscape) -> Result<Option<Token>> {
		Ok(self.load()?.sessions.get(landscape).cloned())
	}

	/// Stores `token` as the session for `landscape`, replacing any previous one.
	pub fn record(&self, landscape: &Landscape, token: &Token) -> Result<()> {
		let mut doc = self.load()?;
		doc.sessions.insert(landscape.clone(), token.clone());
		self.save(doc)?;
		debug!(target = "extlogin", %landscape, path = %self.path.display(), "session recorded");
		Ok(())
	}

	/// Removes the session for `landscape`. Returns whether one existed.
	pub fn forget(&self, landscape: &Landscape) -> Result<bool> {
		let mut doc = self.load()?;
		if doc.sessions.remove(landscape).is_none() {
			return Ok(false);
		}
		self.save(doc)?;
		Ok(true)
	}
}

#[async_trait]
impl SessionStore for SessionFile {
	async fn current_token(&self, landscape: &Landscape) -> extlogin::Result<Option<Token>> {
		self.get(landscape)
			.map_err(|e| extlogin::Error::SessionStore(e.to_string()))
	}
}
