//! Caller-facing entry point: reuse a valid session, otherwise log in.

use std::future::Future;

use tracing::debug;

use crate::error::Result;
use crate::landscape::Landscape;
use crate::orchestrator::LoginOrchestrator;
use crate::session::{SessionGate, SessionStore};
use crate::token::Token;

pub struct Authenticator<S> {
	gate: SessionGate<S>,
	orchestrator: LoginOrchestrator,
}

impl<S: SessionStore> Authenticator<S> {
	pub fn new(gate: SessionGate<S>, orchestrator: LoginOrchestrator) -> Self {
		Self { gate, orchestrator }
	}

	pub fn gate(&self) -> &SessionGate<S> {
		&self.gate
	}

	pub fn orchestrator(&self) -> &LoginOrchestrator {
		&self.orchestrator
	}

	/// Returns the stored token if it is still valid, otherwise runs an
	/// external login. `Ok(None)` means the browser could not be opened.
	pub async fn authenticate(&self, landscape: &Landscape) -> Result<Option<Token>> {
		self.authenticate_with_cancel(landscape, std::future::pending::<()>()).await
	}

	pub async fn authenticate_with_cancel<C>(&self, landscape: &Landscape, cancel: C) -> Result<Option<Token>>
	where
		C: Future<Output = ()>,
	{
		if let Some(token) = self.gate.valid_token(landscape).await {
			debug!(target = "extlogin", %landscape, "reusing stored session");
			return Ok(Some(token));
		}
		self.orchestrator.login_with_cancel(landscape, cancel).await
	}

	/// Always runs an external login, ignoring any stored session.
	pub async fn login(&self, landscape: &Landscape) -> Result<Option<Token>> {
		self.orchestrator.login(landscape).await
	}

	pub async fn login_with_cancel<C>(&self, landscape: &Landscape, cancel: C) -> Result<Option<Token>>
	where
		C: Future<Output = ()>,
	{
		self.orchestrator.login_with_cancel(landscape, cancel).await
	}

	pub async fn is_session_valid(&self, landscape: &Landscape) -> bool {
		self.gate.has_valid_session(landscape).await
	}

	pub fn time_until_expiry(&self, token: &Token) -> Result<i64> {
		self.gate.time_until_expiry(token)
	}
}
