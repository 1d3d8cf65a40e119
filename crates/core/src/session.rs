//! Read-only view of sessions established earlier.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::landscape::Landscape;
use crate::token::{Token, TokenClock};

/// Source of the current token per landscape.
///
/// Owned outside the login core; the core only ever reads from it.
#[async_trait]
pub trait SessionStore: Send + Sync {
	async fn current_token(&self, landscape: &Landscape) -> Result<Option<Token>>;
}

/// In-memory [`SessionStore`], for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
	tokens: RwLock<HashMap<Landscape, Token>>,
}

impl MemorySessionStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&self, landscape: Landscape, token: Token) {
		self.tokens.write().insert(landscape, token);
	}

	pub fn remove(&self, landscape: &Landscape) -> Option<Token> {
		self.tokens.write().remove(landscape)
	}
}

#[async_trait]
impl SessionStore for MemorySessionStore {
	async fn current_token(&self, landscape: &Landscape) -> Result<Option<Token>> {
		Ok(self.tokens.read().get(landscape).cloned())
	}
}

/// Answers "is there a usable session for this landscape?".
///
/// Every failure along the way (lookup, decoding) reads as "no".
#[derive(Debug, Clone)]
pub struct SessionGate<S> {
	store: S,
	clock: TokenClock,
}

impl<S: SessionStore> SessionGate<S> {
	pub fn new(store: S) -> Self {
		Self::with_clock(store, TokenClock::system())
	}

	pub fn with_clock(store: S, clock: TokenClock) -> Self {
		Self { store, clock }
	}

	pub fn store(&self) -> &S {
		&self.store
	}

	pub fn clock(&self) -> &TokenClock {
		&self.clock
	}

	/// Stored token for `landscape`, failing with [`Error::NoSession`].
	pub async fn token(&self, landscape: &Landscape) -> Result<Token> {
		self.store
			.current_token(landscape)
			.await?
			.ok_or_else(|| {
				debug!(target = "extlogin", %landscape, "no token exists");
				Error::NoSession {
					landscape: landscape.clone(),
				}
			})
	}

	/// Stored token for `landscape` if it is present and unexpired.
	pub async fn valid_token(&self, landscape: &Landscape) -> Option<Token> {
		match self.token(landscape).await {
			Ok(token) if self.clock.is_valid(&token) => Some(token),
			Ok(_) => {
				debug!(target = "extlogin", %landscape, "stored token is expired or malformed");
				None
			}
			Err(e) => {
				debug!(target = "extlogin", %landscape, error = %e, "session lookup failed");
				None
			}
		}
	}

	pub async fn has_valid_session(&self, landscape: &Landscape) -> bool {
		self.valid_token(landscape).await.is_some()
	}

	/// Milliseconds until `token` expires; negative once it has.
	pub fn time_until_expiry(&self, token: &Token) -> Result<i64> {
		Ok(self.clock.ms_until_expiry(token)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::token::tests::{token_expiring_at_secs, token_with_claims};

	const NOW_MS: i64 = 1_700_000_000_000;

	struct FailingStore;

	#[async_trait]
	impl SessionStore for FailingStore {
		async fn current_token(&self, _: &Landscape) -> Result<Option<Token>> {
			Err(Error::SessionStore("keychain locked".into()))
		}
	}

	fn gate_with(landscape: &Landscape, token: Option<Token>) -> SessionGate<MemorySessionStore> {
		let store = MemorySessionStore::new();
		if let Some(token) = token {
			store.insert(landscape.clone(), token);
		}
		SessionGate::with_clock(store, TokenClock::fixed(NOW_MS))
	}

	#[tokio::test]
	async fn unexpired_token_is_a_valid_session() {
		let landscape = Landscape::new("https://a.example.com");
		let gate = gate_with(&landscape, Some(token_expiring_at_secs(NOW_MS / 1000 + 600)));

		assert!(gate.has_valid_session(&landscape).await);
		assert!(gate.valid_token(&landscape).await.is_some());
	}

	#[tokio::test]
	async fn missing_session_is_invalid() {
		let landscape = Landscape::new("https://a.example.com");
		let gate = gate_with(&landscape, None);

		assert!(!gate.has_valid_session(&landscape).await);
		assert!(matches!(gate.token(&landscape).await, Err(Error::NoSession { .. })));
	}

	#[tokio::test]
	async fn expired_token_is_invalid() {
		let landscape = Landscape::new("https://a.example.com");
		let gate = gate_with(&landscape, Some(token_expiring_at_secs(NOW_MS / 1000 - 1)));

		assert!(!gate.has_valid_session(&landscape).await);
		assert!(gate.token(&landscape).await.is_ok());
	}

	#[tokio::test]
	async fn undecodable_token_fails_closed() {
		let landscape = Landscape::new("https://a.example.com");
		let gate = gate_with(&landscape, Some(Token::new("definitely-not-a-jwt")));

		assert!(!gate.has_valid_session(&landscape).await);
		let token = gate.token(&landscape).await.unwrap();
		assert!(matches!(gate.time_until_expiry(&token), Err(Error::Decode(_))));
	}

	#[tokio::test]
	async fn token_without_exp_is_invalid() {
		let landscape = Landscape::new("https://a.example.com");
		let gate = gate_with(&landscape, Some(token_with_claims(serde_json::json!({ "sub": "x" }))));

		assert!(!gate.has_valid_session(&landscape).await);
	}

	#[tokio::test]
	async fn store_failure_fails_closed() {
		let gate = SessionGate::new(FailingStore);
		let landscape = Landscape::new("https://a.example.com");

		assert!(!gate.has_valid_session(&landscape).await);
		assert!(matches!(gate.token(&landscape).await, Err(Error::SessionStore(_))));
	}

	#[tokio::test]
	async fn sessions_are_per_landscape() {
		let a = Landscape::new("https://a.example.com");
		let b = Landscape::new("https://b.example.com");
		let gate = gate_with(&a, Some(token_expiring_at_secs(NOW_MS / 1000 + 600)));

		assert!(gate.has_valid_session(&a).await);
		assert!(!gate.has_valid_session(&b).await);
		assert!(gate.store().remove(&a).is_some());
		assert!(!gate.has_valid_session(&a).await);
	}
}
