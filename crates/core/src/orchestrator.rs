//! Browser-redirect login: listener, browser, deadline, teardown.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::capture::CaptureServer;
use crate::config::LoginConfig;
use crate::error::Result;
use crate::landscape::Landscape;
use crate::race::race_with_cancel;
use crate::registry::{ListenerId, ListenerRegistry};
use crate::token::Token;

/// Opens a URL in the user's external browser.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
	/// Returns `false` if no handler could open `url`.
	async fn open(&self, url: &str) -> bool;
}

/// Runs one external login per call.
///
/// Every exit path closes the listener the call started, including a dropped
/// `login` future.
pub struct LoginOrchestrator {
	capture: CaptureServer,
	browser: Arc<dyn BrowserLauncher>,
}

impl LoginOrchestrator {
	pub fn new(registry: ListenerRegistry, config: LoginConfig, browser: Arc<dyn BrowserLauncher>) -> Self {
		Self {
			capture: CaptureServer::new(registry, config),
			browser,
		}
	}

	pub fn registry(&self) -> &ListenerRegistry {
		self.capture.registry()
	}

	pub fn config(&self) -> &LoginConfig {
		self.capture.config()
	}

	/// Logs in to `landscape` through the external browser.
	///
	/// Returns `Ok(None)` without waiting for the deadline if the browser
	/// could not be opened.
	pub async fn login(&self, landscape: &Landscape) -> Result<Option<Token>> {
		self.login_with_cancel(landscape, std::future::pending::<()>()).await
	}

	/// [`login`](Self::login) that also gives up once `cancel` completes.
	pub async fn login_with_cancel<C>(&self, landscape: &Landscape, cancel: C) -> Result<Option<Token>>
	where
		C: Future<Output = ()>,
	{
		landscape.url()?;
		let config = self.capture.config();

		let pending = self.capture.start(landscape)?;
		let guard = ListenerGuard::new(self.registry().clone(), landscape.clone(), pending.listener_id());
		let url = landscape.login_url(&config.login_path, pending.local_addr().port())?;

		info!(target = "extlogin", %landscape, %url, "opening external login");
		if !self.browser.open(&url).await {
			warn!(target = "extlogin", %landscape, %url, "browser could not be opened");
			guard.release().await;
			return Ok(None);
		}

		let outcome = race_with_cancel(config.timeout(), pending, cancel).await;
		guard.release().await;

		match &outcome {
			Ok(_) => info!(target = "extlogin", %landscape, "login completed"),
			Err(e) => warn!(target = "extlogin", %landscape, error = %e, "login failed"),
		}
		outcome.map(Some)
	}

	/// Closes any listener for `landscape`. Idempotent.
	pub async fn terminate(&self, landscape: &Landscape) -> bool {
		self.capture.terminate(landscape).await
	}
}

/// Closes one listener generation when released or dropped.
struct ListenerGuard {
	registry: ListenerRegistry,
	landscape: Landscape,
	id: ListenerId,
	released: bool,
}

impl ListenerGuard {
	fn new(registry: ListenerRegistry, landscape: Landscape, id: ListenerId) -> Self {
		Self {
			registry,
			landscape,
			id,
			released: false,
		}
	}

	async fn release(mut self) {
		self.released = true;
		self.registry.terminate_listener(&self.landscape, self.id).await;
	}
}

impl Drop for ListenerGuard {
	fn drop(&mut self) {
		if !self.released {
			self.registry.detach_listener(&self.landscape, self.id);
		}
	}
}
