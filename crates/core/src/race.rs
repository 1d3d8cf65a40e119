//! Deadline race over a pending capture.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::capture::PendingCapture;
use crate::error::{Error, Result};
use crate::token::Token;

/// Waits for `pending` to settle, failing with [`Error::Timeout`] once
/// `deadline` has elapsed.
///
/// A capture that settles after the deadline is dropped; the listener's own
/// teardown is the only thing that ever sees it.
pub async fn race_with_timeout(deadline: Duration, pending: PendingCapture) -> Result<Token> {
	race_with_cancel(deadline, pending, std::future::pending::<()>()).await
}

/// Like [`race_with_timeout`], with `cancel` as a third settlement source
/// that fails the race with [`Error::Cancelled`].
///
/// When several sources are ready at once the capture wins, then the
/// deadline, then cancellation.
pub async fn race_with_cancel<C>(deadline: Duration, pending: PendingCapture, cancel: C) -> Result<Token>
where
	C: Future<Output = ()>,
{
	let landscape = pending.landscape().clone();

	tokio::select! {
		biased;

		outcome = pending.settled() => {
			debug!(target = "extlogin", %landscape, ok = outcome.is_ok(), "capture settled");
			outcome
		}
		() = tokio::time::sleep(deadline) => {
			let ms = deadline.as_millis() as u64;
			warn!(target = "extlogin", %landscape, ms, "timed out waiting for token");
			Err(Error::Timeout { landscape, ms })
		}
		() = cancel => {
			debug!(target = "extlogin", %landscape, "login cancelled");
			Err(Error::Cancelled { landscape })
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::capture::CaptureServer;
	use crate::config::LoginConfig;
	use crate::landscape::Landscape;
	use crate::registry::ListenerRegistry;

	fn server() -> CaptureServer {
		let config = LoginConfig::default()
			.with_port(0)
			.with_shutdown_grace(Duration::from_millis(200));
		CaptureServer::new(ListenerRegistry::new(), config)
	}

	#[tokio::test]
	async fn deadline_wins_when_nothing_is_posted() {
		let server = server();
		let landscape = Landscape::new("https://a.example.com");
		let pending = server.start(&landscape).unwrap();

		let err = race_with_timeout(Duration::from_millis(50), pending).await.unwrap_err();

		assert!(matches!(err, Error::Timeout { ms: 50, .. }));
		assert!(err.is_timeout());
		server.terminate(&landscape).await;
	}

	#[tokio::test]
	async fn cancel_wins_before_deadline() {
		let server = server();
		let landscape = Landscape::new("https://a.example.com");
		let pending = server.start(&landscape).unwrap();

		let err = race_with_cancel(Duration::from_secs(30), pending, async {})
			.await
			.unwrap_err();

		assert!(matches!(err, Error::Cancelled { .. }));
		server.terminate(&landscape).await;
	}

	#[tokio::test]
	async fn closed_listener_settles_before_deadline() {
		let server = server();
		let landscape = Landscape::new("https://a.example.com");
		let pending = server.start(&landscape).unwrap();
		server.terminate(&landscape).await;

		let err = race_with_timeout(Duration::from_secs(30), pending).await.unwrap_err();

		assert!(matches!(err, Error::Listen { .. }));
	}
}
