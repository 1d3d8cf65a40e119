//! Local listener that captures the token posted by the external login page.
//!
//! [`CaptureServer::start`] binds one listener per landscape and returns a
//! [`PendingCapture`]. The first of these settles the capture, everything
//! after it is ignored:
//!
//! - a `POST` with a usable token (success)
//! - a `POST` without one ([`Error::InvalidPayload`])
//! - the serve loop failing or the listener closing ([`Error::Listen`])
//!
//! A winning `POST` also starts the listener's own graceful shutdown.

mod routes;
#[cfg(test)]
mod tests;

use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::config::LoginConfig;
use crate::error::{Error, Result};
use crate::landscape::Landscape;
use crate::registry::{ListenerHandle, ListenerId, ListenerRegistry};
use crate::token::Token;

pub(crate) use routes::{CaptureState, router};

type Outcome = Result<Token>;

/// Single-assignment result slot of a capture.
pub(crate) struct SettleSlot {
	sender: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl SettleSlot {
	pub(crate) fn new() -> (Arc<Self>, oneshot::Receiver<Outcome>) {
		let (tx, rx) = oneshot::channel();
		let slot = Self {
			sender: Mutex::new(Some(tx)),
		};
		(Arc::new(slot), rx)
	}

	/// Writes `outcome` if nothing was written before. Returns whether this
	/// call settled the slot.
	pub(crate) fn settle(&self, outcome: Outcome) -> bool {
		let Some(sender) = self.sender.lock().take() else {
			return false;
		};
		// The receiver is gone once the race was lost to the deadline.
		let _ = sender.send(outcome);
		true
	}

	/// Drops the sender unsettled; every later [`settle`](Self::settle) fails.
	pub(crate) fn close(&self) -> bool {
		self.sender.lock().take().is_some()
	}

	pub(crate) fn is_settled(&self) -> bool {
		self.sender.lock().is_none()
	}
}

/// An in-flight rendezvous with the external login page.
#[derive(Debug)]
pub struct PendingCapture {
	landscape: Landscape,
	listener_id: ListenerId,
	addr: SocketAddr,
	outcome: oneshot::Receiver<Outcome>,
}

impl PendingCapture {
	pub fn landscape(&self) -> &Landscape {
		&self.landscape
	}

	/// Address the listener actually bound to.
	pub fn local_addr(&self) -> SocketAddr {
		self.addr
	}

	pub fn listener_id(&self) -> ListenerId {
		self.listener_id
	}

	/// Waits for the capture to settle.
	///
	/// A listener that goes away without settling yields [`Error::Listen`].
	pub async fn settled(self) -> Result<Token> {
		match self.outcome.await {
			Ok(outcome) => outcome,
			Err(_) => Err(Error::Listen {
				landscape: self.landscape,
				reason: "listener closed before a token was captured".into(),
			}),
		}
	}
}

/// Starts and stops capture listeners against a shared [`ListenerRegistry`].
#[derive(Debug, Clone)]
pub struct CaptureServer {
	registry: ListenerRegistry,
	config: LoginConfig,
}

impl CaptureServer {
	pub fn new(registry: ListenerRegistry, config: LoginConfig) -> Self {
		Self { registry, config }
	}

	pub fn registry(&self) -> &ListenerRegistry {
		&self.registry
	}

	pub fn config(&self) -> &LoginConfig {
		&self.config
	}

	/// Binds the capture listener for `landscape`.
	///
	/// Fails with [`Error::AlreadyListening`] if a capture for the landscape
	/// is pending, and with [`Error::Listen`] if the port cannot be bound. In
	/// both cases no new registry entry exists afterwards.
	///
	/// Must be called from within a tokio runtime.
	pub fn start(&self, landscape: &Landscape) -> Result<PendingCapture> {
		validate_capture_path(landscape, &self.config.capture_path)?;

		let (slot, outcome) = SettleSlot::new();
		let (listener_id, addr) = self.registry.insert_with(landscape, |id| {
			let listener = bind(self.config.bind_addr()).map_err(|e| Error::Listen {
				landscape: landscape.clone(),
				reason: e.to_string(),
			})?;
			let addr = listener.local_addr().map_err(|e| Error::Listen {
				landscape: landscape.clone(),
				reason: e.to_string(),
			})?;

			let (shutdown_tx, shutdown_rx) = watch::channel(false);
			let shutdown = Arc::new(shutdown_tx);
			let state = CaptureState::new(landscape.clone(), Arc::clone(&slot), Arc::clone(&shutdown));
			let app = router(&self.config.capture_path, state);

			let task = tokio::spawn(serve(
				listener,
				app,
				shutdown_rx,
				Arc::clone(&slot),
				self.registry.clone(),
				landscape.clone(),
				id,
			));

			let handle = ListenerHandle {
				id,
				addr,
				slot: Arc::clone(&slot),
				shutdown,
				task,
				grace: self.config.shutdown_grace(),
			};
			Ok((handle, (id, addr)))
		})?;

		info!(target = "extlogin.capture", %landscape, %addr, "listening for token");

		Ok(PendingCapture {
			landscape: landscape.clone(),
			listener_id,
			addr,
			outcome,
		})
	}

	/// Closes the landscape's listener. Idempotent.
	pub async fn terminate(&self, landscape: &Landscape) -> bool {
		self.registry.terminate(landscape).await
	}
}

fn bind(addr: SocketAddr) -> std::io::Result<TcpListener> {
	let listener = StdTcpListener::bind(addr)?;
	listener.set_nonblocking(true)?;
	TcpListener::from_std(listener)
}

fn validate_capture_path(landscape: &Landscape, path: &str) -> Result<()> {
	if path.starts_with('/') && !path.contains(['{', '}', ':', '*']) {
		return Ok(());
	}
	Err(Error::Listen {
		landscape: landscape.clone(),
		reason: format!("invalid capture path '{path}'"),
	})
}

/// Accept loop owning every connection task, so aborting it drops them all.
async fn serve(
	listener: TcpListener,
	app: axum::Router,
	mut shutdown: watch::Receiver<bool>,
	slot: Arc<SettleSlot>,
	registry: ListenerRegistry,
	landscape: Landscape,
	id: ListenerId,
) {
	let graceful = GracefulShutdown::new();
	let mut connections = JoinSet::new();

	loop {
		tokio::select! {
			_ = shutdown.wait_for(|closed| *closed) => break,
			accepted = listener.accept() => match accepted {
				Ok((stream, peer)) => {
					debug!(target = "extlogin.capture", %landscape, %peer, "connection accepted");
					let service = TowerToHyperService::new(app.clone());
					let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
					let conn = graceful.watch(conn);
					connections.spawn(async move {
						if let Err(e) = conn.await {
							debug!(target = "extlogin.capture", %peer, error = %e, "connection error");
						}
					});
				}
				Err(e) => {
					error!(target = "extlogin.capture", %landscape, error = %e, "listener failed");
					slot.settle(Err(Error::Listen {
						landscape: landscape.clone(),
						reason: e.to_string(),
					}));
					break;
				}
			},
			Some(_) = connections.join_next(), if !connections.is_empty() => {}
		}
	}

	drop(listener);
	// In-flight requests finish unless the registry aborts this task first.
	graceful.shutdown().await;
	connections.shutdown().await;

	registry.forget_listener(&landscape, id);
	debug!(target = "extlogin.capture", %landscape, settled = slot.is_settled(), "listener stopped");
}
