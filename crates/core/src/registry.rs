//! Registry of live capture listeners, keyed by landscape.
//!
//! The presence of an entry is the mutual-exclusion signal: while a landscape
//! has a listener here, no second login for it can start. Entries are removed
//! as soon as their listener is closed, on every path.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::capture::SettleSlot;
use crate::error::{Error, Result};
use crate::landscape::Landscape;

/// Process-unique generation id of one listener.
pub type ListenerId = u64;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

fn next_listener_id() -> ListenerId {
	NEXT_LISTENER_ID.fetch_add(1, Ordering::SeqCst)
}

/// Owning handle to a running capture listener.
pub(crate) struct ListenerHandle {
	pub(crate) id: ListenerId,
	pub(crate) addr: SocketAddr,
	pub(crate) slot: Arc<SettleSlot>,
	pub(crate) shutdown: Arc<watch::Sender<bool>>,
	pub(crate) task: JoinHandle<()>,
	pub(crate) grace: Duration,
}

impl ListenerHandle {
	/// Closes the capture slot, signals graceful shutdown, then aborts the
	/// serve task if it has not finished within the grace period. Aborting
	/// drops every open connection.
	async fn close(mut self) {
		self.slot.close();
		self.shutdown.send_replace(true);
		if tokio::time::timeout(self.grace, &mut self.task).await.is_err() {
			debug!(target = "extlogin.capture", addr = %self.addr, "grace period elapsed, aborting listener");
			self.task.abort();
			// Wait for the abort to drop the socket so the port is free again.
			let _ = (&mut self.task).await;
		}
	}

	/// Closes without waiting, for use outside async context.
	fn close_detached(self) {
		self.slot.close();
		self.shutdown.send_replace(true);
		match tokio::runtime::Handle::try_current() {
			Ok(runtime) => {
				runtime.spawn(self.close());
			}
			Err(_) => self.task.abort(),
		}
	}
}

/// Live listeners by landscape. Cloning shares the same registry.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
	inner: Arc<Mutex<HashMap<Landscape, ListenerHandle>>>,
}

impl std::fmt::Debug for ListenerRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let map = self.inner.lock();
		f.debug_set().entries(map.keys()).finish()
	}
}

impl ListenerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn contains(&self, landscape: &Landscape) -> bool {
		self.inner.lock().contains_key(landscape)
	}

	pub fn len(&self) -> usize {
		self.inner.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.lock().is_empty()
	}

	/// Address the landscape's listener is bound to, if one is live.
	pub fn local_addr(&self, landscape: &Landscape) -> Option<SocketAddr> {
		self.inner.lock().get(landscape).map(|handle| handle.addr)
	}

	/// Starts a listener for `landscape` unless one is already registered.
	///
	/// The presence check, `start`, and the insert run under one lock, so
	/// `start` must not block on anything but a synchronous bind.
	pub(crate) fn insert_with<T>(
		&self,
		landscape: &Landscape,
		start: impl FnOnce(ListenerId) -> Result<(ListenerHandle, T)>,
	) -> Result<T> {
		let mut map = self.inner.lock();
		if map.contains_key(landscape) {
			return Err(Error::AlreadyListening {
				landscape: landscape.clone(),
			});
		}
		let (handle, out) = start(next_listener_id())?;
		map.insert(landscape.clone(), handle);
		Ok(out)
	}

	/// Closes the landscape's listener, whichever generation it is.
	///
	/// Idempotent: returns `false` if no listener was registered.
	pub async fn terminate(&self, landscape: &Landscape) -> bool {
		let handle = self.inner.lock().remove(landscape);
		self.close(landscape, handle).await
	}

	/// Closes the listener only if it is still generation `id`.
	pub(crate) async fn terminate_listener(&self, landscape: &Landscape, id: ListenerId) -> bool {
		let handle = self.take_if(landscape, id);
		self.close(landscape, handle).await
	}

	/// Synchronous variant of [`terminate_listener`](Self::terminate_listener)
	/// that finishes closing in the background.
	pub(crate) fn detach_listener(&self, landscape: &Landscape, id: ListenerId) -> bool {
		match self.take_if(landscape, id) {
			Some(handle) => {
				info!(target = "extlogin.capture", %landscape, "closing listener");
				handle.close_detached();
				true
			}
			None => false,
		}
	}

	/// Drops the entry of a listener whose serve loop already exited.
	pub(crate) fn forget_listener(&self, landscape: &Landscape, id: ListenerId) {
		if self.take_if(landscape, id).is_some() {
			debug!(target = "extlogin.capture", %landscape, "listener exited, entry removed");
		}
	}

	/// Closes every registered listener.
	pub async fn terminate_all(&self) {
		let handles: Vec<_> = self.inner.lock().drain().collect();
		for (landscape, handle) in handles {
			self.close(&landscape, Some(handle)).await;
		}
	}

	fn take_if(&self, landscape: &Landscape, id: ListenerId) -> Option<ListenerHandle> {
		let mut map = self.inner.lock();
		match map.get(landscape) {
			Some(handle) if handle.id == id => map.remove(landscape),
			_ => None,
		}
	}

	async fn close(&self, landscape: &Landscape, handle: Option<ListenerHandle>) -> bool {
		match handle {
			Some(handle) => {
				info!(target = "extlogin.capture", %landscape, addr = %handle.addr, "closing listener");
				handle.close().await;
				true
			}
			None => {
				debug!(target = "extlogin.capture", %landscape, "no listener to close");
				false
			}
		}
	}
}
