//! extlogin - browser-redirect login against a remote landscape
//!
//! The user's browser is sent to the landscape's external login page, which
//! posts the issued token back to a short-lived listener on this machine.
//!
//! - **Token clock**: decoding a token's `exp` claim and expiry arithmetic
//! - **Capture server**: one listener per landscape, exactly-once capture
//! - **Timeout race**: capture versus deadline (and optional cancellation)
//! - **Login orchestrator**: listener, browser, race, guaranteed teardown
//! - **Session gate**: validity of sessions established earlier
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐
//! │   Authenticator   │  reuse session, else log in
//! └───┬───────────┬───┘
//!     │           │
//! ┌───▼────┐ ┌────▼──────────────┐
//! │ Session│ │ LoginOrchestrator │──▶ BrowserLauncher
//! │  Gate  │ └────┬──────────────┘
//! └───┬────┘      │ race_with_timeout
//!     │      ┌────▼──────────────┐
//!     │      │   CaptureServer   │──▶ ListenerRegistry
//!     │      └───────────────────┘
//! ┌───▼────────┐
//! │ TokenClock │
//! └────────────┘
//! ```

pub mod authenticator;
pub mod capture;
pub mod config;
pub mod error;
pub mod landscape;
pub mod orchestrator;
pub mod race;
pub mod registry;
pub mod session;
pub mod token;

pub use authenticator::Authenticator;
pub use capture::{CaptureServer, PendingCapture};
pub use config::LoginConfig;
pub use error::{Error, Result};
pub use landscape::Landscape;
pub use orchestrator::{BrowserLauncher, LoginOrchestrator};
pub use race::{race_with_cancel, race_with_timeout};
pub use registry::{ListenerId, ListenerRegistry};
pub use session::{MemorySessionStore, SessionGate, SessionStore};
pub use token::{DecodeError, Token, TokenClock, expiry_of};
