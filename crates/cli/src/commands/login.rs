use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use extlogin::{
	Authenticator, BrowserLauncher, Landscape, ListenerRegistry, LoginConfig, LoginOrchestrator, SessionGate,
};

use crate::browser::SystemBrowser;
use crate::cli::LoginArgs;
use crate::error::Result;
use crate::output::LoginData;
use crate::state::{SessionFile, StatePaths};

pub async fn run(args: LoginArgs, config: LoginConfig, paths: &StatePaths) -> Result<LoginData> {
	let sessions = SessionFile::new(&paths.sessions);
	login(args, config, sessions, Arc::new(SystemBrowser), interrupted()).await
}

async fn login<C>(
	args: LoginArgs,
	mut config: LoginConfig,
	sessions: SessionFile,
	browser: Arc<dyn BrowserLauncher>,
	cancel: C,
) -> Result<LoginData>
where
	C: Future<Output = ()>,
{
	if let Some(port) = args.port {
		config = config.with_port(port);
	}
	if let Some(ms) = args.timeout_ms {
		config = config.with_timeout(Duration::from_millis(ms));
	}
	let landscape = Landscape::new(args.landscape);
	// Rejects a malformed landscape before any listener starts.
	landscape.login_url(&config.login_path, config.port)?;
	let browser = Arc::new(RecordingBrowser::new(browser));

	// Unreadable session files count as "no stored session" here, like in the gate.
	let stored = if args.force {
		None
	} else {
		sessions.get(&landscape).ok().flatten()
	};

	let authenticator = Authenticator::new(
		SessionGate::new(sessions.clone()),
		LoginOrchestrator::new(ListenerRegistry::new(), config, browser.clone()),
	);

	let outcome = if args.force {
		authenticator.login_with_cancel(&landscape, cancel).await?
	} else {
		authenticator.authenticate_with_cancel(&landscape, cancel).await?
	};
	let Some(token) = outcome else {
		// The URL carries the port actually bound, not the configured one.
		let url = browser.opened().unwrap_or_default();
		return Err(extlogin::Error::BrowserOpenFailed { landscape, url }.into());
	};

	let reused = stored.as_ref() == Some(&token);
	if !reused {
		sessions.record(&landscape, &token)?;
	}

	Ok(LoginData {
		landscape: landscape.to_string(),
		reused,
		expires_in_ms: authenticator.time_until_expiry(&token).ok(),
		session_file: sessions.path().to_path_buf(),
		token: args.print_token.then(|| token.into_string()),
	})
}

/// Remembers the URL handed to the wrapped launcher.
struct RecordingBrowser {
	inner: Arc<dyn BrowserLauncher>,
	opened: OnceLock<String>,
}

impl RecordingBrowser {
	fn new(inner: Arc<dyn BrowserLauncher>) -> Self {
		Self {
			inner,
			opened: OnceLock::new(),
		}
	}

	fn opened(&self) -> Option<String> {
		self.opened.get().cloned()
	}
}

#[async_trait]
impl BrowserLauncher for RecordingBrowser {
	async fn open(&self, url: &str) -> bool {
		let _ = self.opened.set(url.to_string());
		self.inner.open(url).await
	}
}

/// Completes on Ctrl-C. Never completes where the signal cannot be watched.
async fn interrupted() {
	if tokio::signal::ctrl_c().await.is_err() {
		std::future::pending::<()>().await;
	}
}
