use async_trait::async_trait;
use extlogin::BrowserLauncher;
use tracing::warn;

/// Opens URLs with the platform's default handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

#[async_trait]
impl BrowserLauncher for SystemBrowser {
	async fn open(&self, url: &str) -> bool {
		eprintln!("Opening {url} in your browser...");

		let target = url.to_string();
		match tokio::task::spawn_blocking(move || open::that(target)).await {
			Ok(Ok(())) => true,
			Ok(Err(e)) => {
				warn!(target = "extlogin", %url, error = %e, "no browser handler");
				false
			}
			Err(e) => {
				warn!(target = "extlogin", %url, error = %e, "browser launch task failed");
				false
			}
		}
	}
}
