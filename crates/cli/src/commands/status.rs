use extlogin::{Landscape, SessionGate, SessionStore};

use crate::cli::LandscapeArgs;
use crate::error::Result;
use crate::output::StatusData;
use crate::state::{SessionFile, StatePaths};

pub async fn run(args: LandscapeArgs, paths: &StatePaths) -> Result<StatusData> {
	let gate = SessionGate::new(SessionFile::new(&paths.sessions));
	status(Landscape::new(args.landscape), &gate).await
}

async fn status<S: SessionStore>(landscape: Landscape, gate: &SessionGate<S>) -> Result<StatusData> {
	landscape.url()?;

	let token = match gate.token(&landscape).await {
		Ok(token) => Some(token),
		Err(extlogin::Error::NoSession { .. }) => None,
		Err(e) => return Err(e.into()),
	};

	Ok(StatusData {
		landscape: landscape.to_string(),
		logged_in: token.is_some(),
		valid: token.as_ref().is_some_and(|t| gate.clock().is_valid(t)),
		expires_in_ms: token.as_ref().and_then(|t| gate.time_until_expiry(t).ok()),
	})
}
