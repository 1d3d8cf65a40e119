use std::io::Read;

use extlogin::{Token, TokenClock, expiry_of};

use crate::cli::ExpiryArgs;
use crate::error::{CliError, Result};
use crate::output::ExpiryData;

const STDIN_MARKER: &str = "@-";

pub fn run(args: ExpiryArgs) -> Result<ExpiryData> {
	let raw = if args.token == STDIN_MARKER {
		let mut buf = String::new();
		std::io::stdin().read_to_string(&mut buf)?;
		buf
	} else {
		args.token
	};
	expiry(&Token::new(raw.trim()), &TokenClock::system())
}

fn expiry(token: &Token, clock: &TokenClock) -> Result<ExpiryData> {
	if token.as_str().is_empty() {
		return Err(CliError::InvalidInput("no token given".into()));
	}
	let expires_at_ms = expiry_of(token).map_err(extlogin::Error::from)?;
	let expires_in_ms = expires_at_ms - clock.now_ms();

	Ok(ExpiryData {
		expires_at_ms,
		expires_in_ms,
		expired: expires_in_ms <= 0,
	})
}
