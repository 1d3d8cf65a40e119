use extlogin::Landscape;

use crate::cli::LandscapeArgs;
use crate::error::Result;
use crate::output::LogoutData;
use crate::state::{SessionFile, StatePaths};

pub fn run(args: LandscapeArgs, paths: &StatePaths) -> Result<LogoutData> {
	let landscape = Landscape::new(args.landscape);
	let removed = SessionFile::new(&paths.sessions).forget(&landscape)?;
	Ok(LogoutData {
		landscape: landscape.to_string(),
		removed,
	})
}
