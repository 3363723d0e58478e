use std::path::PathBuf;

use clap::Args;
use shipmate::coverage::{Coverage, CoverageSummary};
use shipmate::env;
use shipmate::log_status;
use shipmate::utils::command::ProcessRunner;

use crate::commands::CmdResult;

#[derive(Args)]
pub struct CoverageArgs {
    /// Project directory (defaults to the current directory)
    pub dir: Option<String>,
}

pub fn run(args: CoverageArgs, global: &crate::commands::GlobalArgs) -> CmdResult<CoverageSummary> {
    env::ensure_commands_available(&["go"])?;

    let dir = PathBuf::from(args.dir.as_deref().unwrap_or("."));
    let runner = ProcessRunner;

    let summary = Coverage::new(&runner, &global.cancel, dir).run()?;
    log_status!(
        "coverage",
        "Merged {} package profiles into {}",
        summary.packages,
        summary.report
    );

    Ok((summary, 0))
}
