use std::path::PathBuf;

use clap::Args;
use shipmate::build::{BuildInfo, Builder};
use shipmate::env;
use shipmate::utils::command::ProcessRunner;

use crate::commands::CmdResult;

#[derive(Args)]
pub struct InfoArgs {
    /// Project directory (defaults to the current directory)
    pub dir: Option<String>,
}

pub fn run(args: InfoArgs, global: &crate::commands::GlobalArgs) -> CmdResult<BuildInfo> {
    env::ensure_commands_available(&["go", "git"])?;

    let dir = PathBuf::from(args.dir.as_deref().unwrap_or("."));
    let runner = ProcessRunner;
    let info = Builder::new(&runner, &global.cancel, dir).prepare()?;

    Ok((info, 0))
}
