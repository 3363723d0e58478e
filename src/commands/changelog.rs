use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde::Serialize;
use shipmate::changelog::{self, GenerateOutput, ReleaseNotes};
use shipmate::utils::command::ProcessRunner;

use crate::commands::CmdResult;

#[derive(Args)]
pub struct ChangelogArgs {
    #[command(subcommand)]
    pub command: ChangelogCommand,
}

#[derive(Subcommand)]
pub enum ChangelogCommand {
    /// Regenerate CHANGELOG.md for an upcoming release
    Generate {
        /// Target release version (e.g. 1.4.0)
        release: String,

        /// Project directory (defaults to the current directory)
        dir: Option<String>,
    },

    /// Show the release-notes section for a version
    Notes {
        /// Release version
        release: String,
    },
}

#[derive(Serialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum ChangelogOutput {
    Generate(GenerateOutput),
    Notes(ReleaseNotes),
}

pub fn run(args: ChangelogArgs, global: &crate::commands::GlobalArgs) -> CmdResult<ChangelogOutput> {
    match args.command {
        ChangelogCommand::Generate { release, dir } => {
            let dir = PathBuf::from(dir.as_deref().unwrap_or("."));
            let runner = ProcessRunner;
            let out = changelog::generate(&runner, &global.cancel, &dir, &release)?;
            Ok((ChangelogOutput::Generate(out), 0))
        }
        ChangelogCommand::Notes { release } => {
            let notes = changelog::release_notes(&release)?;
            Ok((ChangelogOutput::Notes(notes), 0))
        }
    }
}
