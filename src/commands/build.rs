use std::path::{Path, PathBuf};

use clap::Args;
use shipmate::build::{BuildReport, Builder, DEFAULT_VERSION_PKG};
use shipmate::env;
use shipmate::log_status;
use shipmate::utils::command::ProcessRunner;

use crate::commands::CmdResult;

#[derive(Args)]
pub struct BuildArgs {
    /// Project directory (defaults to the current directory)
    pub dir: Option<String>,

    /// Output path (single build) or artifact prefix (--all-targets)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Entry-point source path passed to the compiler
    #[arg(long, default_value = "main.go")]
    pub entrypoint: String,

    /// Package holding the stamped metadata variables
    #[arg(long, default_value = DEFAULT_VERSION_PKG)]
    pub version_pkg: String,

    /// Build every release target instead of the host platform
    #[arg(long)]
    pub all_targets: bool,
}

pub fn run(args: BuildArgs, global: &crate::commands::GlobalArgs) -> CmdResult<BuildReport> {
    env::ensure_commands_available(&["go", "git"])?;

    let dir = PathBuf::from(args.dir.as_deref().unwrap_or("."));
    let output = args
        .output
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| default_output(&dir));

    let runner = ProcessRunner;
    let builder = Builder::new(&runner, &global.cancel, dir)
        .entrypoint(args.entrypoint)
        .version_pkg(args.version_pkg);

    let info = builder.prepare()?;
    log_status!(
        "build",
        "Building {} at {} ({})",
        info.version,
        info.revision,
        info.branch
    );

    let report = if args.all_targets {
        builder.build_all(&info, &output)?
    } else {
        builder.build(&info, &output)?
    };

    Ok((report, 0))
}

/// Default artifact path: the project directory's basename, inside it.
fn default_output(dir: &Path) -> PathBuf {
    let name = dir
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "app".to_string());
    dir.join(name)
}
