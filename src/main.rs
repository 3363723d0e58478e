use clap::Parser;

use shipmate::utils::command::CancelToken;

mod commands;
mod output;
mod tty;

use commands::GlobalArgs;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "shipmate")]
#[command(version = VERSION)]
#[command(about = "CLI for build, test-coverage, and release workflow automation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Build the project binary for the host platform or the release matrix
    Build(commands::build::BuildArgs),
    /// Run per-package test coverage and render an HTML report
    Coverage(commands::coverage::CoverageArgs),
    /// Changelog operations
    Changelog(commands::changelog::ChangelogArgs),
    /// Show the metadata a build would stamp, without building
    Info(commands::info::InfoArgs),
    /// Check required external commands and environment variables
    Doctor(commands::doctor::DoctorArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    // One token for the whole invocation; every process spawn observes it.
    let global = GlobalArgs {
        cancel: CancelToken::new(),
    };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    let _ = output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
