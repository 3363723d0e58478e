//! Version-control queries used while assembling build metadata.

use std::path::Path;

use crate::error::{Error, ErrorCode, Result};
use crate::utils::command::{CancelToken, Runner};

/// Short revision hash of the current checkout.
pub fn short_revision(runner: &dyn Runner, ctx: &CancelToken, dir: &Path) -> Result<String> {
    query(runner, ctx, dir, &["rev-parse", "--short", "HEAD"])
}

/// Name of the currently checked-out branch.
pub fn current_branch(runner: &dyn Runner, ctx: &CancelToken, dir: &Path) -> Result<String> {
    query(runner, ctx, dir, &["rev-parse", "--abbrev-ref", "HEAD"])
}

fn query(runner: &dyn Runner, ctx: &CancelToken, dir: &Path, args: &[&str]) -> Result<String> {
    runner.run(ctx, dir, "git", args, None).map_err(|e| {
        if e.code == ErrorCode::CommandCancelled {
            e
        } else {
            Error::git_command_failed(e.to_string())
        }
    })
}
