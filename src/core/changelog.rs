//! Changelog generation: a pass-through to `github_changelog_generator`.
//!
//! The external generator owns all changelog content; this module only
//! validates the release version, checks the generator's requirements,
//! and parameterizes the invocation.

use std::path::Path;

use semver::Version;
use serde::Serialize;

use crate::env;
use crate::error::{Error, Result};
use crate::utils::command::{CancelToken, Runner};

/// External generator binary.
pub const CHANGELOG_TOOL: &str = "github_changelog_generator";

/// API token the generator requires.
pub const TOKEN_VAR: &str = "CHANGELOG_GITHUB_TOKEN";

/// Issue labels excluded from every generated changelog.
const EXCLUDED_LABELS: &str = "duplicate,question,invalid,wontfix";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOutput {
    pub release: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseNotes {
    pub release: String,
    pub content: String,
}

/// Regenerate CHANGELOG.md with a section for the upcoming release.
pub fn generate(
    runner: &dyn Runner,
    ctx: &CancelToken,
    dir: &Path,
    release: &str,
) -> Result<GenerateOutput> {
    let release = validate_release(release)?;

    env::ensure_commands_available(&[CHANGELOG_TOOL])?;
    env::ensure_env_vars_set(&[TOKEN_VAR])?;

    let output = runner.run(
        ctx,
        dir,
        CHANGELOG_TOOL,
        &[
            "--exclude-labels",
            EXCLUDED_LABELS,
            "--future-release",
            release.as_str(),
        ],
        None,
    )?;

    Ok(GenerateOutput { release, output })
}

/// Release-notes extraction for a single version.
///
/// TODO: extract the release's section from the generated CHANGELOG.md;
/// until then callers get empty content.
pub fn release_notes(release: &str) -> Result<ReleaseNotes> {
    let release = validate_release(release)?;

    Ok(ReleaseNotes {
        release,
        content: String::new(),
    })
}

fn validate_release(release: &str) -> Result<String> {
    let normalized = release.trim_start_matches('v');
    Version::parse(normalized).map_err(|e| {
        Error::validation_invalid_argument(
            "release",
            format!("'{}' is not a semantic version: {}", release, e),
            Some(vec![release.to_string()]),
        )
    })?;
    Ok(normalized.to_string())
}
