use clap::Args;
use serde::Serialize;
use shipmate::changelog::{CHANGELOG_TOOL, TOKEN_VAR};
use shipmate::env;

use crate::commands::CmdResult;

#[derive(Args)]
pub struct DoctorArgs {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckKind {
    Command,
    EnvVar,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorCheck {
    pub name: String,
    pub kind: CheckKind,
    pub ok: bool,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorReport {
    pub ok: bool,
    pub checks: Vec<DoctorCheck>,
}

/// Report availability of the external tools and environment variables
/// the workflows shell out to. The changelog generator and its token are
/// optional: only the commands that need them fail without them.
pub fn run(_args: DoctorArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<DoctorReport> {
    let mut checks = Vec::new();

    for (name, required) in [("go", true), ("git", true), (CHANGELOG_TOOL, false)] {
        checks.push(DoctorCheck {
            name: name.to_string(),
            kind: CheckKind::Command,
            ok: env::ensure_commands_available(&[name]).is_ok(),
            required,
        });
    }

    checks.push(DoctorCheck {
        name: TOKEN_VAR.to_string(),
        kind: CheckKind::EnvVar,
        ok: env::ensure_env_vars_set(&[TOKEN_VAR]).is_ok(),
        required: false,
    });

    let ok = checks.iter().all(|check| check.ok || !check.required);
    let exit_code = i32::from(!ok);

    Ok((DoctorReport { ok, checks }, exit_code))
}
