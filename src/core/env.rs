//! Preflight checks and scoped mutation of the process environment.
//!
//! The environment table is process-global state; [`set_env_vars`] and
//! [`EnvSnapshot::restore`] assume single-threaded use.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Verify every named command resolves to an executable on the search
/// path. Fails fast on the first missing command, naming it.
pub fn ensure_commands_available(names: &[&str]) -> Result<()> {
    for name in names {
        if find_executable(name).is_none() {
            return Err(Error::env_command_not_found(*name));
        }
    }
    Ok(())
}

/// Verify every named environment variable is set to a non-empty value.
/// Fails fast on the first missing or empty variable, naming it.
pub fn ensure_env_vars_set(names: &[&str]) -> Result<()> {
    for name in names {
        match env::var(name) {
            Ok(value) if !value.is_empty() => {}
            _ => return Err(Error::env_var_not_set(*name)),
        }
    }
    Ok(())
}

/// Resolve a command name against `PATH`. Names containing a path
/// separator are checked as-is.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Prior values captured by [`set_env_vars`]. Consumed by [`restore`];
/// a snapshot cannot be replayed twice.
///
/// [`restore`]: EnvSnapshot::restore
#[derive(Debug)]
pub struct EnvSnapshot {
    saved: Vec<(String, String)>,
}

impl EnvSnapshot {
    /// Replay the captured values onto the same variables, in the same
    /// order they were supplied. Best-effort: values changed externally
    /// since capture are overwritten without complaint.
    pub fn restore(self) {
        for (name, value) in self.saved {
            env::set_var(name, value);
        }
    }
}

/// Set an alternating key/value sequence of environment variables.
///
/// An odd-length sequence fails before anything is written. For each pair
/// in order, the variable's current value is recorded (absent treated as
/// empty string) and the new value applied. The returned snapshot
/// restores the recorded values.
pub fn set_env_vars(pairs: &[&str]) -> Result<EnvSnapshot> {
    if pairs.len() % 2 != 0 {
        return Err(Error::env_pair_mismatch(pairs.len()));
    }

    let mut saved = Vec::with_capacity(pairs.len() / 2);
    for chunk in pairs.chunks_exact(2) {
        let (name, value) = (chunk[0], chunk[1]);
        saved.push((name.to_string(), env::var(name).unwrap_or_default()));
        env::set_var(name, value);
    }

    Ok(EnvSnapshot { saved })
}
