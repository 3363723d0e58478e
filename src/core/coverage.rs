//! Test-coverage orchestration: per-package profiles merged into one
//! report.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::utils::command::{CancelToken, Runner};

/// Directory wiped and recreated at the start of every coverage run.
pub const COVERAGE_DIR: &str = "coverage";

/// Merged profile file inside [`COVERAGE_DIR`].
pub const PROFILE_FILE: &str = "cover.out";

/// HTML report inside [`COVERAGE_DIR`].
pub const REPORT_FILE: &str = "index.html";

/// Instrumentation mode shared by every package profile. The merged file
/// carries exactly one matching mode header.
pub const COVER_MODE: &str = "count";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageSummary {
    pub packages: usize,
    pub profile: String,
    pub report: String,
}

/// Orchestrates test coverage for one project directory.
pub struct Coverage<'a> {
    runner: &'a dyn Runner,
    ctx: &'a CancelToken,
    project_dir: PathBuf,
}

impl<'a> Coverage<'a> {
    pub fn new(
        runner: &'a dyn Runner,
        ctx: &'a CancelToken,
        project_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            ctx,
            project_dir: project_dir.into(),
        }
    }

    /// Run every package's tests with coverage instrumentation, merge the
    /// profiles under one mode header, and render the HTML report.
    ///
    /// A failing package aborts the run immediately; profiles already
    /// merged are left in place.
    pub fn run(&self) -> Result<CoverageSummary> {
        let packages = self.list_packages()?;

        let coverage_dir = self.project_dir.join(COVERAGE_DIR);
        recreate_dir(&coverage_dir)?;

        let profile_path = coverage_dir.join(PROFILE_FILE);
        let mut merged = File::create(&profile_path).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("create {}", profile_path.display())))
        })?;
        writeln!(merged, "mode: {}", COVER_MODE)
            .map_err(|e| Error::internal_io(e.to_string(), Some("write mode header".to_string())))?;

        for pkg in &packages {
            let profile = self.package_profile(pkg)?;
            for line in profile_data_lines(&profile) {
                writeln!(merged, "{}", line).map_err(|e| {
                    Error::internal_io(e.to_string(), Some(format!("append profile for {}", pkg)))
                })?;
            }
        }
        merged
            .flush()
            .map_err(|e| Error::internal_io(e.to_string(), Some("flush merged profile".to_string())))?;

        self.render_report()?;

        Ok(CoverageSummary {
            packages: packages.len(),
            profile: format!("{}/{}", COVERAGE_DIR, PROFILE_FILE),
            report: format!("{}/{}", COVERAGE_DIR, REPORT_FILE),
        })
    }

    fn list_packages(&self) -> Result<Vec<String>> {
        let stdout = self
            .runner
            .run(self.ctx, &self.project_dir, "go", &["list", "./..."], None)?;

        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Run one package's tests into a fresh scratch profile and return
    /// its contents. The scratch file is removed when it drops, on every
    /// exit path.
    fn package_profile(&self, pkg: &str) -> Result<String> {
        let scratch = NamedTempFile::new().map_err(|e| {
            Error::internal_io(e.to_string(), Some("create coverage scratch file".to_string()))
        })?;

        let mode_flag = format!("-covermode={}", COVER_MODE);
        let profile_flag = format!("-coverprofile={}", scratch.path().display());
        self.runner.run(
            self.ctx,
            &self.project_dir,
            "go",
            &["test", mode_flag.as_str(), profile_flag.as_str(), pkg],
            None,
        )?;

        fs::read_to_string(scratch.path()).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("read coverage profile for {}", pkg)))
        })
    }

    fn render_report(&self) -> Result<()> {
        let html_flag = format!("-html={}/{}", COVERAGE_DIR, PROFILE_FILE);
        let report = format!("{}/{}", COVERAGE_DIR, REPORT_FILE);
        self.runner.run(
            self.ctx,
            &self.project_dir,
            "go",
            &["tool", "cover", html_flag.as_str(), "-o", report.as_str()],
            None,
        )?;
        Ok(())
    }
}

/// Data lines of a single-package profile: everything after the mode
/// header.
fn profile_data_lines(profile: &str) -> impl Iterator<Item = &str> {
    profile.lines().skip(1).filter(|line| !line.trim().is_empty())
}

fn recreate_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("remove {}", dir.display())))
        })?;
    }
    fs::create_dir_all(dir)
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("create {}", dir.display()))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CommandFailedDetails, Error, ErrorCode};
    use crate::utils::command::testing::ScriptedRunner;

    const PACKAGES: &str = "example.com/m/alpha\nexample.com/m/beta\nexample.com/m/gamma";

    fn write_profile(path: &str, pkg_tag: &str, lines: usize) {
        let mut profile = format!("mode: {}\n", COVER_MODE);
        for n in 0..lines {
            profile.push_str(&format!("{}/file.go:{}.1,{}.2 1 1\n", pkg_tag, n + 1, n + 2));
        }
        fs::write(path, profile).unwrap();
    }

    fn scripted(fail_pkg: Option<&'static str>) -> ScriptedRunner {
        ScriptedRunner::new(move |inv| match inv.args.first().map(String::as_str) {
            Some("list") => Ok(PACKAGES.to_string()),
            Some("test") => {
                let pkg = inv.args.last().unwrap().clone();
                if Some(pkg.as_str()) == fail_pkg {
                    return Err(Error::command_failed(
                        "exit status: 1",
                        CommandFailedDetails {
                            command: format!("go test {}", pkg),
                            exit_code: 1,
                            stdout: String::new(),
                            stderr: format!("FAIL {}", pkg),
                        },
                    ));
                }
                let profile = inv.arg_value("-coverprofile=").unwrap();
                write_profile(profile, &pkg, 2);
                Ok(String::new())
            }
            Some("tool") => Ok(String::new()),
            _ => Ok(String::new()),
        })
    }

    #[test]
    fn merged_profile_has_one_header_and_ordered_data_lines() {
        let dir = tempfile::tempdir().unwrap();
        let runner = scripted(None);
        let ctx = CancelToken::new();

        let summary = Coverage::new(&runner, &ctx, dir.path()).run().unwrap();
        assert_eq!(summary.packages, 3);

        let merged = fs::read_to_string(dir.path().join(COVERAGE_DIR).join(PROFILE_FILE)).unwrap();
        let lines: Vec<&str> = merged.lines().collect();

        assert_eq!(lines[0], "mode: count");
        assert_eq!(lines.iter().filter(|l| l.starts_with("mode:")).count(), 1);
        // 3 packages x 2 data lines, in enumeration order.
        assert_eq!(lines.len(), 7);
        assert!(lines[1].starts_with("example.com/m/alpha/"));
        assert!(lines[3].starts_with("example.com/m/beta/"));
        assert!(lines[5].starts_with("example.com/m/gamma/"));
    }

    #[test]
    fn report_generation_runs_after_all_packages() {
        let dir = tempfile::tempdir().unwrap();
        let runner = scripted(None);
        let ctx = CancelToken::new();

        Coverage::new(&runner, &ctx, dir.path()).run().unwrap();

        let calls = runner.calls.borrow();
        let last = calls.last().unwrap();
        assert_eq!(last.dir, dir.path());
        assert_eq!(last.args[0], "tool");
        assert_eq!(last.args[1], "cover");
        assert!(last.args.contains(&"-o".to_string()));
    }

    #[test]
    fn failing_package_aborts_without_rolling_back_merged_data() {
        let dir = tempfile::tempdir().unwrap();
        let runner = scripted(Some("example.com/m/beta"));
        let ctx = CancelToken::new();

        let err = Coverage::new(&runner, &ctx, dir.path()).run().unwrap_err();
        assert_eq!(err.code, ErrorCode::CommandFailed);
        assert!(err.message.contains("example.com/m/beta"));

        // alpha's data survived, gamma never ran, no report was rendered.
        let merged = fs::read_to_string(dir.path().join(COVERAGE_DIR).join(PROFILE_FILE)).unwrap();
        assert!(merged.contains("example.com/m/alpha/"));
        assert!(!merged.contains("example.com/m/gamma/"));
        assert_eq!(runner.count_of("test"), 2);
        assert_eq!(runner.count_of("tool"), 0);
    }

    #[test]
    fn coverage_dir_is_wiped_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join(COVERAGE_DIR);
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("stale.html"), "old").unwrap();

        let runner = scripted(None);
        let ctx = CancelToken::new();
        Coverage::new(&runner, &ctx, dir.path()).run().unwrap();

        assert!(!stale.join("stale.html").exists());
        assert!(stale.join(PROFILE_FILE).exists());
    }

    #[test]
    fn profile_data_lines_skip_the_mode_header() {
        let profile = "mode: count\na.go:1.1,2.2 1 1\n\nb.go:3.3,4.4 2 0\n";
        let lines: Vec<&str> = profile_data_lines(profile).collect();
        assert_eq!(lines, ["a.go:1.1,2.2 1 1", "b.go:3.3,4.4 2 0"]);
    }
}
