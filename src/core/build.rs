//! Build orchestration: version metadata assembly and single- or
//! multi-target compiler invocation.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::git;
use crate::utils::command::{CancelToken, Runner};

/// Name stamped into produced binaries as the build tool.
pub const BUILD_TOOL: &str = "shipmate";

/// Version declaration file, read from the project directory. Only the
/// last non-blank line is significant.
pub const VERSION_FILE: &str = "VERSION";

/// Default package (relative to the project dir) holding the variables
/// the linker stamps.
pub const DEFAULT_VERSION_PKG: &str = "./version";

/// An (operating system, architecture) pair for cross-compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Target {
    pub os: &'static str,
    pub arch: &'static str,
}

impl Target {
    /// Artifact suffix, e.g. `linux-amd64`.
    pub fn suffix(&self) -> String {
        format!("{}-{}", self.os, self.arch)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// Release platform matrix, built in this order.
pub const TARGETS: [Target; 6] = [
    Target { os: "linux", arch: "386" },
    Target { os: "linux", arch: "amd64" },
    Target { os: "darwin", arch: "386" },
    Target { os: "darwin", arch: "amd64" },
    Target { os: "windows", arch: "386" },
    Target { os: "windows", arch: "amd64" },
];

/// Immutable snapshot of the metadata stamped into produced binaries.
///
/// [`Builder::prepare`] fails the whole build when any field cannot be
/// resolved; a partially-populated snapshot never reaches the linker.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub version: String,
    pub revision: String,
    pub branch: String,
    pub go_version: String,
    pub build_tool: String,
    pub build_time: String,
}

impl BuildInfo {
    /// Linker flag string stamping this snapshot into `pkg`'s variables,
    /// in fixed field order.
    pub fn ldflags(&self, pkg: &str) -> String {
        [
            format!("-X {}.Version={}", pkg, self.version),
            format!("-X {}.Revision={}", pkg, self.revision),
            format!("-X {}.Branch={}", pkg, self.branch),
            format!("-X {}.GoVersion={}", pkg, self.go_version),
            format!("-X {}.BuildTool={}", pkg, self.build_tool),
            format!("-X {}.BuildTime={}", pkg, self.build_time),
        ]
        .join(" ")
    }
}

/// A produced binary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub output: String,
}

/// Build report returned to the CLI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    #[serde(flatten)]
    pub info: BuildInfo,
    pub ldflags: String,
    pub artifacts: Vec<Artifact>,
}

/// Orchestrates metadata preparation and compiler invocation for one
/// project directory.
pub struct Builder<'a> {
    runner: &'a dyn Runner,
    ctx: &'a CancelToken,
    project_dir: PathBuf,
    entrypoint: String,
    version_pkg: String,
}

impl<'a> Builder<'a> {
    pub fn new(
        runner: &'a dyn Runner,
        ctx: &'a CancelToken,
        project_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            ctx,
            project_dir: project_dir.into(),
            entrypoint: "main.go".to_string(),
            version_pkg: DEFAULT_VERSION_PKG.to_string(),
        }
    }

    /// Entry-point source path passed to the compiler.
    pub fn entrypoint(mut self, entrypoint: impl Into<String>) -> Self {
        self.entrypoint = entrypoint.into();
        self
    }

    /// Package whose variables receive the stamped metadata.
    pub fn version_pkg(mut self, pkg: impl Into<String>) -> Self {
        self.version_pkg = pkg.into();
        self
    }

    /// Assemble the metadata snapshot: the version file's last non-blank
    /// line, the checkout's revision and branch, the toolchain's
    /// self-reported version, and a nanosecond UTC timestamp.
    pub fn prepare(&self) -> Result<BuildInfo> {
        let version = read_version_file(&self.project_dir.join(VERSION_FILE))?;
        let revision = git::short_revision(self.runner, self.ctx, &self.project_dir)?;
        let branch = git::current_branch(self.runner, self.ctx, &self.project_dir)?;
        let go_version =
            self.runner
                .run(self.ctx, &self.project_dir, "go", &["env", "GOVERSION"], None)?;
        let build_time = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);

        let info = BuildInfo {
            version,
            revision,
            branch,
            go_version,
            build_tool: BUILD_TOOL.to_string(),
            build_time,
        };
        require_complete(&info)?;
        Ok(info)
    }

    /// Import path of the package holding the stamped variables.
    pub fn metadata_package(&self) -> Result<String> {
        self.runner.run(
            self.ctx,
            &self.project_dir,
            "go",
            &["list", self.version_pkg.as_str()],
            None,
        )
    }

    /// Compile once for the host platform.
    pub fn build(&self, info: &BuildInfo, output: &Path) -> Result<BuildReport> {
        let pkg = self.metadata_package()?;
        let flags = info.ldflags(&pkg);

        self.invoke_compiler(&flags, output, None)?;

        Ok(BuildReport {
            info: info.clone(),
            ldflags: flags,
            artifacts: vec![Artifact {
                target: None,
                output: output.display().to_string(),
            }],
        })
    }

    /// Compile the full release matrix, suffixing each artifact with its
    /// platform identifier.
    ///
    /// Targeting travels as per-spawn environment overrides, so there is
    /// no ambient state to set or clear on any exit path. The first
    /// failing target aborts the loop; artifacts already produced stay on
    /// disk.
    pub fn build_all(&self, info: &BuildInfo, output_prefix: &Path) -> Result<BuildReport> {
        let pkg = self.metadata_package()?;
        let flags = info.ldflags(&pkg);

        let mut artifacts = Vec::with_capacity(TARGETS.len());
        for target in &TARGETS {
            let output = suffixed_output(output_prefix, target);
            self.invoke_compiler(&flags, &output, Some(target))?;
            artifacts.push(Artifact {
                target: Some(target.to_string()),
                output: output.display().to_string(),
            });
        }

        Ok(BuildReport {
            info: info.clone(),
            ldflags: flags,
            artifacts,
        })
    }

    fn invoke_compiler(&self, flags: &str, output: &Path, target: Option<&Target>) -> Result<()> {
        let out = output.display().to_string();
        let args = [
            "build",
            "-ldflags",
            flags,
            "-o",
            out.as_str(),
            self.entrypoint.as_str(),
        ];
        let env = target.map(|t| [("GOOS", t.os), ("GOARCH", t.arch)]);

        self.runner.run(
            self.ctx,
            &self.project_dir,
            "go",
            &args,
            env.as_ref().map(|pairs| pairs.as_slice()),
        )?;
        Ok(())
    }
}

/// Append `-<os>-<arch>` to the common output prefix.
fn suffixed_output(prefix: &Path, target: &Target) -> PathBuf {
    let mut path = OsString::from(prefix.as_os_str());
    path.push(format!("-{}", target.suffix()));
    PathBuf::from(path)
}

/// Last non-blank line of the version declaration file.
fn read_version_file(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;

    content
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::validation_invalid_argument(
                "versionFile",
                format!("{} contains no version line", path.display()),
                None,
            )
        })
}

fn require_complete(info: &BuildInfo) -> Result<()> {
    let missing: Vec<&str> = [
        ("version", &info.version),
        ("revision", &info.revision),
        ("branch", &info.branch),
        ("goVersion", &info.go_version),
        ("buildTool", &info.build_tool),
        ("buildTime", &info.build_time),
    ]
    .iter()
    .filter(|(_, value)| value.is_empty())
    .map(|(field, _)| *field)
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::validation_invalid_argument(
            "buildInfo",
            format!("unresolved metadata fields: {}", missing.join(", ")),
            None,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CommandFailedDetails, Error, ErrorCode};
    use crate::utils::command::testing::ScriptedRunner;

    const PKG: &str = "example.com/app/version";

    fn sample_info() -> BuildInfo {
        BuildInfo {
            version: "1.2.3".to_string(),
            revision: "abc1234".to_string(),
            branch: "main".to_string(),
            go_version: "go1.22.1".to_string(),
            build_tool: BUILD_TOOL.to_string(),
            build_time: "2026-08-07T10:30:00.123456789Z".to_string(),
        }
    }

    #[test]
    fn ldflags_lists_all_assignments_in_fixed_order() {
        let flags = sample_info().ldflags(PKG);
        assert_eq!(
            flags,
            "-X example.com/app/version.Version=1.2.3 \
             -X example.com/app/version.Revision=abc1234 \
             -X example.com/app/version.Branch=main \
             -X example.com/app/version.GoVersion=go1.22.1 \
             -X example.com/app/version.BuildTool=shipmate \
             -X example.com/app/version.BuildTime=2026-08-07T10:30:00.123456789Z"
        );
    }

    #[test]
    fn targets_enumerate_in_release_order() {
        let rendered: Vec<String> = TARGETS.iter().map(Target::to_string).collect();
        assert_eq!(
            rendered,
            [
                "linux/386",
                "linux/amd64",
                "darwin/386",
                "darwin/amd64",
                "windows/386",
                "windows/amd64",
            ]
        );
    }

    #[test]
    fn suffixed_output_appends_platform_identifier() {
        let out = suffixed_output(Path::new("dist/app"), &TARGETS[1]);
        assert_eq!(out, PathBuf::from("dist/app-linux-amd64"));
    }

    #[test]
    fn read_version_file_takes_last_non_blank_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(VERSION_FILE);
        fs::write(&path, "release notes pointer\n1.2.3\n\n\n").unwrap();

        assert_eq!(read_version_file(&path).unwrap(), "1.2.3");
    }

    #[test]
    fn read_version_file_fails_on_missing_or_blank_file() {
        let dir = tempfile::tempdir().unwrap();

        let missing = read_version_file(&dir.path().join(VERSION_FILE)).unwrap_err();
        assert_eq!(missing.code, ErrorCode::InternalIoError);

        let blank_path = dir.path().join(VERSION_FILE);
        fs::write(&blank_path, "\n\n").unwrap();
        let blank = read_version_file(&blank_path).unwrap_err();
        assert_eq!(blank.code, ErrorCode::ValidationInvalidArgument);
    }

    #[test]
    fn prepare_composes_metadata_from_file_and_queries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(VERSION_FILE), "2.0.0\n").unwrap();

        let runner = ScriptedRunner::new(|inv| {
            Ok(match (inv.program.as_str(), inv.args.first().map(String::as_str)) {
                ("git", Some("rev-parse")) if inv.args.contains(&"--short".to_string()) => {
                    "f00dfee"
                }
                ("git", Some("rev-parse")) => "release/2.0",
                ("go", Some("env")) => "go1.22.1",
                _ => "",
            }
            .to_string())
        });
        let ctx = CancelToken::new();

        let info = Builder::new(&runner, &ctx, dir.path()).prepare().unwrap();

        assert_eq!(info.version, "2.0.0");
        assert_eq!(info.revision, "f00dfee");
        assert_eq!(info.branch, "release/2.0");
        assert_eq!(info.go_version, "go1.22.1");
        assert_eq!(info.build_tool, BUILD_TOOL);
        assert!(info.build_time.ends_with('Z'));
    }

    #[test]
    fn prepare_fails_when_a_query_comes_back_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(VERSION_FILE), "2.0.0\n").unwrap();

        // Toolchain query resolves to an empty string: the snapshot must
        // never reach the flag-assembly stage half-filled.
        let runner = ScriptedRunner::new(|inv| {
            Ok(if inv.program == "git" { "x" } else { "" }.to_string())
        });
        let ctx = CancelToken::new();

        let err = Builder::new(&runner, &ctx, dir.path()).prepare().unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationInvalidArgument);
        assert!(err.message.contains("goVersion"));
    }

    #[test]
    fn build_invokes_compiler_with_flags_output_and_entrypoint() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new(|inv| {
            Ok(match inv.args.first().map(String::as_str) {
                Some("list") => PKG.to_string(),
                _ => String::new(),
            })
        });
        let ctx = CancelToken::new();
        let builder = Builder::new(&runner, &ctx, dir.path()).entrypoint("cmd/app/main.go");

        let info = sample_info();
        let report = builder.build(&info, Path::new("dist/app")).unwrap();

        assert_eq!(report.artifacts.len(), 1);
        assert_eq!(report.artifacts[0].output, "dist/app");

        let calls = runner.calls.borrow();
        let build_call = calls.iter().find(|c| c.args.first().map(String::as_str) == Some("build")).unwrap();
        let expected: Vec<String> = vec![
            "build".to_string(),
            "-ldflags".to_string(),
            info.ldflags(PKG),
            "-o".to_string(),
            "dist/app".to_string(),
            "cmd/app/main.go".to_string(),
        ];
        assert_eq!(build_call.args, expected);
        assert!(build_call.env.is_empty());
    }

    #[test]
    fn build_all_stops_at_the_first_failing_target() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("app");

        // The compiler "succeeds" by creating the requested output file,
        // except for darwin/386 (the third target).
        let runner = ScriptedRunner::new(|inv| match inv.args.first().map(String::as_str) {
            Some("list") => Ok(PKG.to_string()),
            Some("build") => {
                let os = inv.env_value("GOOS").unwrap_or_default();
                let arch = inv.env_value("GOARCH").unwrap_or_default();
                if os == "darwin" && arch == "386" {
                    return Err(Error::command_failed(
                        "exit status: 1",
                        CommandFailedDetails {
                            command: "go build".to_string(),
                            exit_code: 1,
                            stdout: String::new(),
                            stderr: "unsupported platform darwin/386".to_string(),
                        },
                    ));
                }
                let out_index = inv.args.iter().position(|a| a == "-o").unwrap() + 1;
                fs::write(&inv.args[out_index], b"").unwrap();
                Ok(String::new())
            }
            _ => Ok(String::new()),
        });
        let ctx = CancelToken::new();
        let builder = Builder::new(&runner, &ctx, dir.path());

        let err = builder.build_all(&sample_info(), &prefix).unwrap_err();

        assert_eq!(err.code, ErrorCode::CommandFailed);
        assert!(err.message.contains("darwin/386"));

        // Two artifacts on disk, the third attempt failed, nothing after.
        assert!(dir.path().join("app-linux-386").exists());
        assert!(dir.path().join("app-linux-amd64").exists());
        assert!(!dir.path().join("app-darwin-amd64").exists());
        assert_eq!(runner.count_of("build"), 3);
    }

    #[test]
    fn build_all_reports_every_target_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("app");

        let runner = ScriptedRunner::new(|inv| match inv.args.first().map(String::as_str) {
            Some("list") => Ok(PKG.to_string()),
            Some("build") => {
                let out_index = inv.args.iter().position(|a| a == "-o").unwrap() + 1;
                fs::write(&inv.args[out_index], b"").unwrap();
                Ok(String::new())
            }
            _ => Ok(String::new()),
        });
        let ctx = CancelToken::new();

        let report = Builder::new(&runner, &ctx, dir.path())
            .build_all(&sample_info(), &prefix)
            .unwrap();

        assert_eq!(report.artifacts.len(), TARGETS.len());
        for (artifact, target) in report.artifacts.iter().zip(TARGETS.iter()) {
            assert_eq!(artifact.target.as_deref(), Some(target.to_string().as_str()));
            assert!(Path::new(&artifact.output).exists());
        }
    }
}
