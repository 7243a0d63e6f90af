//! External build backend.
//!
//! The backend is opaque: it is handed a source/build directory pair to
//! configure and a build directory plus a job count to compile. Calls are
//! synchronous; on failure the backend's own output is returned verbatim.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::Path;
use std::process::{Command, ExitStatus};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::BackendConfig;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` failed ({status})\n{output}")]
    Failed {
        command: String,
        status: ExitStatus,
        output: String,
    },
}

impl BackendError {
    /// Captured backend output, for failures that produced any.
    pub fn output(&self) -> Option<&str> {
        match self {
            BackendError::Failed { output, .. } => Some(output),
            BackendError::Spawn { .. } => None,
        }
    }
}

pub trait BuildBackend {
    fn configure(&self, source_dir: &Path, build_dir: &Path) -> Result<(), BackendError>;
    fn compile(&self, build_dir: &Path, jobs: usize) -> Result<(), BackendError>;
    /// Runs the project's test suite; returns the test runner's report.
    fn test(&self, build_dir: &Path) -> Result<String, BackendError>;
    /// Whether `build_dir` has already been configured.
    fn is_configured(&self, build_dir: &Path) -> bool;
}

/// CMake generating Makefiles, driven by `make` and `ctest`.
#[derive(Debug, Clone)]
pub struct CMakeBackend {
    cmake: String,
    make: String,
    ctest: String,
}

impl CMakeBackend {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            cmake: config.cmake.clone(),
            make: config.make.clone(),
            ctest: config.ctest.clone(),
        }
    }
}

impl BuildBackend for CMakeBackend {
    fn configure(&self, source_dir: &Path, build_dir: &Path) -> Result<(), BackendError> {
        let source = source_dir.to_string_lossy();
        run(&self.cmake, &[source.as_ref()], build_dir, "Configuring").map(drop)
    }

    fn compile(&self, build_dir: &Path, jobs: usize) -> Result<(), BackendError> {
        let jobs = jobs.max(1).to_string();
        run(&self.make, &["-j", &jobs], build_dir, "Compiling").map(drop)
    }

    fn test(&self, build_dir: &Path) -> Result<String, BackendError> {
        run(&self.ctest, &["--output-on-failure"], build_dir, "Testing")
    }

    fn is_configured(&self, build_dir: &Path) -> bool {
        build_dir.join("Makefile").exists()
    }
}

struct CommandLine<'a>(&'a str, &'a [&'a str]);

impl fmt::Display for CommandLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)?;
        for arg in self.1 {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Runs `program` in `cwd` behind a spinner and returns its combined
/// stdout and stderr.
fn run(program: &str, args: &[&str], cwd: &Path, verb: &str) -> Result<String, BackendError> {
    let command = CommandLine(program, args).to_string();
    debug!(%command, cwd = %cwd.display(), "running backend");

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(format!("{} ({})", verb, command.dimmed()));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = Command::new(program).args(args).current_dir(cwd).output();
    pb.finish_and_clear();

    let output = result.map_err(|source| BackendError::Spawn {
        program: program.to_string(),
        source,
    })?;
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        return Err(BackendError::Failed {
            command,
            status: output.status,
            output: text,
        });
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_display() {
        assert_eq!(CommandLine("make", &["-j", "4"]).to_string(), "make -j 4");
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run("kb-no-such-program", &[], dir.path(), "Testing").unwrap_err();
        assert!(matches!(err, BackendError::Spawn { .. }));
        assert!(err.output().is_none());
    }

    #[test]
    fn test_unconfigured_build_dir() {
        let dir = tempfile::tempdir().unwrap();
        let backend = CMakeBackend::new(&BackendConfig::default());
        assert!(!backend.is_configured(dir.path()));
        std::fs::write(dir.path().join("Makefile"), "all:\n").unwrap();
        assert!(backend.is_configured(dir.path()));
    }
}
