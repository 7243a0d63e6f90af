//! Tool checks run before backend-facing commands.
//!
//! Nothing is ever installed here: a missing tool is reported and the
//! command stops.

use anyhow::{Result, bail};
use std::process::Command;

use crate::config::Project;
use crate::ui;

/// First line of `<program> --version`, or `None` when it cannot be run.
pub fn tool_version(program: &str) -> Option<String> {
    let output = Command::new(program).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout);
    Some(text.lines().next().unwrap_or(program).trim().to_string())
}

/// Verifies that the configured `cmake` is on `PATH`.
pub fn check_dependencies(project: &Project) -> Result<()> {
    ui::header("Checking dependencies");
    let cmake = &project.config.backend.cmake;
    match tool_version(cmake) {
        Some(version) => {
            ui::success(&version);
            Ok(())
        }
        None => bail!("`{}` is not installed or not on PATH", cmake),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;

    #[test]
    fn test_missing_tool() {
        assert!(tool_version("kb-no-such-tool").is_none());

        let dir = tempfile::tempdir().unwrap();
        let mut config = ProjectConfig::default();
        config.backend.cmake = "kb-no-such-tool".into();
        let err = check_dependencies(&Project::new(dir.path(), config)).unwrap_err();
        assert!(err.to_string().contains("kb-no-such-tool"));
    }
}
