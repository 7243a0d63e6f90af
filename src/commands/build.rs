//! Configure, build, test and all.

use anyhow::{Context, Result, bail};
use colored::*;
use std::fs;
use std::path;

use crate::build::{BackendError, BuildBackend, FeedbackAnalyzer};
use crate::config::Project;
use crate::pipeline;
use crate::ui;

/// Prints a hint for recognised backend output, then hands the error on.
fn explain(err: BackendError) -> anyhow::Error {
    if let Some(hint) = err.output().and_then(FeedbackAnalyzer::analyze) {
        println!("\n{} {}\n", "💡".yellow(), hint);
    }
    err.into()
}

fn backend_configure(project: &Project, backend: &dyn BuildBackend) -> Result<()> {
    ui::header("Configuring build");
    let build_dir = project.build_dir();
    fs::create_dir_all(&build_dir)
        .with_context(|| format!("Failed to create {}", build_dir.display()))?;
    let source_dir = path::absolute(&project.root)
        .with_context(|| format!("Failed to resolve {}", project.root.display()))?;
    backend.configure(&source_dir, &build_dir).map_err(explain)?;
    ui::success("Build configured");
    Ok(())
}

fn compile(project: &Project, backend: &dyn BuildBackend) -> Result<()> {
    ui::header("Building");
    let build_dir = project.build_dir();
    if !build_dir.exists() {
        bail!(
            "{} does not exist; run `kb configure` first",
            build_dir.display()
        );
    }
    let jobs = project.jobs();
    ui::info(&format!("Using {} parallel jobs", jobs));
    backend.compile(&build_dir, jobs).map_err(explain)?;
    ui::success("Build complete");
    Ok(())
}

/// Regenerates the configuration artifacts and configures the backend.
pub fn configure(project: &Project, backend: &dyn BuildBackend) -> Result<()> {
    pipeline::process_kconfig(project)?;
    backend_configure(project, backend)
}

/// Compiles, configuring first when the build directory is not set up.
pub fn build(project: &Project, backend: &dyn BuildBackend) -> Result<()> {
    if !backend.is_configured(&project.build_dir()) {
        ui::warn("Project is not configured; configuring first");
        configure(project, backend)?;
    }
    compile(project, backend)
}

pub fn test(project: &Project, backend: &dyn BuildBackend) -> Result<()> {
    ui::header("Running tests");
    let build_dir = project.build_dir();
    if !build_dir.exists() {
        bail!("Build the project first with `kb build`");
    }
    let report = backend.test(&build_dir).map_err(explain)?;
    print!("{}", report);
    ui::success("Tests passed");
    Ok(())
}

pub fn all(project: &Project, backend: &dyn BuildBackend) -> Result<()> {
    configure(project, backend)?;
    compile(project, backend)?;
    ui::success("Full build complete");
    ui::info("Run `kb run` to start the program");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use std::cell::RefCell;
    use std::path::Path;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<String>>,
    }

    impl BuildBackend for Recorder {
        fn configure(&self, _source_dir: &Path, build_dir: &Path) -> Result<(), BackendError> {
            fs::write(build_dir.join("Makefile"), "").ok();
            self.calls.borrow_mut().push("configure".into());
            Ok(())
        }

        fn compile(&self, _build_dir: &Path, jobs: usize) -> Result<(), BackendError> {
            self.calls.borrow_mut().push(format!("compile {jobs}"));
            Ok(())
        }

        fn test(&self, _build_dir: &Path) -> Result<String, BackendError> {
            self.calls.borrow_mut().push("test".into());
            Ok("100% tests passed\n".into())
        }

        fn is_configured(&self, build_dir: &Path) -> bool {
            build_dir.join("Makefile").exists()
        }
    }

    fn project(dir: &Path) -> Project {
        fs::write(dir.join("Kconfig"), "config FEATURE_X\n    bool \"X\"\n    default y\n").unwrap();
        let mut config = ProjectConfig::default();
        config.backend.jobs = Some(3);
        Project::new(dir, config)
    }

    #[test]
    fn test_build_configures_once() {
        let dir = tempfile::tempdir().unwrap();
        let p = project(dir.path());
        let backend = Recorder::default();

        build(&p, &backend).unwrap();
        build(&p, &backend).unwrap();
        assert_eq!(
            *backend.calls.borrow(),
            ["configure", "compile 3", "compile 3"]
        );
        assert!(p.header_path().exists());
        assert!(p.build_variables_path().exists());
    }

    #[test]
    fn test_requires_build_dir() {
        let dir = tempfile::tempdir().unwrap();
        let p = project(dir.path());
        let backend = Recorder::default();
        assert!(test(&p, &backend).is_err());
        all(&p, &backend).unwrap();
        test(&p, &backend).unwrap();
        assert_eq!(
            *backend.calls.borrow(),
            ["configure", "compile 3", "test"]
        );
    }

    #[test]
    fn test_broken_definitions_stop_before_backend() {
        let dir = tempfile::tempdir().unwrap();
        let p = project(dir.path());
        fs::write(p.kconfig_path(), "config A\n    bool\n    depends on MISSING\n").unwrap();
        let backend = Recorder::default();
        assert!(configure(&p, &backend).is_err());
        assert!(backend.calls.borrow().is_empty());
        assert!(!p.header_path().exists());
    }
}
