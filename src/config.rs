use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Optional project file at the project root.
pub const PROJECT_FILE: &str = "kb.toml";

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub kconfig: KconfigConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectSection {
    pub name: String,
    /// Executable produced by the build, relative to the build directory.
    pub binary: String,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            name: "project".to_string(),
            binary: "demo".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub kconfig: PathBuf,
    pub config: PathBuf,
    pub defconfig: PathBuf,
    pub build_dir: PathBuf,
    pub header: PathBuf,
    /// File name of the generated CMake variables, inside `build_dir`.
    pub build_variables: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            kconfig: "Kconfig".into(),
            config: ".config".into(),
            defconfig: "defconfig".into(),
            build_dir: "build".into(),
            header: "config.h".into(),
            build_variables: "config.cmake".into(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct KconfigConfig {
    pub prefix: String,
}

impl Default for KconfigConfig {
    fn default() -> Self {
        Self {
            prefix: "CONFIG_".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    pub cmake: String,
    pub make: String,
    pub ctest: String,
    /// Parallel jobs for `make`; detected from the host when unset.
    pub jobs: Option<usize>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            cmake: "cmake".to_string(),
            make: "make".to_string(),
            ctest: "ctest".to_string(),
            jobs: None,
        }
    }
}

/// A project root plus its configuration; every path is resolved against
/// `root` so several projects can be handled in one process.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config: ProjectConfig,
}

impl Project {
    /// Loads `kb.toml` from `root` when present, defaults otherwise.
    pub fn load(root: &Path) -> Result<Self> {
        let file = root.join(PROJECT_FILE);
        let config = if file.exists() {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            toml::from_str(&text).with_context(|| {
                format!(
                    "Failed to parse {} - check for syntax errors or unknown keys",
                    file.display()
                )
            })?
        } else {
            ProjectConfig::default()
        };
        Ok(Self::new(root, config))
    }

    pub fn new(root: &Path, config: ProjectConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
        }
    }

    fn resolve(&self, p: &Path) -> PathBuf {
        self.root.join(p)
    }

    pub fn kconfig_path(&self) -> PathBuf {
        self.resolve(&self.config.paths.kconfig)
    }

    pub fn config_path(&self) -> PathBuf {
        self.resolve(&self.config.paths.config)
    }

    pub fn defconfig_path(&self) -> PathBuf {
        self.resolve(&self.config.paths.defconfig)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.resolve(&self.config.paths.build_dir)
    }

    pub fn header_path(&self) -> PathBuf {
        self.resolve(&self.config.paths.header)
    }

    pub fn build_variables_path(&self) -> PathBuf {
        self.build_dir().join(&self.config.paths.build_variables)
    }

    pub fn binary_path(&self) -> PathBuf {
        self.build_dir().join(&self.config.project.binary)
    }

    pub fn prefix(&self) -> &str {
        &self.config.kconfig.prefix
    }

    pub fn jobs(&self) -> usize {
        self.config.backend.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::load(dir.path()).unwrap();
        assert_eq!(project.kconfig_path(), dir.path().join("Kconfig"));
        assert_eq!(project.build_variables_path(), dir.path().join("build/config.cmake"));
        assert_eq!(project.prefix(), "CONFIG_");
        assert!(project.jobs() >= 1);
    }

    #[test]
    fn test_partial_project_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(PROJECT_FILE),
            r#"
[project]
name = "auto_init_demo"

[paths]
build_dir = "out"

[backend]
jobs = 2
"#,
        )
        .unwrap();
        let project = Project::load(dir.path()).unwrap();
        assert_eq!(project.config.project.name, "auto_init_demo");
        assert_eq!(project.config.project.binary, "demo");
        assert_eq!(project.binary_path(), dir.path().join("out/demo"));
        assert_eq!(project.config_path(), dir.path().join(".config"));
        assert_eq!(project.jobs(), 2);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PROJECT_FILE), "[paths]\nkconfg = \"x\"\n").unwrap();
        assert!(Project::load(dir.path()).is_err());
    }
}
