//! Build output cleanup.
//!
//! - `kb clean` - remove the build directory and the generated header
//! - `kb fullclean` - also remove `.config`

use anyhow::{Context, Result};
use std::fs;

use crate::config::Project;
use crate::ui;

pub fn clean(project: &Project) -> Result<bool> {
    ui::header("Cleaning");
    let mut cleaned = false;

    let build_dir = project.build_dir();
    if build_dir.exists() {
        ui::info(&format!("Removing {}", build_dir.display()));
        fs::remove_dir_all(&build_dir)
            .with_context(|| format!("Failed to remove {}", build_dir.display()))?;
        cleaned = true;
    }

    let header = project.header_path();
    if header.exists() {
        ui::info(&format!("Removing {}", header.display()));
        fs::remove_file(&header)
            .with_context(|| format!("Failed to remove {}", header.display()))?;
        cleaned = true;
    }

    if cleaned {
        ui::success("Clean complete");
    } else {
        ui::warn("Nothing to clean");
    }
    Ok(cleaned)
}

pub fn fullclean(project: &Project) -> Result<bool> {
    let mut cleaned = clean(project)?;

    let config = project.config_path();
    if config.exists() {
        ui::info(&format!("Removing {}", config.display()));
        fs::remove_file(&config)
            .with_context(|| format!("Failed to remove {}", config.display()))?;
        cleaned = true;
        ui::success("Configuration removed");
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;

    #[test]
    fn test_clean_keeps_config() {
        let dir = tempfile::tempdir().unwrap();
        let p = Project::new(dir.path(), ProjectConfig::default());
        fs::create_dir_all(p.build_dir().join("CMakeFiles")).unwrap();
        fs::write(p.header_path(), "").unwrap();
        fs::write(p.config_path(), "CONFIG_A=y\n").unwrap();

        assert!(clean(&p).unwrap());
        assert!(!p.build_dir().exists());
        assert!(!p.header_path().exists());
        assert!(p.config_path().exists());
        assert!(!clean(&p).unwrap());
    }

    #[test]
    fn test_fullclean_removes_config() {
        let dir = tempfile::tempdir().unwrap();
        let p = Project::new(dir.path(), ProjectConfig::default());
        fs::write(p.config_path(), "CONFIG_A=y\n").unwrap();
        fs::write(p.defconfig_path(), "CONFIG_A=y\n").unwrap();

        assert!(fullclean(&p).unwrap());
        assert!(!p.config_path().exists());
        assert!(p.defconfig_path().exists());
    }
}
