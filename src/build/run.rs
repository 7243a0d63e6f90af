//! Running and inspecting the built program.

use anyhow::{Context, Result, bail};
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::Project;
use crate::ui;

fn built_binary(project: &Project) -> Result<PathBuf> {
    let mut path = project.binary_path();
    if cfg!(target_os = "windows") && path.extension().is_none() {
        path.set_extension("exe");
    }
    if !path.exists() {
        bail!(
            "{} does not exist; build the project first with `kb build`",
            path.display()
        );
    }
    Ok(path)
}

/// Runs the built program with `args`, failing if it exits non-zero.
pub fn run_binary(project: &Project, args: &[String]) -> Result<()> {
    ui::header("Running");
    let bin = built_binary(project)?;
    println!("{} {}\n", "▶".green(), bin.display());

    let status = Command::new(&bin)
        .args(args)
        .current_dir(&project.root)
        .status()
        .with_context(|| format!("Failed to run {}", bin.display()))?;
    if !status.success() {
        bail!("{} exited with {}", bin.display(), status);
    }
    Ok(())
}

/// Prints section sizes via `size`, or just the file size when `size` is
/// unavailable.
pub fn show_size(project: &Project) -> Result<()> {
    ui::header("Program size");
    let bin = built_binary(project)?;

    match Command::new("size").arg(&bin).output() {
        Ok(output) if output.status.success() => {
            print!("{}", String::from_utf8_lossy(&output.stdout));
        }
        _ => {
            ui::warn("`size` is unavailable; showing file size");
            println!("{}", file_size_line(&bin)?);
        }
    }
    Ok(())
}

fn file_size_line(bin: &Path) -> Result<String> {
    let len = fs::metadata(bin)
        .with_context(|| format!("Failed to read {}", bin.display()))?
        .len();
    Ok(format!("{:>10} bytes  {}", len, bin.display()))
}
