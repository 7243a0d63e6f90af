//! Configuration pipeline.
//!
//! Ties the Kconfig engine to a [`Project`]: load definitions, bring the
//! persisted `.config` up to date, and regenerate `config.h` and
//! `build/config.cmake`. Every entry point takes the project explicitly so
//! several projects can be handled in one process.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Project;
use crate::editor::ConfigEditor;
use crate::kconfig::{
    ConfigState, ConfigStore, Graph, LoadedState, generate_build_variables,
    generate_definitions, write_artifact,
};
use crate::ui;

/// Paths written by [`process_kconfig`].
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub header: PathBuf,
    pub build_variables: PathBuf,
}

pub fn load_graph(project: &Project) -> Result<Graph> {
    let path = project.kconfig_path();
    ui::info(&format!("Loading {}", path.display()));
    let graph = Graph::load(&path)?;
    debug!(symbols = graph.len(), "definitions loaded");
    Ok(graph)
}

fn store(project: &Project) -> ConfigStore {
    ConfigStore::new(project.prefix())
}

/// Prints skipped lines and drops values for symbols the graph no longer
/// defines.
fn accept_loaded(path: &Path, graph: &Graph, loaded: LoadedState) -> ConfigState {
    for warning in &loaded.warnings {
        ui::warn(&format!("{}: {}", path.display(), warning));
    }
    let mut state = loaded.state;
    for name in state.retain_defined(graph) {
        debug!(%name, "ignoring value for undefined symbol");
    }
    state
}

/// Reads `.config`. A missing file is an empty state.
fn load_state(project: &Project, graph: &Graph) -> Result<ConfigState> {
    let path = project.config_path();
    if !path.exists() {
        return Ok(ConfigState::new());
    }
    let loaded = store(project).load(&path)?;
    Ok(accept_loaded(&path, graph, loaded))
}

/// Regenerates every artifact from the definitions and `.config`.
///
/// A missing `.config` is seeded from `defconfig` when one exists, or
/// written from defaults otherwise. Definition errors abort before anything
/// is written.
pub fn process_kconfig(project: &Project) -> Result<Artifacts> {
    ui::header("Processing Kconfig");

    let graph = load_graph(project)?;
    let config_path = project.config_path();

    let defconfig = project.defconfig_path();
    let state = if config_path.exists() {
        load_state(project, &graph)?
    } else if defconfig.exists() {
        ui::info(&format!("Using baseline {}", defconfig.display()));
        let seeded = store(project).seed_from(&defconfig)?;
        fs::copy(&defconfig, &config_path).with_context(|| {
            format!(
                "Failed to copy {} to {}",
                defconfig.display(),
                config_path.display()
            )
        })?;
        accept_loaded(&defconfig, &graph, seeded)
    } else {
        ui::info("Generating default configuration");
        save_defaults(project, &graph)?
    };

    let resolved = graph.resolve(&state);
    for mismatch in resolved.mismatches() {
        ui::warn(&mismatch.to_string());
    }

    let header = project.header_path();
    ui::info(&format!("Writing {}", header.display()));
    write_artifact(&header, &generate_definitions(&resolved, project.prefix()))?;

    let build_dir = project.build_dir();
    fs::create_dir_all(&build_dir)
        .with_context(|| format!("Failed to create {}", build_dir.display()))?;
    let build_variables = project.build_variables_path();
    ui::info(&format!("Writing {}", build_variables.display()));
    write_artifact(
        &build_variables,
        &generate_build_variables(&resolved, project.prefix()),
    )?;

    info!(
        symbols = graph.len(),
        header = %header.display(),
        "configuration processed"
    );
    ui::success("Kconfig processing complete");
    Ok(Artifacts {
        header,
        build_variables,
    })
}

/// Writes the pure default resolution to `.config` and returns it.
fn save_defaults(project: &Project, graph: &Graph) -> Result<ConfigState> {
    let state = graph.resolve(&ConfigState::new()).to_state();
    store(project).save(&state, graph, &project.config_path())?;
    Ok(state)
}

/// Overwrites `.config` with pure default resolution.
pub fn write_defconfig(project: &Project) -> Result<()> {
    ui::header("Generating default configuration");
    let graph = load_graph(project)?;
    save_defaults(project, &graph)?;
    ui::success(&format!(
        "Default configuration written to {}",
        project.config_path().display()
    ));
    Ok(())
}

/// Copies the current `.config` to the `defconfig` baseline.
pub fn save_defconfig(project: &Project) -> Result<()> {
    ui::header("Saving baseline configuration");
    let config = project.config_path();
    if !config.exists() {
        bail!("{} does not exist", config.display());
    }
    let defconfig = project.defconfig_path();
    fs::copy(&config, &defconfig).with_context(|| {
        format!("Failed to copy {} to {}", config.display(), defconfig.display())
    })?;
    ui::success(&format!("Configuration saved to {}", defconfig.display()));
    Ok(())
}

/// Runs `editor` over the current state and persists the result.
///
/// Returns `true` when an edited state was saved. A declined editor keeps
/// `.config` as it is, creating it from defaults if missing.
pub fn menuconfig(project: &Project, editor: &mut dyn ConfigEditor) -> Result<bool> {
    ui::header("Interactive configuration");
    let graph = load_graph(project)?;
    let state = load_state(project, &graph)?;

    let Some(edited) = editor.edit(&graph, state)? else {
        if !project.config_path().exists() {
            save_defaults(project, &graph)?;
        }
        ui::warn("Editor declined; configuration left unchanged");
        return Ok(false);
    };

    let state = graph.resolve(&edited).to_state();
    store(project).save(&state, &graph, &project.config_path())?;
    ui::success(&format!(
        "Configuration saved to {}",
        project.config_path().display()
    ));
    Ok(true)
}

/// `NAME=VALUE` assignment lines of `.config`, in file order. `None` when
/// the file is missing.
pub fn enabled_options(project: &Project) -> Result<Option<Vec<(String, String)>>> {
    let path = project.config_path();
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let options = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    Ok(Some(options))
}
