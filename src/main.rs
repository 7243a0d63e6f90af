//! # kb CLI Entry Point
//!
//! Parses arguments with clap and routes each subcommand to its handler.
//!
//! ## Command Structure
//!
//! - **Configuration**: `menuconfig`, `defconfig`, `savedefconfig`, `config`
//! - **Build**: `configure`, `build`, `all`, `test`, `run`, `size`
//! - **Cleanup**: `clean`, `fullclean`

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use kbuild::build::{self, CMakeBackend};
use kbuild::commands;
use kbuild::config::Project;
use kbuild::editor::InquireEditor;
use kbuild::logging;
use kbuild::pipeline;
use kbuild::ui;

#[cfg(windows)]
#[link(name = "kernel32")]
unsafe extern "system" {
    fn SetConsoleOutputCP(wCodePageID: u32) -> i32;
}

#[cfg(windows)]
fn enable_windows_utf8_console() {
    unsafe {
        SetConsoleOutputCP(65001);
    }
}

#[cfg(not(windows))]
fn enable_windows_utf8_console() {}

#[derive(Parser)]
#[command(name = "kb")]
#[command(about = "Kconfig-driven CMake build front-end", version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(short = 'C', long = "dir", global = true, default_value = ".")]
    dir: PathBuf,

    /// Show diagnostic logging (-vv for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Regenerate config.h and config.cmake, then configure CMake
    Configure,
    /// Compile the project, configuring first if needed
    Build,
    /// Remove the build directory and generated header
    Clean,
    /// Clean and also remove .config
    Fullclean,
    /// Edit the configuration interactively
    Menuconfig,
    /// Reset .config to the default configuration
    Defconfig,
    /// Save the current .config as defconfig
    Savedefconfig,
    /// Run the test suite with ctest
    Test,
    /// Run the built program
    Run {
        /// Arguments passed to the program
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },
    /// Show the size of the built program
    Size,
    /// List the enabled options in .config
    Config,
    /// Configure and build in one step
    All,
    /// Generate shell completion scripts
    Completion { shell: Shell },
}

impl Commands {
    /// Commands that reach the build backend need its tools present.
    fn needs_tools(&self) -> bool {
        matches!(
            self,
            Commands::Configure | Commands::Build | Commands::Test | Commands::All
        )
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Completion { shell } = cli.command {
        let mut cmd = Cli::command();
        let bin_name = cmd.get_name().to_string();
        generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        return Ok(());
    }

    let project = Project::load(&cli.dir)
        .with_context(|| format!("Failed to load project at {}", cli.dir.display()))?;
    ui::header(&format!("{} build tool", project.config.project.name));
    ui::info(&format!("Project directory: {}", project.root.display()));

    if cli.command.needs_tools() {
        commands::doctor::check_dependencies(&project)?;
    }

    let backend = CMakeBackend::new(&project.config.backend);
    match cli.command {
        Commands::Configure => commands::build::configure(&project, &backend),
        Commands::Build => commands::build::build(&project, &backend),
        Commands::Clean => build::clean(&project).map(drop),
        Commands::Fullclean => build::fullclean(&project).map(drop),
        Commands::Menuconfig => pipeline::menuconfig(&project, &mut InquireEditor).map(drop),
        Commands::Defconfig => pipeline::write_defconfig(&project),
        Commands::Savedefconfig => pipeline::save_defconfig(&project),
        Commands::Test => commands::build::test(&project, &backend),
        Commands::Run { args } => build::run_binary(&project, &args),
        Commands::Size => build::show_size(&project),
        Commands::Config => commands::show::show_config(&project),
        Commands::All => commands::build::all(&project, &backend),
        Commands::Completion { .. } => Ok(()),
    }
}

fn main() {
    enable_windows_utf8_console();

    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
