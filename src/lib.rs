//! # kbuild - Kconfig-driven build front-end
//!
//! kbuild wraps a CMake build with a Kconfig-style feature configuration
//! layer: symbol definitions in `Kconfig`, persisted choices in `.config`,
//! and generated `config.h` / `build/config.cmake` for the build.
//!
//! ## Quick Start
//!
//! ```bash
//! kb menuconfig    # choose options
//! kb build         # regenerate configuration and compile
//! kb run
//! ```
//!
//! ## Module Organization
//!
//! - [`kconfig`] - Symbol model, loader, evaluator, state store, generators
//! - [`pipeline`] - Configuration pipeline over a project
//! - [`editor`] - Interactive editing contract and terminal editor
//! - [`build`] - Build backend, cleanup, run and size
//! - [`config`] - Project settings (`kb.toml`)
//! - [`commands`] - CLI command handlers

/// Build backend (CMake/make/ctest), cleanup and program execution.
pub mod build;

/// CLI command handlers.
pub mod commands;

/// Project settings (`kb.toml`).
pub mod config;

/// Interactive configuration editing.
pub mod editor;

/// Kconfig engine.
pub mod kconfig;

/// Diagnostic logging setup.
pub mod logging;

/// Load, resolve and generate over a project.
pub mod pipeline;

/// Terminal output helpers and tables.
pub mod ui;
