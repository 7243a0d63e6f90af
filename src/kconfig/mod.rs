//! Kconfig engine: symbol model, definition loader, evaluator, persisted
//! state and artifact generators.
//!
//! ## Pipeline
//!
//! ```text
//! Kconfig ──load──▶ Graph ──resolve(state)──▶ ResolvedGraph ──▶ config.h
//!                                  ▲                        └──▶ config.cmake
//!                   .config ──ConfigStore::load──┘
//! ```

mod error;
mod expr;
mod generate;
mod graph;
mod parser;
mod resolve;
mod state;
mod symbol;

pub use error::{ArtifactError, EditError, LoadError, StateError, StateParseWarning, TypeMismatch};
pub use expr::{CmpOp, Expr, SymbolValues};
pub use generate::{generate_build_variables, generate_definitions, write_artifact};
pub use graph::{Graph, MenuNode};
pub use resolve::{ResolvedGraph, ResolvedSymbol};
pub use state::{ConfigState, ConfigStore, LoadedState};
pub use symbol::{DefaultRule, Location, RangeRule, Symbol, SymbolType, Tristate, Value};

use std::fs;
use std::io;
use std::path::Path;

/// Writes to a sibling temporary file and renames it over `path`.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, contents)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}
