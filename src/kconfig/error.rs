use std::fmt;
use std::path::PathBuf;

use super::symbol::SymbolType;

/// Fatal failure to build a symbol graph. Nothing is written when loading fails.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("definition file not found: {path}")]
    Missing { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}:{line}: {message}")]
    Syntax {
        file: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{file}:{line}: '{keyword}' is not supported")]
    Unsupported {
        file: PathBuf,
        line: usize,
        keyword: String,
    },

    #[error("symbol {name} is defined twice (second definition at {file}:{line})")]
    DuplicateSymbol {
        name: String,
        file: PathBuf,
        line: usize,
    },

    #[error("symbol {referenced_by} references undefined symbol {name}")]
    UndefinedSymbol { name: String, referenced_by: String },

    #[error("dependency cycle: {}", chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    #[error("symbol {name} has a default '{value}' that is not a valid {kind}")]
    InvalidDefault {
        name: String,
        value: String,
        kind: SymbolType,
    },

    #[error("recursive source of {path}")]
    SourceLoop { path: PathBuf },
}

/// I/O failure on the persisted state file.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Generated artifact could not be written. Any previous artifact is left intact.
#[derive(Debug, thiserror::Error)]
#[error("failed to write {path}: {source}")]
pub struct ArtifactError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Rejected edit through the editor adapter.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("unknown symbol {0}")]
    UnknownSymbol(String),

    #[error("symbol {0} is not visible and cannot be edited")]
    Invisible(String),

    #[error("symbol {0} has no prompt and cannot be edited")]
    NotEditable(String),

    #[error("'{raw}' is not a valid value for {name} ({kind})")]
    InvalidValue {
        name: String,
        raw: String,
        kind: SymbolType,
    },
}

/// Non-fatal: a line of the state file that was skipped or overridden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateParseWarning {
    pub line: usize,
    pub content: String,
    pub reason: String,
}

impl fmt::Display for StateParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} ({})", self.line, self.reason, self.content)
    }
}

/// Non-fatal: a stored value did not fit its symbol's type or range, so the
/// symbol fell back to its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatch {
    pub name: String,
    pub raw: String,
    pub expected: SymbolType,
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: stored value '{}' is not a valid {}, using default",
            self.name, self.raw, self.expected
        )
    }
}
