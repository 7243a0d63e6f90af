//! Artifact generators: `config.h` definitions and `config.cmake` variables.
//!
//! Both are pure functions of a [`ResolvedGraph`]; output order is graph
//! declaration order, so the same resolution always yields the same bytes.

use std::path::Path;

use super::error::ArtifactError;
use super::resolve::ResolvedGraph;
use super::symbol::{Tristate, Value};
use super::write_atomic;

const HEADER_BANNER: &str = "/* Automatically generated file; DO NOT EDIT. */\n";
const CMAKE_BANNER: &str = "# Automatically generated file; DO NOT EDIT.\n";

/// One `#define` per visible symbol with a non-inactive value. `n` symbols
/// are absent rather than defined to 0; `m` becomes `<NAME>_MODULE`.
pub fn generate_definitions(resolved: &ResolvedGraph<'_>, prefix: &str) -> String {
    let mut out = String::from(HEADER_BANNER);
    for entry in resolved.iter().filter(|e| e.is_active()) {
        let name = &entry.symbol.name;
        let line = match entry.value {
            Value::Tristate(Tristate::Yes) => format!("#define {prefix}{name} 1"),
            Value::Tristate(Tristate::Module) => format!("#define {prefix}{name}_MODULE 1"),
            Value::Tristate(Tristate::No) => continue,
            Value::String(s) => format!("#define {prefix}{name} \"{}\"", escape_c(s)),
            Value::Int(n) => format!("#define {prefix}{name} {n}"),
            Value::Hex(_) => format!("#define {prefix}{name} {}", entry.value),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// One `set()` per defined symbol. Unlike the header, `n` is emitted as an
/// explicit `FALSE`; invisible symbols carry their inactive value.
pub fn generate_build_variables(resolved: &ResolvedGraph<'_>, prefix: &str) -> String {
    let mut out = String::from(CMAKE_BANNER);
    for entry in resolved.iter() {
        let name = &entry.symbol.name;
        let value = if !entry.visible {
            match entry.symbol.kind.inactive_value() {
                Value::Tristate(_) => "FALSE".to_string(),
                _ => "\"\"".to_string(),
            }
        } else {
            match entry.value {
                Value::Tristate(Tristate::Yes) => "TRUE".to_string(),
                Value::Tristate(Tristate::Module) => "MODULE".to_string(),
                Value::Tristate(Tristate::No) => "FALSE".to_string(),
                other => format!("\"{}\"", escape_cmake(&other.to_string())),
            }
        };
        out.push_str(&format!("set({prefix}{name} {value})\n"));
    }
    out
}

/// Whole-file replace; a failed write leaves the previous artifact untouched.
pub fn write_artifact(path: &Path, contents: &str) -> Result<(), ArtifactError> {
    write_atomic(path, contents).map_err(|source| ArtifactError {
        path: path.to_path_buf(),
        source,
    })
}

fn escape_c(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

fn escape_cmake(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' | '"' | '$' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kconfig::{ConfigState, Graph};

    const KCONFIG: &str = r#"
config FEATURE_X
    bool "Feature X"
    default n

config FEATURE_X_LEVEL
    int "Feature X level"
    default 3
    depends on FEATURE_X

config DRIVER
    tristate "Driver"
    default m

config BOARD
    string "Board"
    default "devkit \"v2\""

config FLASH_BASE
    hex "Flash base"
    default 0x8000000

config UNUSED_NAME
    string "Unused"
"#;

    fn graph() -> Graph {
        Graph::parse(KCONFIG, "Kconfig").unwrap()
    }

    #[test]
    fn test_definitions_with_defaults() {
        let g = graph();
        let r = g.resolve(&ConfigState::new());
        assert_eq!(
            generate_definitions(&r, "CONFIG_"),
            "/* Automatically generated file; DO NOT EDIT. */\n\
             #define CONFIG_DRIVER_MODULE 1\n\
             #define CONFIG_BOARD \"devkit \\\"v2\\\"\"\n\
             #define CONFIG_FLASH_BASE 0x8000000\n"
        );
    }

    #[test]
    fn test_definitions_with_feature_enabled() {
        let g = graph();
        let mut state = ConfigState::new();
        state.set("FEATURE_X", "y");
        state.set("FEATURE_X_LEVEL", "7");
        state.set("DRIVER", "n");
        let out = generate_definitions(&g.resolve(&state), "CONFIG_");
        assert!(out.contains("#define CONFIG_FEATURE_X 1\n"));
        assert!(out.contains("#define CONFIG_FEATURE_X_LEVEL 7\n"));
        assert!(!out.contains("DRIVER"));
    }

    #[test]
    fn test_build_variables_cover_every_symbol() {
        let g = graph();
        let out = generate_build_variables(&g.resolve(&ConfigState::new()), "CONFIG_");
        assert_eq!(
            out,
            "# Automatically generated file; DO NOT EDIT.\n\
             set(CONFIG_FEATURE_X FALSE)\n\
             set(CONFIG_FEATURE_X_LEVEL \"\")\n\
             set(CONFIG_DRIVER MODULE)\n\
             set(CONFIG_BOARD \"devkit \\\"v2\\\"\")\n\
             set(CONFIG_FLASH_BASE \"0x8000000\")\n\
             set(CONFIG_UNUSED_NAME \"\")\n"
        );
    }

    #[test]
    fn test_build_variables_with_feature_enabled() {
        let g = graph();
        let mut state = ConfigState::new();
        state.set("FEATURE_X", "y");
        state.set("FEATURE_X_LEVEL", "7");
        let out = generate_build_variables(&g.resolve(&state), "CONFIG_");
        assert!(out.contains("set(CONFIG_FEATURE_X TRUE)\n"));
        assert!(out.contains("set(CONFIG_FEATURE_X_LEVEL \"7\")\n"));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let g = graph();
        let state = ConfigState::new();
        let a = g.resolve(&state);
        let b = g.resolve(&state);
        assert_eq!(generate_definitions(&a, "CONFIG_"), generate_definitions(&b, "CONFIG_"));
        assert_eq!(
            generate_build_variables(&a, "CONFIG_"),
            generate_build_variables(&b, "CONFIG_")
        );
    }

    #[test]
    fn test_cmake_escapes_variable_references() {
        assert_eq!(escape_cmake("${HOME}\\x"), "\\${HOME}\\\\x");
    }

    #[test]
    fn test_write_artifact_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_artifact(&dir.path().join("missing/config.h"), "x").unwrap_err();
        assert!(err.to_string().contains("config.h"));
    }
}
