//! Persisted configuration state (the `.config` file).
//!
//! ## Format
//!
//! ```text
//! CONFIG_NAME="text"          # string, quoted with \" and \\ escapes
//! CONFIG_LEVEL=7              # int / hex
//! CONFIG_FEATURE=y            # tristate yes (m for module)
//! # CONFIG_OTHER is not set   # tristate no
//! ```
//!
//! Reading is permissive: malformed lines are skipped and reported as
//! [`StateParseWarning`]s. Writing follows graph declaration order so
//! successive saves diff cleanly.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::error::{StateError, StateParseWarning};
use super::expr::is_symbol_name;
use super::graph::Graph;
use super::symbol::SymbolType;
use super::write_atomic;

/// Raw stored values keyed by symbol name (without prefix), independent of
/// any graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigState {
    values: BTreeMap<String, String>,
}

impl ConfigState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Returns the previous raw value, if any.
    pub fn set(&mut self, name: &str, raw: impl Into<String>) -> Option<String> {
        self.values.insert(name.to_string(), raw.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Drops entries for symbols the graph no longer defines and returns
    /// their names.
    pub fn retain_defined(&mut self, graph: &Graph) -> Vec<String> {
        let stale: Vec<String> = self
            .values
            .keys()
            .filter(|name| !graph.contains(name))
            .cloned()
            .collect();
        for name in &stale {
            self.values.remove(name);
        }
        stale
    }
}

/// Result of reading a state file.
#[derive(Debug, Clone, Default)]
pub struct LoadedState {
    pub state: ConfigState,
    pub warnings: Vec<StateParseWarning>,
}

/// Reads and writes state files using a fixed symbol prefix.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    prefix: String,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new("CONFIG_")
    }
}

impl ConfigStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn load(&self, path: &Path) -> Result<LoadedState, StateError> {
        let text = fs::read_to_string(path).map_err(|source| StateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.parse(&text))
    }

    /// Loads a baseline (`defconfig`) when no state file exists yet.
    pub fn seed_from(&self, path: &Path) -> Result<LoadedState, StateError> {
        self.load(path)
    }

    pub fn parse(&self, text: &str) -> LoadedState {
        let mut loaded = LoadedState::default();

        for (i, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }
            let mut warn = |reason: &str| {
                loaded.warnings.push(StateParseWarning {
                    line: i + 1,
                    content: line.to_string(),
                    reason: reason.to_string(),
                });
            };

            let (name, value) = if let Some(comment) = line.strip_prefix('#') {
                match self.parse_not_set(comment) {
                    Some(name) => (name, "n".to_string()),
                    None => continue,
                }
            } else {
                let Some((key, value)) = line.split_once('=') else {
                    warn("expected NAME=VALUE");
                    continue;
                };
                let Some(name) = key.trim().strip_prefix(self.prefix.as_str()) else {
                    warn("missing symbol prefix");
                    continue;
                };
                if !is_symbol_name(name) {
                    warn("invalid symbol name");
                    continue;
                }
                let value = value.trim();
                let value = if value.starts_with('"') {
                    match unquote(value) {
                        Some(v) => v,
                        None => {
                            warn("malformed quoted value");
                            continue;
                        }
                    }
                } else if value.contains(char::is_whitespace) || value.contains('"') {
                    warn("malformed value");
                    continue;
                } else {
                    value.to_string()
                };
                (name, value)
            };

            if loaded.state.set(name, value).is_some() {
                warn("overrides an earlier assignment");
            }
        }

        loaded
    }

    /// `# CONFIG_X is not set` -> `X`.
    fn parse_not_set<'a>(&self, comment: &'a str) -> Option<&'a str> {
        let name = comment
            .trim()
            .strip_suffix("is not set")?
            .trim_end()
            .strip_prefix(self.prefix.as_str())?;
        is_symbol_name(name).then_some(name)
    }

    /// Renders `state` in graph declaration order. Entries for symbols the
    /// graph does not define are dropped.
    pub fn render(&self, state: &ConfigState, graph: &Graph) -> String {
        let mut out = String::from("# Automatically generated file; DO NOT EDIT.\n");
        if let Some(title) = graph.title() {
            out.push_str(&format!("# {}\n", title));
        }
        out.push_str("#\n");

        for sym in graph.symbols() {
            let Some(raw) = state.get(&sym.name) else {
                continue;
            };
            let line = match sym.kind {
                SymbolType::Bool | SymbolType::Tristate if raw == "n" => {
                    format!("# {}{} is not set", self.prefix, sym.name)
                }
                SymbolType::String => format!("{}{}=\"{}\"", self.prefix, sym.name, escape(raw)),
                _ => format!("{}{}={}", self.prefix, sym.name, raw),
            };
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    /// Whole-file replace of `path`.
    pub fn save(&self, state: &ConfigState, graph: &Graph, path: &Path) -> Result<(), StateError> {
        write_atomic(path, &self.render(state, graph)).map_err(|source| StateError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn escape(s: &str) -> String {
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

fn unquote(s: &str) -> Option<String> {
    let mut chars = s.strip_prefix('"')?.chars();
    let mut out = String::new();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next()? {
                'n' => out.push('\n'),
                other => out.push(other),
            },
            '"' => return chars.as_str().trim().is_empty().then_some(out),
            c => out.push(c),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> Graph {
        Graph::parse(
            r#"
mainmenu "Demo"
config FEATURE_X
    bool "X"
config MODE
    tristate "Mode"
config NAME
    string "Name"
config LEVEL
    int "Level"
config BASE
    hex "Base"
"#,
            "Kconfig",
        )
        .unwrap()
    }

    #[test]
    fn test_parse_all_forms() {
        let loaded = ConfigStore::default().parse(
            "# header\n\nCONFIG_FEATURE_X=y\nCONFIG_MODE=m\n# CONFIG_OTHER is not set\nCONFIG_NAME=\"a \\\"b\\\" c\"\nCONFIG_LEVEL=7\n",
        );
        assert!(loaded.warnings.is_empty());
        let s = &loaded.state;
        assert_eq!(s.get("FEATURE_X"), Some("y"));
        assert_eq!(s.get("MODE"), Some("m"));
        assert_eq!(s.get("OTHER"), Some("n"));
        assert_eq!(s.get("NAME"), Some("a \"b\" c"));
        assert_eq!(s.get("LEVEL"), Some("7"));
    }

    #[test]
    fn test_malformed_line_is_skipped_with_warning() {
        let loaded = ConfigStore::default().parse("this is garbage\nCONFIG_FEATURE_X=y\n");
        assert_eq!(loaded.state.get("FEATURE_X"), Some("y"));
        assert_eq!(loaded.state.len(), 1);
        assert_eq!(loaded.warnings.len(), 1);
        assert_eq!(loaded.warnings[0].line, 1);
    }

    #[test]
    fn test_more_warnings() {
        let loaded = ConfigStore::default().parse(
            "FEATURE_X=y\nCONFIG_BAD-NAME=1\nCONFIG_NAME=\"open\nCONFIG_A=1\nCONFIG_A=2\nCONFIG_B=two words\n",
        );
        assert_eq!(loaded.warnings.len(), 5);
        assert_eq!(loaded.state.get("A"), Some("2"));
        assert_eq!(loaded.state.len(), 1);
    }

    #[test]
    fn test_custom_prefix() {
        let loaded = ConfigStore::new("KB_").parse("KB_FOO=y\nCONFIG_BAR=y\n# KB_BAZ is not set\n");
        assert_eq!(loaded.state.get("FOO"), Some("y"));
        assert_eq!(loaded.state.get("BAZ"), Some("n"));
        assert_eq!(loaded.warnings.len(), 1);
    }

    #[test]
    fn test_render_uses_declaration_order() {
        let mut state = ConfigState::new();
        state.set("LEVEL", "7");
        state.set("FEATURE_X", "n");
        state.set("NAME", "hi");
        state.set("UNKNOWN", "y");
        let text = ConfigStore::default().render(&state, &graph());
        assert_eq!(
            text,
            "# Automatically generated file; DO NOT EDIT.\n# Demo\n#\n# CONFIG_FEATURE_X is not set\nCONFIG_NAME=\"hi\"\nCONFIG_LEVEL=7\n"
        );
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".config");
        let mut state = ConfigState::new();
        state.set("FEATURE_X", "y");
        state.set("MODE", "n");
        state.set("NAME", "quote \" back\\slash\nnewline");
        state.set("LEVEL", "-3");
        state.set("BASE", "0x1f");

        let store = ConfigStore::default();
        store.save(&state, &graph(), &path).unwrap();
        let loaded = store.load(&path).unwrap();
        assert!(loaded.warnings.is_empty());
        assert_eq!(loaded.state, state);
    }

    #[test]
    fn test_retain_defined() {
        let mut state = ConfigState::new();
        state.set("FEATURE_X", "y");
        state.set("GONE", "y");
        assert_eq!(state.retain_defined(&graph()), vec!["GONE".to_string()]);
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let err = ConfigStore::default()
            .load(Path::new("/nonexistent/.config"))
            .unwrap_err();
        assert!(matches!(err, StateError::Read { .. }));
    }
}
