//! Symbol model: tristates, symbol types, values and the per-symbol rules
//! the evaluator consumes.

use std::fmt;
use std::path::PathBuf;

use super::expr::Expr;

/// Three-valued enable state with the total order `No < Module < Yes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Tristate {
    #[default]
    No,
    Module,
    Yes,
}

impl Tristate {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "n" => Some(Tristate::No),
            "m" => Some(Tristate::Module),
            "y" => Some(Tristate::Yes),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tristate::No => "n",
            Tristate::Module => "m",
            Tristate::Yes => "y",
        }
    }

    /// `!x` in Kconfig arithmetic: `y - x`.
    pub fn negate(self) -> Self {
        match self {
            Tristate::No => Tristate::Yes,
            Tristate::Module => Tristate::Module,
            Tristate::Yes => Tristate::No,
        }
    }

    pub fn from_bool(b: bool) -> Self {
        if b { Tristate::Yes } else { Tristate::No }
    }
}

impl fmt::Display for Tristate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolType {
    Bool,
    Tristate,
    String,
    Int,
    Hex,
}

impl SymbolType {
    pub fn is_tristate_like(&self) -> bool {
        matches!(self, SymbolType::Bool | SymbolType::Tristate)
    }

    /// Value an invisible symbol is forced to.
    pub fn inactive_value(&self) -> Value {
        match self {
            SymbolType::Bool | SymbolType::Tristate => Value::Tristate(Tristate::No),
            SymbolType::String => Value::String(String::new()),
            SymbolType::Int => Value::Int(0),
            SymbolType::Hex => Value::Hex(0),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SymbolType::Bool => "bool",
            SymbolType::Tristate => "tristate",
            SymbolType::String => "string",
            SymbolType::Int => "int",
            SymbolType::Hex => "hex",
        }
    }
}

impl fmt::Display for SymbolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value that always lies inside its symbol type's domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Tristate(Tristate),
    String(String),
    Int(i64),
    Hex(u64),
}

impl Value {
    /// Parses the raw (unquoted) form of a value for the given type.
    ///
    /// Bool symbols only accept `y` and `n`; `m` is a tristate-only value.
    pub fn parse(kind: SymbolType, raw: &str) -> Option<Self> {
        match kind {
            SymbolType::Bool => match Tristate::parse(raw)? {
                Tristate::Module => None,
                t => Some(Value::Tristate(t)),
            },
            SymbolType::Tristate => Tristate::parse(raw).map(Value::Tristate),
            SymbolType::String => Some(Value::String(raw.to_string())),
            SymbolType::Int => parse_int(raw).map(Value::Int),
            SymbolType::Hex => parse_hex(raw).map(Value::Hex),
        }
    }

    /// True for `n` and the empty string.
    pub fn is_inactive(&self) -> bool {
        match self {
            Value::Tristate(t) => *t == Tristate::No,
            Value::String(s) => s.is_empty(),
            Value::Int(_) | Value::Hex(_) => false,
        }
    }

    pub fn tristate(&self) -> Option<Tristate> {
        match self {
            Value::Tristate(t) => Some(*t),
            _ => None,
        }
    }

    /// Numeric view used by `range` checks and comparisons.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int(n) => Some(i128::from(*n)),
            Value::Hex(n) => Some(i128::from(*n)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Tristate(t) => write!(f, "{}", t),
            Value::String(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Hex(n) => write!(f, "0x{:x}", n),
        }
    }
}

pub fn parse_int(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

pub fn parse_hex(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Parses decimal or `0x` hex into a common numeric domain.
pub fn parse_number(raw: &str) -> Option<i128> {
    let raw = raw.trim();
    if raw.starts_with("0x") || raw.starts_with("0X") {
        parse_hex(raw).map(i128::from)
    } else {
        parse_int(raw).map(i128::from)
    }
}

/// Where a symbol was declared, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// One `default VALUE [if COND]` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultRule {
    pub value: Expr,
    pub condition: Option<Expr>,
}

/// One `range LOW HIGH [if COND]` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeRule {
    pub low: Expr,
    pub high: Expr,
    pub condition: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolType,
    pub prompt: Option<String>,
    pub defaults: Vec<DefaultRule>,
    /// Own `depends on` clauses AND-ed with every enclosing menu/if condition.
    pub depends_on: Option<Expr>,
    /// Enclosing `visible if` conditions. They hide the prompt only; the
    /// value still follows `depends_on` and the defaults.
    pub prompt_condition: Option<Expr>,
    pub ranges: Vec<RangeRule>,
    pub help: Option<String>,
    pub location: Location,
}

impl Symbol {
    /// Every symbol name this symbol's visibility, defaults or ranges read.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for cond in [&self.depends_on, &self.prompt_condition].into_iter().flatten() {
            cond.collect_symbols(&mut out);
        }
        for rule in &self.defaults {
            rule.value.collect_symbols(&mut out);
            if let Some(cond) = &rule.condition {
                cond.collect_symbols(&mut out);
            }
        }
        for range in &self.ranges {
            range.low.collect_symbols(&mut out);
            range.high.collect_symbols(&mut out);
            if let Some(cond) = &range.condition {
                cond.collect_symbols(&mut out);
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Symbols without a prompt are computed from their defaults and never
    /// read a stored value.
    pub fn is_editable(&self) -> bool {
        self.prompt.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tristate_order() {
        assert!(Tristate::No < Tristate::Module);
        assert!(Tristate::Module < Tristate::Yes);
        assert_eq!(Tristate::Module.negate(), Tristate::Module);
        assert_eq!(Tristate::Yes.negate(), Tristate::No);
    }

    #[test]
    fn test_bool_rejects_module() {
        assert_eq!(Value::parse(SymbolType::Bool, "m"), None);
        assert_eq!(
            Value::parse(SymbolType::Tristate, "m"),
            Some(Value::Tristate(Tristate::Module))
        );
    }

    #[test]
    fn test_numeric_parsing() {
        assert_eq!(Value::parse(SymbolType::Int, "-12"), Some(Value::Int(-12)));
        assert_eq!(Value::parse(SymbolType::Int, "0x10"), None);
        assert_eq!(Value::parse(SymbolType::Hex, "0x1F"), Some(Value::Hex(31)));
        assert_eq!(Value::parse(SymbolType::Hex, "ff"), Some(Value::Hex(255)));
        assert_eq!(Value::parse(SymbolType::Hex, "0x"), None);
        assert_eq!(Value::parse(SymbolType::Hex, "zz"), None);
    }

    #[test]
    fn test_hex_display_is_lowercase_prefixed() {
        assert_eq!(Value::Hex(0xABC).to_string(), "0xabc");
    }

    #[test]
    fn test_inactive_values() {
        assert!(SymbolType::Bool.inactive_value().is_inactive());
        assert!(SymbolType::String.inactive_value().is_inactive());
        assert!(!Value::Int(0).is_inactive());
    }
}
