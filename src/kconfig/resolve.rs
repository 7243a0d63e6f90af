//! Evaluator: assigns every symbol its final value for a given state.

use super::error::TypeMismatch;
use super::expr::SymbolValues;
use super::graph::Graph;
use super::state::ConfigState;
use super::symbol::{RangeRule, Symbol, SymbolType, Tristate, Value, parse_number};

/// Values being filled in evaluation order.
struct Partial<'a> {
    graph: &'a Graph,
    slots: &'a [Option<Value>],
}

impl SymbolValues for Partial<'_> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.graph
            .index_of(name)
            .and_then(|i| self.slots[i].as_ref())
    }
}

/// A graph after every symbol has been assigned its value for one state.
#[derive(Debug, Clone)]
pub struct ResolvedGraph<'g> {
    graph: &'g Graph,
    values: Vec<Value>,
    visibility: Vec<Tristate>,
    editable: Vec<bool>,
    mismatches: Vec<TypeMismatch>,
}

/// One symbol of a resolved graph, in declaration order.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedSymbol<'a> {
    pub symbol: &'a Symbol,
    pub value: &'a Value,
    pub visible: bool,
    /// Visible with a shown prompt, so the stored value is honoured.
    pub editable: bool,
}

impl ResolvedSymbol<'_> {
    /// Visible and not `n` / empty.
    pub fn is_active(&self) -> bool {
        self.visible && !self.value.is_inactive()
    }
}

impl Graph {
    /// Resolves every symbol against `state`.
    ///
    /// Visible symbols take the stored value when it is type-valid (and
    /// inside an active `range`), else the first default whose condition
    /// holds, else the type's zero value. Invisible symbols are forced to the
    /// inactive value whatever the state says.
    ///
    /// Only symbols with a shown prompt read the state. Prompt-less symbols
    /// and those under a failing `visible if` always take their defaults.
    pub fn resolve(&self, state: &ConfigState) -> ResolvedGraph<'_> {
        let n = self.len();
        let mut slots: Vec<Option<Value>> = vec![None; n];
        let mut visibility = vec![Tristate::No; n];
        let mut editable = vec![false; n];
        let mut mismatches = Vec::new();

        for &idx in self.evaluation_order() {
            let sym = &self.symbols()[idx];
            let env = Partial {
                graph: self,
                slots: &slots,
            };

            let vis = sym
                .depends_on
                .as_ref()
                .map_or(Tristate::Yes, |e| e.eval(&env));

            let prompt_shown = vis != Tristate::No
                && sym.is_editable()
                && sym
                    .prompt_condition
                    .as_ref()
                    .is_none_or(|c| c.eval(&env) != Tristate::No);

            let value = if vis == Tristate::No {
                sym.kind.inactive_value()
            } else {
                let range = active_range(sym, &env);
                let raw = if prompt_shown { state.get(&sym.name) } else { None };
                let stored = raw.and_then(|raw| {
                    let parsed = Value::parse(sym.kind, raw).filter(|v| in_range(v, range));
                    if parsed.is_none() {
                        mismatches.push(TypeMismatch {
                            name: sym.name.clone(),
                            raw: raw.to_string(),
                            expected: sym.kind,
                        });
                    }
                    parsed
                });
                let value = stored
                    .or_else(|| default_value(sym, &env, range))
                    .unwrap_or_else(|| sym.kind.inactive_value());
                cap_to_visibility(sym.kind, value, vis)
            };

            visibility[idx] = vis;
            editable[idx] = prompt_shown;
            slots[idx] = Some(value);
        }

        let values = slots
            .into_iter()
            .zip(self.symbols())
            .map(|(slot, sym)| slot.unwrap_or_else(|| sym.kind.inactive_value()))
            .collect();

        ResolvedGraph {
            graph: self,
            values,
            visibility,
            editable,
            mismatches,
        }
    }
}

fn default_value(sym: &Symbol, env: &dyn SymbolValues, range: Option<(i128, i128)>) -> Option<Value> {
    for rule in &sym.defaults {
        let cond = rule
            .condition
            .as_ref()
            .map_or(Tristate::Yes, |c| c.eval(env));
        if cond == Tristate::No {
            continue;
        }
        return match sym.kind {
            SymbolType::Bool => match rule.value.eval(env) {
                Tristate::No => Some(Value::Tristate(Tristate::No)),
                _ => Some(Value::Tristate(Tristate::Yes)),
            },
            SymbolType::Tristate => Some(Value::Tristate(rule.value.eval(env).min(cond))),
            SymbolType::String => Some(Value::String(rule.value.operand(env))),
            SymbolType::Int | SymbolType::Hex => {
                numeric_value(sym.kind, &rule.value.operand(env)).map(|v| clamp(v, range))
            }
        };
    }
    None
}

/// Numeric defaults may come from a symbol of the other numeric type.
fn numeric_value(kind: SymbolType, raw: &str) -> Option<Value> {
    let n = parse_number(raw)?;
    match kind {
        SymbolType::Int => i64::try_from(n).ok().map(Value::Int),
        SymbolType::Hex => u64::try_from(n).ok().map(Value::Hex),
        _ => None,
    }
}

fn active_range(sym: &Symbol, env: &dyn SymbolValues) -> Option<(i128, i128)> {
    if !matches!(sym.kind, SymbolType::Int | SymbolType::Hex) {
        return None;
    }
    let rule: &RangeRule = sym.ranges.iter().find(|r| {
        r.condition
            .as_ref()
            .is_none_or(|c| c.eval(env) != Tristate::No)
    })?;
    let low = parse_number(&rule.low.operand(env))?;
    let high = parse_number(&rule.high.operand(env))?;
    Some((low, high))
}

fn in_range(value: &Value, range: Option<(i128, i128)>) -> bool {
    match (value.as_i128(), range) {
        (Some(v), Some((low, high))) => low <= v && v <= high,
        _ => true,
    }
}

fn clamp(value: Value, range: Option<(i128, i128)>) -> Value {
    let Some((low, high)) = range else {
        return value;
    };
    if low > high {
        return value;
    }
    match value {
        Value::Int(n) => Value::Int(
            i64::try_from(i128::from(n).clamp(low, high)).unwrap_or(n),
        ),
        Value::Hex(n) => Value::Hex(
            u64::try_from(i128::from(n).clamp(low, high)).unwrap_or(n),
        ),
        other => other,
    }
}

/// A tristate can never exceed the value of its dependencies. Bools have no
/// `m`, so an `m` dependency leaves them free.
fn cap_to_visibility(kind: SymbolType, value: Value, vis: Tristate) -> Value {
    match value {
        Value::Tristate(t) if kind == SymbolType::Tristate => Value::Tristate(t.min(vis)),
        other => other,
    }
}

impl<'g> ResolvedGraph<'g> {
    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// Values in declaration order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.graph.index_of(name).map(|i| &self.values[i])
    }

    pub fn is_visible(&self, name: &str) -> bool {
        self.graph
            .index_of(name)
            .is_some_and(|i| self.visibility[i] != Tristate::No)
    }

    /// Whether the user may set `name` right now.
    pub fn is_editable(&self, name: &str) -> bool {
        self.graph.index_of(name).is_some_and(|i| self.editable[i])
    }

    /// Stored values that were rejected during resolution.
    pub fn mismatches(&self) -> &[TypeMismatch] {
        &self.mismatches
    }

    pub fn iter(&self) -> impl Iterator<Item = ResolvedSymbol<'_>> {
        self.graph
            .symbols()
            .iter()
            .enumerate()
            .map(|(i, symbol)| ResolvedSymbol {
                symbol,
                value: &self.values[i],
                visible: self.visibility[i] != Tristate::No,
                editable: self.editable[i],
            })
    }

    /// The state that reproduces this resolution: one entry per editable
    /// symbol. Computed values are left out so they track their defaults.
    pub fn to_state(&self) -> ConfigState {
        let mut state = ConfigState::new();
        for entry in self.iter().filter(|e| e.editable) {
            state.set(&entry.symbol.name, entry.value.to_string());
        }
        state
    }
}

impl SymbolValues for ResolvedGraph<'_> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.value(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
config FEATURE_X
    bool "Feature X"
    default n

config FEATURE_X_LEVEL
    int "Feature X level"
    default 3
    depends on FEATURE_X
"#;

    fn graph(src: &str) -> Graph {
        Graph::parse(src, "Kconfig").unwrap()
    }

    fn state(pairs: &[(&str, &str)]) -> ConfigState {
        let mut s = ConfigState::new();
        for (k, v) in pairs {
            s.set(k, v.to_string());
        }
        s
    }

    #[test]
    fn test_empty_state_uses_defaults() {
        let g = graph(SCENARIO);
        let r = g.resolve(&ConfigState::new());
        assert_eq!(r.value("FEATURE_X"), Some(&Value::Tristate(Tristate::No)));
        assert!(!r.is_visible("FEATURE_X_LEVEL"));
        assert_eq!(r.value("FEATURE_X_LEVEL"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_stored_values_win_when_visible() {
        let g = graph(SCENARIO);
        let r = g.resolve(&state(&[("FEATURE_X", "y"), ("FEATURE_X_LEVEL", "7")]));
        assert_eq!(r.value("FEATURE_X"), Some(&Value::Tristate(Tristate::Yes)));
        assert_eq!(r.value("FEATURE_X_LEVEL"), Some(&Value::Int(7)));
        assert!(r.mismatches().is_empty());
    }

    #[test]
    fn test_invisible_symbols_ignore_state() {
        let g = graph(SCENARIO);
        let r = g.resolve(&state(&[("FEATURE_X", "n"), ("FEATURE_X_LEVEL", "7")]));
        assert_eq!(r.value("FEATURE_X_LEVEL"), Some(&Value::Int(0)));
        assert!(!r.iter().nth(1).unwrap().is_active());
    }

    #[test]
    fn test_type_mismatch_falls_back_to_default() {
        let g = graph(SCENARIO);
        let r = g.resolve(&state(&[("FEATURE_X", "y"), ("FEATURE_X_LEVEL", "lots")]));
        assert_eq!(r.value("FEATURE_X_LEVEL"), Some(&Value::Int(3)));
        assert_eq!(r.mismatches().len(), 1);
        assert_eq!(r.mismatches()[0].name, "FEATURE_X_LEVEL");
    }

    #[test]
    fn test_unknown_state_entries_are_ignored() {
        let g = graph(SCENARIO);
        let r = g.resolve(&state(&[("REMOVED_LONG_AGO", "y")]));
        assert_eq!(r.to_state().get("REMOVED_LONG_AGO"), None);
    }

    #[test]
    fn test_first_true_default_wins() {
        let g = graph(
            r#"
config FAST
    bool "Fast"
config BUF
    int "Buffer"
    default 4096 if FAST
    default 512
config NAME
    string "Name"
    default "turbo" if FAST
    default "plain"
"#,
        );
        let slow = g.resolve(&ConfigState::new());
        assert_eq!(slow.value("BUF"), Some(&Value::Int(512)));
        assert_eq!(slow.value("NAME"), Some(&Value::String("plain".into())));
        let fast = g.resolve(&state(&[("FAST", "y")]));
        assert_eq!(fast.value("BUF"), Some(&Value::Int(4096)));
        assert_eq!(fast.value("NAME"), Some(&Value::String("turbo".into())));
    }

    #[test]
    fn test_default_from_other_symbol() {
        let g = graph(
            "config BASE\n hex \"Base\"\n default 0x100\nconfig COPY\n int \"Copy\"\n default BASE\n",
        );
        let r = g.resolve(&ConfigState::new());
        assert_eq!(r.value("COPY"), Some(&Value::Int(256)));
    }

    #[test]
    fn test_range_rejects_stored_and_clamps_default() {
        let g = graph("config N\n int \"N\"\n default 50\n range 1 10\n");
        let r = g.resolve(&state(&[("N", "11")]));
        assert_eq!(r.value("N"), Some(&Value::Int(10)));
        assert_eq!(r.mismatches().len(), 1);
        let r = g.resolve(&state(&[("N", "4")]));
        assert_eq!(r.value("N"), Some(&Value::Int(4)));
    }

    #[test]
    fn test_tristate_capped_by_module_dependency() {
        let g = graph(
            "config DRIVERS\n tristate \"Drivers\"\nconfig UART\n tristate \"UART\"\n default y\n depends on DRIVERS\n",
        );
        let r = g.resolve(&state(&[("DRIVERS", "m")]));
        assert_eq!(r.value("UART"), Some(&Value::Tristate(Tristate::Module)));
    }

    #[test]
    fn test_bool_default_from_module_promotes() {
        let g = graph("config T\n tristate \"T\"\n default m\nconfig B\n bool \"B\"\n default T\n");
        let r = g.resolve(&ConfigState::new());
        assert_eq!(r.value("B"), Some(&Value::Tristate(Tristate::Yes)));
        let r = g.resolve(&state(&[("B", "m")]));
        assert_eq!(r.mismatches().len(), 1);
    }

    #[test]
    fn test_promptless_symbol_ignores_stored_value() {
        let g = graph("config COMPUTED\n bool\n default y\nconfig SIZE\n int\n default 64\n");
        let r = g.resolve(&state(&[("COMPUTED", "n"), ("SIZE", "8")]));
        assert_eq!(r.value("COMPUTED"), Some(&Value::Tristate(Tristate::Yes)));
        assert_eq!(r.value("SIZE"), Some(&Value::Int(64)));
        assert!(r.mismatches().is_empty());
        assert!(!r.is_editable("COMPUTED"));
        assert!(r.to_state().is_empty());
    }

    #[test]
    fn test_visible_if_keeps_defaults_and_ignores_state() {
        let g = graph(
            r#"
config SHOW
    bool "Show"
menu "Hidden"
    visible if SHOW
config INNER
    bool "Inner"
    default y
endmenu
"#,
        );
        let hidden = g.resolve(&state(&[("INNER", "n")]));
        assert!(hidden.is_visible("INNER"));
        assert!(!hidden.is_editable("INNER"));
        assert_eq!(hidden.value("INNER"), Some(&Value::Tristate(Tristate::Yes)));
        assert_eq!(hidden.to_state().get("INNER"), None);

        let shown = g.resolve(&state(&[("SHOW", "y"), ("INNER", "n")]));
        assert!(shown.is_editable("INNER"));
        assert_eq!(shown.value("INNER"), Some(&Value::Tristate(Tristate::No)));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let g = graph(SCENARIO);
        let st = state(&[("FEATURE_X", "y"), ("FEATURE_X_LEVEL", "7"), ("OLD", "1")]);
        let first = g.resolve(&st);
        let second = first.graph().resolve(&st);
        assert_eq!(first.values(), second.values());
        let third = g.resolve(&first.to_state());
        assert_eq!(first.values(), third.values());
    }
}
