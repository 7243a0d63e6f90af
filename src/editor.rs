//! Interactive editor adapter.
//!
//! The engine hands a [`Graph`] and a [`ConfigState`] to a [`ConfigEditor`]
//! and gets back the edited state (or `None` when the user declines). All
//! mutation goes through [`set_value`], which applies the same visibility
//! rules as resolution.

use anyhow::Result;
use colored::*;
use inquire::{Confirm, InquireError, Select, Text};
use std::fmt;

use crate::kconfig::{
    ConfigState, EditError, Graph, MenuNode, ResolvedGraph, Symbol, SymbolType, Tristate, Value,
};

pub trait ConfigEditor {
    /// Returns the edited state, or `None` if editing was declined.
    fn edit(&mut self, graph: &Graph, state: ConfigState) -> Result<Option<ConfigState>>;
}

/// Sets `name` to `raw` in `state`.
///
/// Refuses unknown and prompt-less symbols, symbols whose prompt is
/// currently hidden, and values the evaluator would not keep (wrong type,
/// outside an active range, or above the dependency limit of a tristate).
pub fn set_value(graph: &Graph, state: &mut ConfigState, name: &str, raw: &str) -> Result<(), EditError> {
    let sym = graph
        .symbol(name)
        .ok_or_else(|| EditError::UnknownSymbol(name.to_string()))?;
    if !sym.is_editable() {
        return Err(EditError::NotEditable(name.to_string()));
    }
    if !graph.resolve(state).is_editable(name) {
        return Err(EditError::Invisible(name.to_string()));
    }

    let invalid = || EditError::InvalidValue {
        name: name.to_string(),
        raw: raw.to_string(),
        kind: sym.kind,
    };
    let value = Value::parse(sym.kind, raw.trim()).ok_or_else(invalid)?;

    let mut candidate = state.clone();
    candidate.set(name, value.to_string());
    if graph.resolve(&candidate).value(name) != Some(&value) {
        return Err(invalid());
    }
    *state = candidate;
    Ok(())
}

/// Terminal editor built on `inquire`.
#[derive(Debug, Default)]
pub struct InquireEditor;

enum Entry {
    Symbol { name: String, label: String },
    Heading(String),
    Save,
    Discard,
}

impl Entry {
    fn is_selectable(&self) -> bool {
        !matches!(self, Entry::Heading(_))
    }
}

/// First selectable row at or after `from`, wrapping to the top.
fn next_selectable(selectable: &[bool], from: usize) -> usize {
    (from..selectable.len())
        .chain(0..from.min(selectable.len()))
        .find(|&i| selectable[i])
        .unwrap_or(0)
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Symbol { label, .. } | Entry::Heading(label) => f.write_str(label),
            Entry::Save => write!(f, "{}", "Save and exit".green().bold()),
            Entry::Discard => write!(f, "{}", "Exit without saving".red()),
        }
    }
}

impl ConfigEditor for InquireEditor {
    fn edit(&mut self, graph: &Graph, mut state: ConfigState) -> Result<Option<ConfigState>> {
        if !console::user_attended() {
            return Ok(None);
        }

        let title = graph.title().unwrap_or("Configuration").to_string();
        let mut cursor = 0;
        loop {
            let resolved = graph.resolve(&state);
            let mut entries = Vec::new();
            collect_entries(graph.menu(), graph, &resolved, 0, &mut entries);
            entries.push(Entry::Save);
            entries.push(Entry::Discard);
            let selectable: Vec<bool> = entries.iter().map(Entry::is_selectable).collect();
            cursor = next_selectable(&selectable, cursor);

            let picked = Select::new(&title, entries)
                .with_page_size(20)
                .with_starting_cursor(cursor)
                .with_help_message("↑↓ to move, enter to change, type to filter, esc to quit")
                .raw_prompt();

            let picked = match picked {
                Ok(p) => p,
                Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            };
            cursor = picked.index;

            match picked.value {
                Entry::Save => return Ok(Some(state)),
                Entry::Discard => return Ok(None),
                Entry::Heading(_) => cursor = next_selectable(&selectable, picked.index + 1),
                Entry::Symbol { name, .. } => {
                    let (Some(sym), Some(current)) = (graph.symbol(&name), resolved.value(&name))
                    else {
                        continue;
                    };
                    if let Some(raw) = prompt_value(sym, current)?
                        && let Err(e) = set_value(graph, &mut state, &name, &raw)
                    {
                        println!("{} {}", "x".red(), e);
                    }
                }
            }
        }
    }
}

fn collect_entries(
    nodes: &[MenuNode],
    graph: &Graph,
    resolved: &ResolvedGraph<'_>,
    depth: usize,
    out: &mut Vec<Entry>,
) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        match node {
            MenuNode::Symbol(idx) => {
                let sym = &graph.symbols()[*idx];
                let (Some(prompt), Some(value)) = (&sym.prompt, resolved.value(&sym.name)) else {
                    continue;
                };
                if !resolved.is_editable(&sym.name) {
                    continue;
                }
                out.push(Entry::Symbol {
                    name: sym.name.clone(),
                    label: format!("{}{} {}", indent, marker(sym.kind, value), prompt),
                });
            }
            MenuNode::Menu {
                title,
                depends_on,
                visible_if,
                children,
            } => {
                if depends_on
                    .iter()
                    .chain(visible_if)
                    .any(|c| c.eval(resolved) == Tristate::No)
                {
                    continue;
                }
                out.push(Entry::Heading(format!("{}--- {} ---", indent, title.bold())));
                collect_entries(children, graph, resolved, depth + 1, out);
            }
            MenuNode::Comment { text, depends_on } => {
                if depends_on
                    .as_ref()
                    .is_none_or(|c| c.eval(resolved) != Tristate::No)
                {
                    out.push(Entry::Heading(format!("{}*** {} ***", indent, text.dimmed())));
                }
            }
        }
    }
}

fn marker(kind: SymbolType, value: &Value) -> String {
    match (kind, value) {
        (SymbolType::Bool, Value::Tristate(Tristate::Yes)) => "[*]".green().to_string(),
        (SymbolType::Bool, _) => "[ ]".to_string(),
        (_, Value::Tristate(Tristate::Yes)) => "<*>".green().to_string(),
        (_, Value::Tristate(Tristate::Module)) => "<M>".cyan().to_string(),
        (_, Value::Tristate(Tristate::No)) => "< >".to_string(),
        (_, other) => format!("({})", other.to_string().yellow()),
    }
}

/// Asks for a new raw value. `None` when the prompt is cancelled.
fn prompt_value(sym: &Symbol, current: &Value) -> Result<Option<String>> {
    let prompt = sym.prompt.as_deref().unwrap_or(&sym.name);
    let help = sym.help.as_deref().unwrap_or("");

    let answer = match sym.kind {
        SymbolType::Bool => Confirm::new(prompt)
            .with_default(current == &Value::Tristate(Tristate::Yes))
            .with_help_message(help)
            .prompt()
            .map(|yes| if yes { "y" } else { "n" }.to_string()),
        SymbolType::Tristate => {
            let options = vec!["y", "m", "n"];
            let start = match current.tristate() {
                Some(Tristate::Yes) => 0,
                Some(Tristate::Module) => 1,
                _ => 2,
            };
            Select::new(prompt, options)
                .with_starting_cursor(start)
                .with_help_message(help)
                .prompt()
                .map(str::to_string)
        }
        SymbolType::String | SymbolType::Int | SymbolType::Hex => {
            let initial = current.to_string();
            Text::new(prompt)
                .with_initial_value(&initial)
                .with_help_message(help)
                .prompt()
        }
    };

    match answer {
        Ok(raw) => Ok(Some(raw)),
        Err(InquireError::OperationCanceled) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
