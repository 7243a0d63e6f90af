//! Symbol graph: validated symbols in declaration order plus the evaluation
//! order derived from their references.

use std::collections::HashMap;
use std::path::Path;

use super::error::LoadError;
use super::expr::Expr;
use super::parser::{self, Definitions};
use super::symbol::{Symbol, SymbolType, Value};

/// Presentation tree. Grouping never affects evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuNode {
    Menu {
        title: String,
        depends_on: Option<Expr>,
        /// `visible if`: hides the menu without touching its symbols' values.
        visible_if: Option<Expr>,
        children: Vec<MenuNode>,
    },
    Symbol(usize),
    Comment {
        text: String,
        depends_on: Option<Expr>,
    },
}

#[derive(Debug, Clone)]
pub struct Graph {
    title: Option<String>,
    symbols: Vec<Symbol>,
    index: HashMap<String, usize>,
    menu: Vec<MenuNode>,
    /// `edges[i]` lists the symbols symbol `i` reads.
    edges: Vec<Vec<usize>>,
    order: Vec<usize>,
}

impl Graph {
    /// Loads a definition file, following `source` directives.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        Self::from_definitions(parser::parse_file(path)?)
    }

    /// Builds a graph from in-memory definition text. `file` names the
    /// source for diagnostics and anchors relative `source` paths.
    pub fn parse(content: &str, file: impl AsRef<Path>) -> Result<Self, LoadError> {
        Self::from_definitions(parser::parse_str(content, file.as_ref())?)
    }

    fn from_definitions(defs: Definitions) -> Result<Self, LoadError> {
        let Definitions {
            title,
            symbols,
            menu,
        } = defs;

        let index: HashMap<String, usize> = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();

        let mut edges = Vec::with_capacity(symbols.len());
        for sym in &symbols {
            let mut deps = Vec::new();
            for name in sym.references() {
                let Some(&idx) = index.get(name) else {
                    return Err(LoadError::UndefinedSymbol {
                        name: name.to_string(),
                        referenced_by: sym.name.clone(),
                    });
                };
                deps.push(idx);
            }
            validate_defaults(sym)?;
            edges.push(deps);
        }
        check_menu_references(&menu, &index)?;

        let order = evaluation_order(&symbols, &edges)?;

        Ok(Self {
            title,
            symbols,
            index,
            menu,
            edges,
            order,
        })
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Symbols in declaration order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.index.get(name).map(|&i| &self.symbols[i])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn menu(&self) -> &[MenuNode] {
        &self.menu
    }

    /// Symbol indices such that every symbol comes after the symbols it reads.
    pub fn evaluation_order(&self) -> &[usize] {
        &self.order
    }

    /// Names of symbols whose visibility, defaults or ranges read `name`.
    pub fn referenced_by(&self, name: &str) -> Vec<&str> {
        let Some(target) = self.index_of(name) else {
            return Vec::new();
        };
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, deps)| deps.contains(&target))
            .map(|(i, _)| self.symbols[i].name.as_str())
            .collect()
    }
}

/// Constant defaults on value-typed symbols must parse; expressions there
/// must be a single constant or symbol.
fn validate_defaults(sym: &Symbol) -> Result<(), LoadError> {
    if sym.kind.is_tristate_like() {
        return Ok(());
    }
    let invalid = |value: String| LoadError::InvalidDefault {
        name: sym.name.clone(),
        value,
        kind: sym.kind,
    };

    let operands = sym
        .defaults
        .iter()
        .map(|d| &d.value)
        .chain(sym.ranges.iter().flat_map(|r| [&r.low, &r.high]));
    for expr in operands {
        match expr {
            Expr::Symbol(_) => {}
            Expr::Const(s) => {
                if sym.kind != SymbolType::String && Value::parse(sym.kind, s).is_none() {
                    return Err(invalid(s.clone()));
                }
            }
            Expr::Tri(_) if sym.kind == SymbolType::String => {}
            other => return Err(invalid(other.to_string())),
        }
    }
    Ok(())
}

fn check_menu_references(
    nodes: &[MenuNode],
    index: &HashMap<String, usize>,
) -> Result<(), LoadError> {
    for node in nodes {
        let (label, conds, children) = match node {
            MenuNode::Menu {
                title,
                depends_on,
                visible_if,
                children,
            } => (
                title,
                depends_on.iter().chain(visible_if).collect::<Vec<_>>(),
                Some(children),
            ),
            MenuNode::Comment { text, depends_on } => (text, depends_on.iter().collect(), None),
            MenuNode::Symbol(_) => continue,
        };
        let mut names = Vec::new();
        for cond in conds {
            cond.collect_symbols(&mut names);
        }
        if let Some(missing) = names.into_iter().find(|n| !index.contains_key(*n)) {
            return Err(LoadError::UndefinedSymbol {
                name: missing.to_string(),
                referenced_by: format!("\"{}\"", label),
            });
        }
        if let Some(children) = children {
            check_menu_references(children, index)?;
        }
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    New,
    Active,
    Done,
}

/// Iterative depth-first post-order over the reference edges. A back edge is
/// a cycle and is reported as the chain of names that forms it.
fn evaluation_order(symbols: &[Symbol], edges: &[Vec<usize>]) -> Result<Vec<usize>, LoadError> {
    let mut marks = vec![Mark::New; symbols.len()];
    let mut order = Vec::with_capacity(symbols.len());

    for start in 0..symbols.len() {
        if marks[start] != Mark::New {
            continue;
        }
        marks[start] = Mark::Active;
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let Some(&dep) = edges[node].get(frame.1) else {
                marks[node] = Mark::Done;
                order.push(node);
                stack.pop();
                continue;
            };
            frame.1 += 1;

            match marks[dep] {
                Mark::New => {
                    marks[dep] = Mark::Active;
                    stack.push((dep, 0));
                }
                Mark::Active => {
                    let from = stack.iter().position(|&(n, _)| n == dep).unwrap_or(0);
                    let mut chain: Vec<String> = stack[from..]
                        .iter()
                        .map(|&(n, _)| symbols[n].name.clone())
                        .collect();
                    chain.push(symbols[dep].name.clone());
                    return Err(LoadError::Cycle { chain });
                }
                Mark::Done => {}
            }
        }
    }

    Ok(order)
}
