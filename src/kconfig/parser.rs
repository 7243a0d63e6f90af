//! Line-oriented parser for Kconfig definition files.
//!
//! Produces the flat symbol list (declaration order) and the presentation
//! tree of menus and comments. Enclosing `menu` / `if` conditions are folded
//! into each symbol's `depends_on` here, and `visible if` conditions into its
//! `prompt_condition`, so evaluation never has to look at the tree.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::LoadError;
use super::expr::{Expr, ExprParser, Token, is_symbol_name, tokenize};
use super::graph::MenuNode;
use super::symbol::{DefaultRule, Location, RangeRule, Symbol, SymbolType};

const UNSUPPORTED: &[&str] = &[
    "choice",
    "endchoice",
    "select",
    "imply",
    "option",
    "modules",
    "optional",
    "transitional",
];

/// Parser output before graph-level validation.
#[derive(Debug)]
pub struct Definitions {
    pub title: Option<String>,
    pub symbols: Vec<Symbol>,
    pub menu: Vec<MenuNode>,
}

struct SymbolBuilder {
    name: String,
    kind: Option<SymbolType>,
    prompt: Option<String>,
    defaults: Vec<DefaultRule>,
    depends_on: Option<Expr>,
    prompt_condition: Option<Expr>,
    ranges: Vec<RangeRule>,
    help: Option<String>,
    location: Location,
}

enum BlockKind {
    Root,
    Menu { title: String },
    If,
}

struct Block {
    kind: BlockKind,
    condition: Option<Expr>,
    visible: Option<Expr>,
    children: Vec<MenuNode>,
    opened_at: Location,
}

/// The entry that attribute lines currently attach to.
#[derive(Clone, Copy)]
enum Current {
    None,
    Symbol(usize),
    Menu,
    Comment,
}

struct Parser {
    root_dir: PathBuf,
    title: Option<String>,
    symbols: Vec<SymbolBuilder>,
    index: HashMap<String, usize>,
    blocks: Vec<Block>,
    include_stack: Vec<PathBuf>,
    current: Current,
}

/// Parses a definition file and everything it sources.
pub fn parse_file(path: &Path) -> Result<Definitions, LoadError> {
    if !path.exists() {
        return Err(LoadError::Missing {
            path: path.to_path_buf(),
        });
    }
    let content = read(path)?;
    parse_str(&content, path)
}

/// Parses definition text as if it were read from `file`.
pub fn parse_str(content: &str, file: &Path) -> Result<Definitions, LoadError> {
    let root_dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut parser = Parser {
        root_dir,
        title: None,
        symbols: Vec::new(),
        index: HashMap::new(),
        blocks: vec![Block {
            kind: BlockKind::Root,
            condition: None,
            visible: None,
            children: Vec::new(),
            opened_at: Location {
                file: file.to_path_buf(),
                line: 0,
            },
        }],
        include_stack: Vec::new(),
        current: Current::None,
    };
    parser.parse_source(content, file)?;
    parser.finish()
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn indent_of(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 8 } else { 1 })
        .sum()
}

impl Parser {
    fn syntax(&self, file: &Path, line: usize, message: impl Into<String>) -> LoadError {
        LoadError::Syntax {
            file: file.to_path_buf(),
            line,
            message: message.into(),
        }
    }

    fn parse_source(&mut self, content: &str, file: &Path) -> Result<(), LoadError> {
        let key = file.canonicalize().unwrap_or_else(|_| file.to_path_buf());
        if self.include_stack.contains(&key) {
            return Err(LoadError::SourceLoop {
                path: file.to_path_buf(),
            });
        }
        self.include_stack.push(key);

        let lines: Vec<&str> = content.lines().collect();
        let mut i = 0;
        while i < lines.len() {
            let lineno = i + 1;
            let first = lines[i];
            let mut logical = first.to_string();
            i += 1;
            while logical.trim_end().ends_with('\\') && i < lines.len() {
                let trimmed = logical.trim_end();
                logical = format!("{} {}", &trimmed[..trimmed.len() - 1], lines[i]);
                i += 1;
            }

            let tokens = tokenize(&logical).map_err(|m| self.syntax(file, lineno, m))?;
            let Some(Token::Word(keyword)) = tokens.first() else {
                if tokens.is_empty() {
                    continue;
                }
                return Err(self.syntax(file, lineno, "expected a keyword"));
            };

            if keyword == "help" || keyword == "---help---" {
                let Current::Symbol(idx) = self.current else {
                    return Err(self.syntax(file, lineno, "help text outside of a config entry"));
                };
                let (text, next) = collect_help(&lines, i, indent_of(first));
                self.symbols[idx].help = text;
                i = next;
                continue;
            }

            let loc = Location {
                file: file.to_path_buf(),
                line: lineno,
            };
            self.parse_line(keyword, &tokens[1..], &loc)?;
        }

        self.include_stack.pop();
        Ok(())
    }

    fn parse_line(&mut self, keyword: &str, rest: &[Token], loc: &Location) -> Result<(), LoadError> {
        let file = loc.file.as_path();
        let line = loc.line;
        let mut p = ExprParser::new(rest);

        if UNSUPPORTED.contains(&keyword) {
            return Err(LoadError::Unsupported {
                file: file.to_path_buf(),
                line,
                keyword: keyword.to_string(),
            });
        }

        match keyword {
            "mainmenu" => {
                let title = self.expect_string(&mut p, loc)?;
                self.title = Some(title);
                self.current = Current::None;
            }
            "menu" => {
                let title = self.expect_string(&mut p, loc)?;
                self.blocks.push(Block {
                    kind: BlockKind::Menu { title },
                    condition: None,
                    visible: None,
                    children: Vec::new(),
                    opened_at: loc.clone(),
                });
                self.current = Current::Menu;
            }
            "endmenu" => {
                self.close_block(loc, true)?;
                self.current = Current::None;
            }
            "if" => {
                let cond = p.parse_expr().map_err(|m| self.syntax(file, line, m))?;
                self.blocks.push(Block {
                    kind: BlockKind::If,
                    condition: Some(cond),
                    visible: None,
                    children: Vec::new(),
                    opened_at: loc.clone(),
                });
                self.current = Current::None;
            }
            "endif" => {
                self.close_block(loc, false)?;
                self.current = Current::None;
            }
            "comment" => {
                let text = self.expect_string(&mut p, loc)?;
                self.push_node(MenuNode::Comment {
                    text,
                    depends_on: Expr::and_opt(
                        self.inherited_condition(),
                        self.inherited_visibility(),
                    ),
                });
                self.current = Current::Comment;
            }
            "source" | "rsource" => {
                let target = self.expect_string(&mut p, loc)?;
                p.expect_end().map_err(|m| self.syntax(file, line, m))?;
                let base = if keyword == "source" {
                    self.root_dir.clone()
                } else {
                    file.parent().map(Path::to_path_buf).unwrap_or_default()
                };
                let path = base.join(target);
                if !path.exists() {
                    return Err(LoadError::Missing { path });
                }
                let content = read(&path)?;
                self.current = Current::None;
                self.parse_source(&content, &path)?;
                self.current = Current::None;
                return Ok(());
            }
            "config" | "menuconfig" => {
                let name = p
                    .next_word()
                    .filter(|w| is_symbol_name(w))
                    .ok_or_else(|| self.syntax(file, line, "expected a symbol name"))?
                    .to_string();
                if self.index.contains_key(&name) {
                    return Err(LoadError::DuplicateSymbol {
                        name,
                        file: file.to_path_buf(),
                        line,
                    });
                }
                let idx = self.symbols.len();
                self.index.insert(name.clone(), idx);
                self.symbols.push(SymbolBuilder {
                    name,
                    kind: None,
                    prompt: None,
                    defaults: Vec::new(),
                    depends_on: self.inherited_condition(),
                    prompt_condition: self.inherited_visibility(),
                    ranges: Vec::new(),
                    help: None,
                    location: loc.clone(),
                });
                self.push_node(MenuNode::Symbol(idx));
                self.current = Current::Symbol(idx);
            }
            "depends" => {
                if p.next_word() != Some("on") {
                    return Err(self.syntax(file, line, "expected 'depends on'"));
                }
                let cond = p.parse_expr().map_err(|m| self.syntax(file, line, m))?;
                self.add_condition(cond, loc)?;
            }
            "visible" => {
                if p.next_word() != Some("if") || !matches!(self.current, Current::Menu) {
                    return Err(self.syntax(file, line, "'visible if' is only valid on a menu"));
                }
                let cond = p.parse_expr().map_err(|m| self.syntax(file, line, m))?;
                if let Some(block) = self.blocks.last_mut() {
                    block.visible = Expr::and_opt(block.visible.take(), Some(cond));
                }
            }
            _ => {
                let idx = match self.current {
                    Current::Symbol(idx) => idx,
                    _ => {
                        return Err(self.syntax(
                            file,
                            line,
                            format!("unknown keyword or misplaced attribute '{}'", keyword),
                        ));
                    }
                };
                self.parse_attribute(idx, keyword, &mut p, loc)?;
            }
        }

        p.expect_end().map_err(|m| self.syntax(file, line, m))
    }

    fn parse_attribute(
        &mut self,
        idx: usize,
        keyword: &str,
        p: &mut ExprParser<'_>,
        loc: &Location,
    ) -> Result<(), LoadError> {
        let file = loc.file.as_path();
        let line = loc.line;
        let type_keyword = match keyword {
            "bool" | "boolean" | "def_bool" => Some(SymbolType::Bool),
            "tristate" | "def_tristate" => Some(SymbolType::Tristate),
            "string" => Some(SymbolType::String),
            "int" => Some(SymbolType::Int),
            "hex" => Some(SymbolType::Hex),
            _ => None,
        };

        if let Some(kind) = type_keyword {
            let sym = &self.symbols[idx];
            if let Some(existing) = sym.kind
                && existing != kind
            {
                return Err(self.syntax(
                    file,
                    line,
                    format!("type of {} redefined from {} to {}", sym.name, existing, kind),
                ));
            }
            self.symbols[idx].kind = Some(kind);

            if keyword.starts_with("def_") {
                let value = p.parse_expr().map_err(|m| self.syntax(file, line, m))?;
                let condition = p.parse_if_clause().map_err(|m| self.syntax(file, line, m))?;
                self.symbols[idx].defaults.push(DefaultRule { value, condition });
            } else if let Some(prompt) = p.next_string() {
                let condition = p.parse_if_clause().map_err(|m| self.syntax(file, line, m))?;
                self.set_prompt(idx, prompt.to_string(), condition);
            }
            return Ok(());
        }

        match keyword {
            "prompt" => {
                let prompt = self.expect_string(p, loc)?;
                let condition = p.parse_if_clause().map_err(|m| self.syntax(file, line, m))?;
                self.set_prompt(idx, prompt, condition);
            }
            "default" => {
                let value = p.parse_expr().map_err(|m| self.syntax(file, line, m))?;
                let condition = p.parse_if_clause().map_err(|m| self.syntax(file, line, m))?;
                self.symbols[idx].defaults.push(DefaultRule { value, condition });
            }
            "range" => {
                let low = p.parse_expr().map_err(|m| self.syntax(file, line, m))?;
                let high = p.parse_expr().map_err(|m| self.syntax(file, line, m))?;
                let condition = p.parse_if_clause().map_err(|m| self.syntax(file, line, m))?;
                self.symbols[idx].ranges.push(RangeRule {
                    low,
                    high,
                    condition,
                });
            }
            other => {
                return Err(self.syntax(file, line, format!("unknown attribute '{}'", other)));
            }
        }
        Ok(())
    }

    /// A prompt's `if` condition gates visibility like `depends on`.
    fn set_prompt(&mut self, idx: usize, prompt: String, condition: Option<Expr>) {
        let sym = &mut self.symbols[idx];
        sym.prompt = Some(prompt);
        sym.depends_on = Expr::and_opt(sym.depends_on.take(), condition);
    }

    fn add_condition(&mut self, cond: Expr, loc: &Location) -> Result<(), LoadError> {
        match self.current {
            Current::Symbol(idx) => {
                let sym = &mut self.symbols[idx];
                sym.depends_on = Expr::and_opt(sym.depends_on.take(), Some(cond));
            }
            Current::Menu => {
                if let Some(block) = self.blocks.last_mut() {
                    block.condition = Expr::and_opt(block.condition.take(), Some(cond));
                }
            }
            Current::Comment => {
                let comment = self
                    .blocks
                    .last_mut()
                    .and_then(|b| b.children.last_mut());
                if let Some(MenuNode::Comment { depends_on, .. }) = comment {
                    *depends_on = Expr::and_opt(depends_on.take(), Some(cond));
                }
            }
            Current::None => {
                return Err(self.syntax(&loc.file, loc.line, "'depends on' outside of an entry"));
            }
        }
        Ok(())
    }

    fn expect_string(&self, p: &mut ExprParser<'_>, loc: &Location) -> Result<String, LoadError> {
        p.next_string()
            .map(str::to_string)
            .ok_or_else(|| self.syntax(&loc.file, loc.line, "expected a quoted string"))
    }

    fn inherited_condition(&self) -> Option<Expr> {
        self.blocks
            .iter()
            .fold(None, |acc, b| Expr::and_opt(acc, b.condition.clone()))
    }

    fn inherited_visibility(&self) -> Option<Expr> {
        self.blocks
            .iter()
            .fold(None, |acc, b| Expr::and_opt(acc, b.visible.clone()))
    }

    fn push_node(&mut self, node: MenuNode) {
        if let Some(block) = self.blocks.last_mut() {
            block.children.push(node);
        }
    }

    fn close_block(&mut self, loc: &Location, menu: bool) -> Result<(), LoadError> {
        let matches = match self.blocks.last().map(|b| &b.kind) {
            Some(BlockKind::Menu { .. }) => menu,
            Some(BlockKind::If) => !menu,
            _ => false,
        };
        if !matches || self.blocks.len() < 2 {
            let what = if menu { "endmenu" } else { "endif" };
            return Err(self.syntax(&loc.file, loc.line, format!("unmatched '{}'", what)));
        }
        let Some(block) = self.blocks.pop() else {
            return Ok(());
        };
        match block.kind {
            BlockKind::Menu { title } => self.push_node(MenuNode::Menu {
                title,
                depends_on: block.condition,
                visible_if: block.visible,
                children: block.children,
            }),
            _ => {
                if let Some(parent) = self.blocks.last_mut() {
                    parent.children.extend(block.children);
                }
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Definitions, LoadError> {
        if self.blocks.len() > 1 {
            let open = &self.blocks[self.blocks.len() - 1];
            let what = match open.kind {
                BlockKind::If => "if",
                _ => "menu",
            };
            return Err(self.syntax(
                &open.opened_at.file,
                open.opened_at.line,
                format!("'{}' is never closed", what),
            ));
        }

        let mut symbols = Vec::with_capacity(self.symbols.len());
        for b in self.symbols {
            let Some(kind) = b.kind else {
                return Err(LoadError::Syntax {
                    file: b.location.file,
                    line: b.location.line,
                    message: format!("symbol {} has no type", b.name),
                });
            };
            symbols.push(Symbol {
                name: b.name,
                kind,
                prompt: b.prompt,
                defaults: b.defaults,
                depends_on: b.depends_on,
                prompt_condition: b.prompt_condition,
                ranges: b.ranges,
                help: b.help,
                location: b.location,
            });
        }

        let menu = self
            .blocks
            .pop()
            .map(|root| root.children)
            .unwrap_or_default();

        Ok(Definitions {
            title: self.title,
            symbols,
            menu,
        })
    }
}

/// Collects an indented help block starting at `start`. Returns the text and
/// the index of the first line after it.
fn collect_help(lines: &[&str], start: usize, keyword_indent: usize) -> (Option<String>, usize) {
    let mut i = start;
    while i < lines.len() && lines[i].trim().is_empty() {
        i += 1;
    }
    if i >= lines.len() || indent_of(lines[i]) <= keyword_indent {
        return (None, start);
    }

    let block_indent = indent_of(lines[i]);
    let mut text: Vec<String> = Vec::new();
    while i < lines.len() {
        let line = lines[i];
        if line.trim().is_empty() {
            text.push(String::new());
        } else if indent_of(line) >= block_indent {
            text.push(line.trim().to_string());
        } else {
            break;
        }
        i += 1;
    }
    while text.last().is_some_and(|l| l.is_empty()) {
        text.pop();
    }
    (Some(text.join("\n")), i)
}
