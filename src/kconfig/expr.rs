//! Dependency/default expressions: tokenizer, recursive-descent parser and
//! tristate evaluator.
//!
//! ## Grammar
//!
//! ```text
//! expr    := and ( "||" and )*
//! and     := not ( "&&" not )*
//! not     := "!" not | cmp
//! cmp     := primary ( ("=" | "!=" | "<" | ">" | "<=" | ">=") primary )?
//! primary := "(" expr ")" | SYMBOL | y | m | n | "string" | NUMBER
//! ```
//!
//! `&&` is min, `||` is max and `!x` is `y - x`. Evaluation runs left to
//! right and short-circuits: `&&` stops on `n`, `||` stops on `y`.

use std::cmp::Ordering;
use std::fmt;

use super::symbol::{Tristate, Value, parse_number};

/// Read access to symbol values during evaluation.
pub trait SymbolValues {
    fn lookup(&self, name: &str) -> Option<&Value>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn holds(&self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Neq => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Neq => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Tristate constant `y`, `m` or `n`.
    Tri(Tristate),
    /// Quoted string or numeric literal.
    Const(String),
    Symbol(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn and(a: Expr, b: Expr) -> Expr {
        Expr::And(Box::new(a), Box::new(b))
    }

    /// AND-combines an optional accumulated condition with another one.
    pub fn and_opt(a: Option<Expr>, b: Option<Expr>) -> Option<Expr> {
        match (a, b) {
            (Some(a), Some(b)) => Some(Expr::and(a, b)),
            (a, None) => a,
            (None, b) => b,
        }
    }

    pub fn eval(&self, env: &dyn SymbolValues) -> Tristate {
        match self {
            Expr::Tri(t) => *t,
            Expr::Const(s) => Tristate::parse(s).unwrap_or(Tristate::No),
            Expr::Symbol(name) => env
                .lookup(name)
                .and_then(Value::tristate)
                .unwrap_or(Tristate::No),
            Expr::Not(e) => e.eval(env).negate(),
            Expr::And(a, b) => {
                let left = a.eval(env);
                if left == Tristate::No {
                    return Tristate::No;
                }
                left.min(b.eval(env))
            }
            Expr::Or(a, b) => {
                let left = a.eval(env);
                if left == Tristate::Yes {
                    return Tristate::Yes;
                }
                left.max(b.eval(env))
            }
            Expr::Compare(op, a, b) => {
                let left = a.operand(env);
                let right = b.operand(env);
                let ord = match (parse_number(&left), parse_number(&right)) {
                    (Some(l), Some(r)) => l.cmp(&r),
                    _ => left.cmp(&right),
                };
                Tristate::from_bool(op.holds(ord))
            }
        }
    }

    /// String form of an expression used as a value (defaults, ranges,
    /// comparison operands).
    pub fn operand(&self, env: &dyn SymbolValues) -> String {
        match self {
            Expr::Tri(t) => t.as_str().to_string(),
            Expr::Const(s) => s.clone(),
            Expr::Symbol(name) => env.lookup(name).map(|v| v.to_string()).unwrap_or_default(),
            other => other.eval(env).as_str().to_string(),
        }
    }

    pub fn collect_symbols<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Tri(_) | Expr::Const(_) => {}
            Expr::Symbol(name) => out.push(name),
            Expr::Not(e) => e.collect_symbols(out),
            Expr::And(a, b) | Expr::Or(a, b) | Expr::Compare(_, a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Tri(t) => write!(f, "{}", t),
            Expr::Const(s) if parse_number(s).is_some() => f.write_str(s),
            Expr::Const(s) => write!(f, "\"{}\"", s),
            Expr::Symbol(name) => f.write_str(name),
            Expr::Not(e) => match e.as_ref() {
                Expr::And(..) | Expr::Or(..) => write!(f, "!({})", e),
                _ => write!(f, "!{}", e),
            },
            Expr::And(a, b) => {
                fmt_operand(f, a)?;
                f.write_str(" && ")?;
                fmt_operand(f, b)
            }
            Expr::Or(a, b) => write!(f, "{} || {}", a, b),
            Expr::Compare(op, a, b) => {
                fmt_compared(f, a)?;
                f.write_str(op.symbol())?;
                fmt_compared(f, b)
            }
        }
    }
}

/// Comparison operands bind tighter than every logical operator.
fn fmt_compared(f: &mut fmt::Formatter<'_>, e: &Expr) -> fmt::Result {
    match e {
        Expr::And(..) | Expr::Or(..) | Expr::Not(..) | Expr::Compare(..) => write!(f, "({})", e),
        _ => write!(f, "{}", e),
    }
}

fn fmt_operand(f: &mut fmt::Formatter<'_>, e: &Expr) -> fmt::Result {
    if matches!(e, Expr::Or(..)) {
        write!(f, "({})", e)
    } else {
        write!(f, "{}", e)
    }
}

// --- Tokenizer ---

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Word(String),
    Str(String),
    And,
    Or,
    Not,
    Cmp(CmpOp),
    LParen,
    RParen,
}

/// Splits one logical definition line into tokens. A `#` outside a quoted
/// string ends the line.
pub fn tokenize(line: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\r' => {
                chars.next();
            }
            '#' => break,
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut s = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    if c == '\\' {
                        match chars.next() {
                            Some(escaped) => s.push(escaped),
                            None => break,
                        }
                    } else if c == quote {
                        closed = true;
                        break;
                    } else {
                        s.push(c);
                    }
                }
                if !closed {
                    return Err("unterminated string literal".to_string());
                }
                tokens.push(Token::Str(s));
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '&' => {
                chars.next();
                if chars.next() != Some('&') {
                    return Err("expected '&&'".to_string());
                }
                tokens.push(Token::And);
            }
            '|' => {
                chars.next();
                if chars.next() != Some('|') {
                    return Err("expected '||'".to_string());
                }
                tokens.push(Token::Or);
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Cmp(CmpOp::Neq));
                } else {
                    tokens.push(Token::Not);
                }
            }
            '=' => {
                chars.next();
                tokens.push(Token::Cmp(CmpOp::Eq));
            }
            '<' | '>' => {
                chars.next();
                let or_equal = chars.peek() == Some(&'=');
                if or_equal {
                    chars.next();
                }
                let op = match (c, or_equal) {
                    ('<', false) => CmpOp::Lt,
                    ('<', true) => CmpOp::Le,
                    ('>', false) => CmpOp::Gt,
                    _ => CmpOp::Ge,
                };
                tokens.push(Token::Cmp(op));
            }
            c if is_word_char(c) => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if !is_word_char(c) {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }

    Ok(tokens)
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

pub fn is_symbol_name(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// --- Parser ---

/// Cursor over a token slice. Expressions stop at the first token that
/// cannot continue them (e.g. a trailing `if`), leaving it for the caller.
pub struct ExprParser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> ExprParser<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn next_word(&mut self) -> Option<&'t str> {
        match self.tokens.get(self.pos) {
            Some(Token::Word(w)) => {
                self.pos += 1;
                Some(w)
            }
            _ => None,
        }
    }

    pub fn next_string(&mut self) -> Option<&'t str> {
        match self.tokens.get(self.pos) {
            Some(Token::Str(s)) => {
                self.pos += 1;
                Some(s)
            }
            _ => None,
        }
    }

    /// Consumes a trailing `if EXPR` clause when present.
    pub fn parse_if_clause(&mut self) -> Result<Option<Expr>, String> {
        if matches!(self.peek(), Some(Token::Word(w)) if w == "if") {
            self.pos += 1;
            return self.parse_expr().map(Some);
        }
        Ok(None)
    }

    pub fn expect_end(&self) -> Result<(), String> {
        match self.peek() {
            None => Ok(()),
            Some(tok) => Err(format!("unexpected trailing token {:?}", tok)),
        }
    }

    pub fn parse_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, String> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_cmp()
    }

    fn parse_cmp(&mut self) -> Result<Expr, String> {
        let left = self.parse_primary()?;
        if let Some(Token::Cmp(op)) = self.peek() {
            let op = *op;
            self.pos += 1;
            let right = self.parse_primary()?;
            return Ok(Expr::Compare(op, Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        let tok = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| "unexpected end of expression".to_string())?;
        self.pos += 1;
        match tok {
            Token::LParen => {
                let inner = self.parse_expr()?;
                if self.peek() != Some(&Token::RParen) {
                    return Err("missing ')'".to_string());
                }
                self.pos += 1;
                Ok(inner)
            }
            Token::Str(s) => Ok(Expr::Const(s.clone())),
            Token::Word(w) => word_to_expr(w),
            other => Err(format!("unexpected token {:?}", other)),
        }
    }
}

fn word_to_expr(word: &str) -> Result<Expr, String> {
    if let Some(t) = Tristate::parse(word) {
        return Ok(Expr::Tri(t));
    }
    if parse_number(word).is_some() {
        return Ok(Expr::Const(word.to_string()));
    }
    if word == "if" || !is_symbol_name(word) {
        return Err(format!("'{}' is not a valid symbol name", word));
    }
    Ok(Expr::Symbol(word.to_string()))
}

/// Parses a complete expression string.
pub fn parse(src: &str) -> Result<Expr, String> {
    let tokens = tokenize(src)?;
    let mut parser = ExprParser::new(&tokens);
    let expr = parser.parse_expr()?;
    parser.expect_end()?;
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Env(HashMap<String, Value>);

    impl SymbolValues for Env {
        fn lookup(&self, name: &str) -> Option<&Value> {
            self.0.get(name)
        }
    }

    fn env(pairs: &[(&str, Value)]) -> Env {
        Env(pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect())
    }

    #[test]
    fn test_precedence() {
        let e = parse("A || B && !C").unwrap();
        assert_eq!(
            e,
            Expr::Or(
                Box::new(Expr::Symbol("A".into())),
                Box::new(Expr::And(
                    Box::new(Expr::Symbol("B".into())),
                    Box::new(Expr::Not(Box::new(Expr::Symbol("C".into()))))
                ))
            )
        );
    }

    #[test]
    fn test_tristate_arithmetic() {
        let e = env(&[
            ("A", Value::Tristate(Tristate::Yes)),
            ("B", Value::Tristate(Tristate::Module)),
        ]);
        assert_eq!(parse("A && B").unwrap().eval(&e), Tristate::Module);
        assert_eq!(parse("!B || n").unwrap().eval(&e), Tristate::Module);
        assert_eq!(parse("!A").unwrap().eval(&e), Tristate::No);
        assert_eq!(parse("(A || B) && y").unwrap().eval(&e), Tristate::Yes);
    }

    #[test]
    fn test_non_bool_symbols_are_n_in_bool_context() {
        let e = env(&[("S", Value::String("y".into())), ("I", Value::Int(3))]);
        assert_eq!(parse("S").unwrap().eval(&e), Tristate::No);
        assert_eq!(parse("I").unwrap().eval(&e), Tristate::No);
    }

    #[test]
    fn test_comparisons() {
        let e = env(&[
            ("LEVEL", Value::Int(7)),
            ("BASE", Value::Hex(0x10)),
            ("NAME", Value::String("esp".into())),
        ]);
        assert_eq!(parse("LEVEL > 3").unwrap().eval(&e), Tristate::Yes);
        assert_eq!(parse("LEVEL <= 6").unwrap().eval(&e), Tristate::No);
        assert_eq!(parse("BASE = 16").unwrap().eval(&e), Tristate::Yes);
        assert_eq!(parse("NAME = \"esp\"").unwrap().eval(&e), Tristate::Yes);
        assert_eq!(parse("NAME != \"esp\"").unwrap().eval(&e), Tristate::No);
    }

    #[test]
    fn test_short_circuit_leaves_unknown_symbols_untouched() {
        let e = env(&[]);
        assert_eq!(parse("n && MISSING").unwrap().eval(&e), Tristate::No);
        assert_eq!(parse("y || MISSING").unwrap().eval(&e), Tristate::Yes);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("A &&").is_err());
        assert!(parse("(A || B").is_err());
        assert!(parse("A & B").is_err());
        assert!(parse("\"open").is_err());
        assert!(parse("A B").is_err());
    }

    #[test]
    fn test_if_clause_is_left_for_caller() {
        let tokens = tokenize("FOO if BAR && BAZ # trailing").unwrap();
        let mut p = ExprParser::new(&tokens);
        assert_eq!(p.parse_expr().unwrap(), Expr::Symbol("FOO".into()));
        let cond = p.parse_if_clause().unwrap().unwrap();
        assert_eq!(cond.to_string(), "BAR && BAZ");
        assert!(p.is_done());
    }

    #[test]
    fn test_display_round_trips_through_parser() {
        let src = "!(A || B) && C=\"x\"";
        let parsed = parse(src).unwrap();
        assert_eq!(parse(&parsed.to_string()).unwrap(), parsed);
    }

    #[test]
    fn test_compound_comparison_operands_keep_parentheses() {
        for src in ["(A || B) = y", "(A && B) != n", "!A = m"] {
            let parsed = parse(src).unwrap();
            assert_eq!(parse(&parsed.to_string()).unwrap(), parsed, "{}", src);
        }
        assert_eq!(parse("(A || B) = y").unwrap().to_string(), "(A || B)=y");
        assert_eq!(parse("(!A) = y").unwrap().to_string(), "(!A)=y");
    }
}
