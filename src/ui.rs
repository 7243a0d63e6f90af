//! Terminal output.
//!
//! Status printers share one glyph vocabulary: `::` step headers, `✓`
//! success, `!` warnings, `x` errors. [`Table`] renders box-drawn tables
//! sized to the terminal, used by `kb config`.

use colored::*;
use std::cmp;

pub fn header(message: &str) {
    println!("\n{} {}", "::".cyan().bold(), message.bold());
}

pub fn info(message: &str) {
    println!("   {}", message);
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn warn(message: &str) {
    println!("{} {}", "!".yellow(), message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", "x".red(), message);
}

pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Rows with the wrong number of cells are ignored.
    pub fn add_row(&mut self, row: Vec<String>) {
        if row.len() == self.headers.len() {
            self.rows.push(row);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn print(&self) {
        let (_, term_width) = console::Term::stdout().size();
        print!("{}", self.render(term_width as usize));
    }

    /// Lays the table out within `max_width` columns, shrinking the widest
    /// column first (never below 8).
    pub fn render(&self, max_width: usize) -> String {
        if self.headers.is_empty() {
            return String::new();
        }

        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = cmp::max(widths[i], console::measure_text_width(&flatten(cell)));
            }
        }

        let overhead = 3 + 3 * widths.len();
        let budget = max_width.saturating_sub(overhead);
        let mut total: usize = widths.iter().sum();
        while total > budget {
            let Some((idx, &widest)) = widths.iter().enumerate().max_by_key(|(_, w)| **w) else {
                break;
            };
            if widest <= 8 {
                break;
            }
            widths[idx] -= 1;
            total -= 1;
        }

        let rule = |left: &str, mid: &str, right: &str| {
            let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("  {}{}{}\n", left, segments.join(mid), right)
        };
        let line = |cells: &[String], bold: bool| {
            let mut s = String::from("  │");
            for (cell, &width) in cells.iter().zip(&widths) {
                let text = console::truncate_str(&flatten(cell), width, "...").to_string();
                let pad = width.saturating_sub(console::measure_text_width(&text));
                let text = if bold { text.bold().to_string() } else { text };
                s.push_str(&format!(" {}{} │", text, " ".repeat(pad)));
            }
            s.push('\n');
            s
        };

        let mut out = rule("┌", "┬", "┐");
        out.push_str(&line(&self.headers, true));
        out.push_str(&rule("├", "┼", "┤"));
        for row in &self.rows {
            out.push_str(&line(row, false));
        }
        out.push_str(&rule("└", "┴", "┘"));
        out
    }
}

fn flatten(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_layout() {
        colored::control::set_override(false);
        let mut table = Table::new(&["Option", "Value"]);
        table.add_row(vec!["CONFIG_A".into(), "y".into()]);
        table.add_row(vec!["ignored".into()]);
        let out = table.render(80);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "  ┌──────────┬───────┐");
        assert_eq!(lines[3], "  │ CONFIG_A │ y     │");
    }

    #[test]
    fn test_render_shrinks_to_width() {
        colored::control::set_override(false);
        let mut table = Table::new(&["Option", "Value"]);
        table.add_row(vec!["CONFIG_SOMETHING_VERY_LONG_INDEED".into(), "1".into()]);
        for line in table.render(30).lines() {
            assert!(console::measure_text_width(line) <= 30, "{line}");
        }
    }
}
