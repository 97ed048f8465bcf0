//! The error banner printed to stderr: a banner line, the previous source
//! line (if any), the offending line, a tilde-caret pointer, the message,
//! and the following source line (if any).

use crate::error::Error;

/// Renders `err` against the original `source` text and writes it to
/// stderr.
pub fn report(source: &str, err: &Error) {
    eprintln!("{}", render(source, err));
}

pub fn render(source: &str, err: &Error) -> String {
    let (line, column) = err.position();
    let lines: Vec<&str> = source.lines().collect();
    let index = line.saturating_sub(1);

    let mut out = String::new();
    out.push_str(&format!("error: {}\n", err.message()));
    out.push_str(&format!("  --> line {line}, column {column}\n"));

    if index > 0 {
        if let Some(prev) = lines.get(index - 1) {
            out.push_str(&format!("{:>4} | {}\n", index, prev));
        }
    }
    if let Some(current) = lines.get(index) {
        out.push_str(&format!("{:>4} | {}\n", line, current));
    }
    let caret_column = column.max(1) - 1;
    out.push_str(&format!("     | {}^\n", " ".repeat(caret_column)));
    out.push_str(&format!("     | {}\n", err.message()));
    if let Some(next) = lines.get(index + 1) {
        out.push_str(&format!("{:>4} | {}\n", line + 1, next));
    }
    out
}
