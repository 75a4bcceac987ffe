//! SQL text normalization and log layouts.
//!
//! The same normalized text is sent to the server and written to the log;
//! the layout only changes how the log entry looks.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Inner width of the `pretty` box.
const BOX_WIDTH: usize = 60;

static KEYWORD_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s+(INNER\s+JOIN|LEFT\s+JOIN|RIGHT\s+JOIN|GROUP\s+BY|ORDER\s+BY|SELECT|FROM|WHERE|JOIN|HAVING|LIMIT|OFFSET)\s+",
    )
    .expect("keyword pattern is valid")
});

/// Clauses whose line is pulled back one level.
const DEDENT_BEFORE: [&str; 5] = ["FROM", "WHERE", "GROUP BY", "ORDER BY", "HAVING"];

/// Clauses after which following lines are indented one level.
const INDENT_AFTER: [&str; 10] = [
    "SELECT",
    "FROM",
    "WHERE",
    "JOIN",
    "INNER JOIN",
    "LEFT JOIN",
    "RIGHT JOIN",
    "GROUP BY",
    "ORDER BY",
    "HAVING",
];

/// Log layout for executed statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlLogFormat {
    /// Single line with inline parameters.
    Compact,
    /// Keyword-per-line with indentation.
    #[default]
    Formatted,
    /// Formatted text drawn inside a box.
    Pretty,
}

impl FromStr for SqlLogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(SqlLogFormat::Compact),
            "formatted" => Ok(SqlLogFormat::Formatted),
            "pretty" => Ok(SqlLogFormat::Pretty),
            other => Err(format!("unknown SQL log format: {}", other)),
        }
    }
}

impl fmt::Display for SqlLogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlLogFormat::Compact => write!(f, "compact"),
            SqlLogFormat::Formatted => write!(f, "formatted"),
            SqlLogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

/// Normalizes statement text: literal `\n` escapes become spaces,
/// whitespace runs collapse to one space, ends are trimmed.
pub fn normalize_sql(sql: &str) -> String {
    sql.replace("\\n", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Breaks normalized SQL onto one line per major clause and indents it.
pub fn format_sql(sql: &str) -> String {
    let broken = KEYWORD_BREAK.replace_all(sql, |caps: &Captures| {
        let keyword = caps[1].split_whitespace().collect::<Vec<_>>().join(" ");
        format!("\n{} ", keyword.to_uppercase())
    });

    let mut indent = 0usize;
    let mut lines = Vec::new();
    for line in broken.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if starts_with_clause(line, &DEDENT_BEFORE) {
            indent = indent.saturating_sub(1);
        }
        lines.push(format!("{}{}", "  ".repeat(indent), line));
        if starts_with_clause(line, &INDENT_AFTER) {
            indent += 1;
        }
    }
    lines.join("\n")
}

fn starts_with_clause(line: &str, clauses: &[&str]) -> bool {
    let upper = line.to_ascii_uppercase();
    clauses.iter().any(|clause| {
        upper
            .strip_prefix(clause)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '))
    })
}

/// Renders one log entry for an executed statement.
///
/// `sql` must already be normalized; `params` are shown as a JSON array.
pub fn render_sql_log(
    format: SqlLogFormat,
    timestamp: &str,
    sql: &str,
    params: &[serde_json::Value],
) -> String {
    let params_json = serde_json::Value::Array(params.to_vec()).to_string();
    match format {
        SqlLogFormat::Compact => {
            if params.is_empty() {
                format!("[{}] SQL: {}", timestamp, sql)
            } else {
                format!("[{}] SQL: {} | Params: {}", timestamp, sql, params_json)
            }
        }
        SqlLogFormat::Formatted => {
            let mut out = format!("[{}] Executing SQL:\n{}", timestamp, format_sql(sql));
            if !params.is_empty() {
                out.push_str(&format!("\nParameters: {}", params_json));
            }
            out
        }
        SqlLogFormat::Pretty => {
            let mut body: Vec<String> = format_sql(sql).lines().map(String::from).collect();
            if !params.is_empty() {
                body.push(format!("Parameters: {}", params_json));
            }
            let mut out = format!("[{}] SQL QUERY:\n┌{}┐\n", timestamp, "─".repeat(BOX_WIDTH));
            for line in body.iter().flat_map(|l| wrap_chars(l, BOX_WIDTH - 2)) {
                out.push_str(&format!("│ {:<width$} │\n", line, width = BOX_WIDTH - 2));
            }
            out.push_str(&format!("└{}┘", "─".repeat(BOX_WIDTH)));
            out
        }
    }
}

/// Splits `line` into chunks of at most `width` characters.
fn wrap_chars(line: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars.chunks(width).map(|c| c.iter().collect()).collect()
}
