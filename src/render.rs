//! Leaderboard rendering
//!
//! Text for the terminal, a self-refreshing HTML page for the venue screen,
//! and JSON for anything else.

use crate::error::Result;
use crate::ranking::{RankingLogEntry, Standing};
use clap::ValueEnum;
use std::fmt::Write as _;

/// Seconds between automatic reloads of the HTML page
pub const HTML_REFRESH_SECS: u32 = 300;

const COLUMNS: [&str; 12] = [
    "User",
    "Fix Gold",
    "Fix Silver",
    "Fix Bronze",
    "Fix Other",
    "Scr Gold",
    "Scr Silver",
    "Scr Bronze",
    "Scr Other",
    "Suspicious",
    "Other",
    "Total",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Html,
    Json,
}

pub fn render(standings: &[Standing], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(standings)),
        OutputFormat::Html => Ok(render_html(standings)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(standings)?),
    }
}

fn counters(s: &Standing) -> [u64; 11] {
    let r = &s.row;
    [
        r.gold_fix,
        r.silver_fix,
        r.bronze_fix,
        r.other_fix,
        r.gold_scr,
        r.silver_scr,
        r.bronze_scr,
        r.other_scr,
        r.suspicious,
        r.other,
        s.score,
    ]
}

/// Fixed-width table, one participant per line
pub fn render_text(standings: &[Standing]) -> String {
    let name_width = standings
        .iter()
        .map(|s| s.row.name.chars().count())
        .chain(std::iter::once(COLUMNS[0].chars().count()))
        .max()
        .unwrap_or(4);

    let mut out = String::new();
    let _ = write!(out, "{:<width$}", COLUMNS[0], width = name_width);
    for title in &COLUMNS[1..] {
        let _ = write!(out, "  {:>10}", title);
    }
    out.push('\n');

    for standing in standings {
        let _ = write!(out, "{:<width$}", standing.row.name, width = name_width);
        for value in counters(standing) {
            let _ = write!(out, "  {:>10}", value);
        }
        out.push('\n');
    }
    out
}

/// Standalone HTML page with a periodic meta refresh
pub fn render_html(standings: &[Standing]) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    let _ = writeln!(
        out,
        "<meta http-equiv=\"refresh\" content=\"{}\">",
        HTML_REFRESH_SECS
    );
    out.push_str("<meta charset=\"utf-8\">\n<title>Hackathon Ranking</title>\n</head>\n<body>\n");
    out.push_str("<h1>Hackathon Ranking</h1>\n<table border=\"1\">\n<tr>");
    for title in &COLUMNS {
        let _ = write!(out, "<th>{}</th>", title);
    }
    out.push_str("</tr>\n");

    for standing in standings {
        let _ = write!(out, "<tr><td>{}</td>", escape_html(&standing.row.name));
        for value in counters(standing) {
            let _ = write!(out, "<td>{}</td>", value);
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n</body>\n</html>\n");
    out
}

/// Ranking log as `name bug status` lines
pub fn render_log(entries: &[RankingLogEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}\t{}\t{}\n", e.name, e.bug_id, e.status))
        .collect()
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::{leaderboard, RankingRow};
    use crate::types::{BugId, Category, EvaluationTier};

    fn standings() -> Vec<Standing> {
        let mut alice = RankingRow::new("alice@example.com");
        alice.gold_fix = 1;
        let mut mallory = RankingRow::new("<mallory>");
        mallory.other_scr = 2;
        leaderboard(vec![mallory, alice])
    }

    #[test]
    fn test_text_table() {
        let text = render_text(&standings());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("User"));
        assert!(lines[0].ends_with("Total"));
        assert!(lines[1].starts_with("alice@example.com"));
        assert!(lines[1].ends_with("100"));
        assert!(lines[2].ends_with("20"));
    }

    #[test]
    fn test_text_table_aligns_non_ascii_names() {
        let mut jose = RankingRow::new("José Müller-Lüdenscheidt");
        jose.gold_fix = 1;
        let plain = RankingRow::new("bob");
        let text = render_text(&leaderboard(vec![jose, plain]));
        let widths: Vec<usize> = text.lines().map(|l| l.chars().count()).collect();
        assert_eq!(widths.len(), 3);
        assert!(widths.iter().all(|w| *w == widths[0]));
    }

    #[test]
    fn test_html_page() {
        let html = render_html(&standings());
        assert!(html.contains("<title>Hackathon Ranking</title>"));
        assert!(html.contains("content=\"300\""));
        assert!(html.contains("<th>Fix Gold</th>"));
        assert!(html.contains("<th>Total</th>"));
        assert!(html.contains("<td>&lt;mallory&gt;</td>"));
        assert!(!html.contains("<mallory>"));
        assert!(html.find("alice").unwrap() < html.find("mallory").unwrap());
    }

    #[test]
    fn test_json_includes_score() {
        let json = render(&standings(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["name"], "alice@example.com");
        assert_eq!(value[0]["score"], 100);
        assert_eq!(value[1]["other_scr"], 2);
    }

    #[test]
    fn test_log_lines() {
        let entries = vec![RankingLogEntry::new(
            "alice",
            BugId(42),
            Category::Fix,
            EvaluationTier::Silver,
        )];
        assert_eq!(render_log(&entries), "alice\t42\tSILVER,FIX\n");
    }
}
