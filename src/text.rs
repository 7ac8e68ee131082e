use once_cell::sync::Lazy;
use regex::Regex;

use crate::ir::{Person, TreeNode};
use crate::text_metrics;

/// Card text longer than this is cut and suffixed with an ellipsis.
pub const MAX_TEXT_CHARS: usize = 33;
const ELLIPSIS: &str = "...";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Truncates to [`MAX_TEXT_CHARS`] characters (plus `...`) and upper-cases.
pub fn valid_text(text: &str) -> String {
    if text.chars().count() > MAX_TEXT_CHARS {
        let mut cut: String = text.chars().take(MAX_TEXT_CHARS).collect();
        cut.push_str(ELLIPSIS);
        return cut.to_uppercase();
    }
    text.to_uppercase()
}

/// `valid_text` for optional fields; missing values render blank.
pub fn valid_optional_text(text: Option<&str>) -> String {
    text.map(valid_text).unwrap_or_default()
}

/// `"<count> <label>"`, or just the count without a label. Blank for zero.
pub fn report_text(person: &Person) -> String {
    if person.total_reports == 0 {
        return String::new();
    }
    match person.label.as_deref().map(str::trim) {
        Some(label) if !label.is_empty() => format!("{} {}", person.total_reports, label),
        _ => person.total_reports.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Pointer,
    Default,
}

impl Cursor {
    pub fn as_str(self) -> &'static str {
        match self {
            Cursor::Pointer => "pointer",
            Cursor::Default => "default",
        }
    }
}

pub fn cursor_for_node(node: &TreeNode) -> Cursor {
    if node.is_expandable() {
        Cursor::Pointer
    } else {
        Cursor::Default
    }
}

/// Font size stepping down as the text gets longer.
pub fn resize_font(text: &str) -> f32 {
    match text.chars().count() {
        0..=15 => 14.0,
        16..=25 => 12.0,
        len if len >= 50 => 8.0,
        _ => 10.0,
    }
}

/// Greedy word wrap against measured text width. A single word wider than
/// `max_width` keeps its own line.
pub fn wrap_text(text: &str, max_width: f32, font_size: f32, font_family: &str) -> Vec<String> {
    let normalized = WHITESPACE.replace_all(text.trim(), " ");
    if normalized.is_empty() {
        return Vec::new();
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in normalized.split(' ') {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if text_metrics::text_width(&candidate, font_size, font_family) > max_width {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_text_and_uppercases() {
        let long = "Richard Alexander Lozada Vilchez the Third";
        let out = valid_text(long);
        assert_eq!(out, "RICHARD ALEXANDER LOZADA VILCHEZ ...");
        assert_eq!(out.chars().count(), MAX_TEXT_CHARS + ELLIPSIS.len());
        assert!(out.starts_with(&long[..MAX_TEXT_CHARS].to_uppercase()));
    }

    #[test]
    fn short_text_is_only_uppercased() {
        assert_eq!(valid_text("IT Specialist"), "IT SPECIALIST");
        let exact: String = "a".repeat(MAX_TEXT_CHARS);
        assert_eq!(valid_text(&exact), "A".repeat(MAX_TEXT_CHARS));
    }

    #[test]
    fn missing_optional_text_is_blank() {
        assert_eq!(valid_optional_text(None), "");
        assert_eq!(valid_optional_text(Some("Chile")), "CHILE");
    }

    #[test]
    fn report_text_uses_label() {
        let mut person = Person::new("Kerry");
        person.total_reports = 3;
        person.label = Some("colaboradores".to_string());
        assert_eq!(report_text(&person), "3 colaboradores");

        person.label = None;
        assert_eq!(report_text(&person), "3");

        person.total_reports = 0;
        person.label = Some("colaboradores".to_string());
        assert_eq!(report_text(&person), "");
    }

    #[test]
    fn cursor_reflects_expandability() {
        let mut node = TreeNode::new("1", Person::new("A"));
        assert_eq!(cursor_for_node(&node), Cursor::Default);
        node.has_child = true;
        assert_eq!(cursor_for_node(&node).as_str(), "pointer");
    }

    #[test]
    fn font_steps_down_with_length() {
        assert_eq!(resize_font("short"), 14.0);
        assert_eq!(resize_font(&"x".repeat(20)), 12.0);
        assert_eq!(resize_font(&"x".repeat(30)), 10.0);
        assert_eq!(resize_font(&"x".repeat(60)), 8.0);
    }

    #[test]
    fn wrap_keeps_all_words_in_order() {
        let lines = wrap_text("CUSTOMER SUCCESS   DIRECTOR OF THINGS", 60.0, 10.0, "sans-serif");
        assert!(lines.len() > 1);
        assert_eq!(lines.join(" "), "CUSTOMER SUCCESS DIRECTOR OF THINGS");
        assert!(wrap_text("   ", 60.0, 10.0, "sans-serif").is_empty());
    }
}
