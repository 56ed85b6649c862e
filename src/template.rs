//! Rendering of the documentation page.
//!
//! The page is the bundled `templates/index.html`; placeholders of the form
//! `{{ name }}` are filled in a single pass so substituted values are never
//! re-scanned for placeholders.

use regex::{Captures, Regex};
use std::sync::OnceLock;

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_]+)\s*\}\}").expect("placeholder pattern is valid")
    })
}

/// Escape text for an HTML text node or attribute value
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Make JSON safe to place inside a `<script>` element.
///
/// `<`, `>` and `&` only occur inside JSON strings, where their `\u` escapes
/// decode to the same text.
pub fn escape_script_json(json: &str) -> String {
    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render the documentation page
pub fn render_index(index_title: &str, static_url: &str, json_spec: &str) -> String {
    placeholder()
        .replace_all(INDEX_TEMPLATE, |caps: &Captures| match &caps[1] {
            "index_title" => escape_html(index_title),
            "STATIC_URL" => escape_html(static_url),
            "json_spec" => escape_script_json(json_spec),
            _ => caps[0].to_string(),
        })
        .into_owned()
}
