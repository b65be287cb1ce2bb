//! Email body rendering: placeholder substitution and markdown to HTML.

use pulldown_cmark::{escape, html, Options, Parser};
use serde_json::{Map, Value};

const MARKDOWN_MARKER: &str = "md:";

/// Values substituted into admin notification templates.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderValues<'a> {
    pub event: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub data: Option<&'a Map<String, Value>>,
    /// Fully built accept URL, if one can be built.
    pub accept_url: Option<&'a str>,
}

/// A body rendered as plain text and HTML.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedBody {
    pub text: String,
    pub html: String,
}

/// Builds `{app_url}/#/event-accept?token=...`, or `None` without a base URL or token.
pub fn accept_url(app_url: &str, token: &str) -> Option<String> {
    let base = app_url.trim().trim_end_matches('/');
    if base.is_empty() || token.is_empty() {
        return None;
    }
    Some(format!("{}/#/event-accept?token={}", base, token))
}

/// HTML escaping for text interpolated into markup and double-quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    // Writing into a String cannot fail.
    let _ = escape::escape_html(&mut out, input);
    out
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn render_data(data: Option<&Map<String, Value>>, separator: &str, escape: bool) -> String {
    let Some(data) = data else {
        return String::new();
    };

    let mut keys: Vec<&String> = data.keys().collect();
    keys.sort();

    keys.into_iter()
        .map(|key| {
            let value = stringify(&data[key.as_str()]);
            if escape {
                format!("{}: {}", escape_html(key), escape_html(&value))
            } else {
                format!("{}: {}", key, value)
            }
        })
        .collect::<Vec<_>>()
        .join(separator)
}

fn accept_button_html(url: &str) -> String {
    format!(
        r#"<a href="{}" style="display:inline-block;padding:10px 16px;background:#000;color:#fff;text-decoration:none;border-radius:6px">Accetta</a>"#,
        escape_html(url)
    )
}

fn substitute(raw: &str, pairs: &[(&str, String)]) -> String {
    pairs
        .iter()
        .fold(raw.to_string(), |acc, (placeholder, value)| {
            acc.replace(placeholder, value)
        })
}

/// Substitutes placeholders for a plain-text rendition.
pub fn render_placeholders_text(raw: &str, values: &PlaceholderValues<'_>) -> String {
    if raw.is_empty() {
        return String::new();
    }
    substitute(
        raw,
        &[
            ("[event]", values.event.to_string()),
            ("[name]", values.name.to_string()),
            ("[email]", values.email.to_string()),
            ("[data]", render_data(values.data, "\n", false)),
            (
                "[accept_button]",
                values.accept_url.unwrap_or_default().to_string(),
            ),
        ],
    )
}

/// Substitutes placeholders for an HTML rendition. Interpolated values are escaped.
pub fn render_placeholders_html(raw: &str, values: &PlaceholderValues<'_>) -> String {
    if raw.is_empty() {
        return String::new();
    }
    substitute(
        raw,
        &[
            ("[event]", escape_html(values.event)),
            ("[name]", escape_html(values.name)),
            ("[email]", escape_html(values.email)),
            ("[data]", render_data(values.data, "<br>", true)),
            (
                "[accept_button]",
                values.accept_url.map(accept_button_html).unwrap_or_default(),
            ),
        ],
    )
}

/// Strips the optional `md:` marker and surrounding whitespace.
pub fn strip_marker(body: &str) -> &str {
    let clean = body.trim();
    match clean.strip_prefix(MARKDOWN_MARKER) {
        Some(rest) => rest.trim(),
        None => clean,
    }
}

/// Converts markdown to HTML. Inline HTML is passed through.
pub fn markdown_to_html(input: &str) -> String {
    let parser = Parser::new_ext(input, Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES);
    let mut out = String::with_capacity(input.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Renders a template body into its text and HTML parts.
pub fn render_body(body: &str) -> RenderedBody {
    let clean = strip_marker(body);
    if clean.is_empty() {
        return RenderedBody::default();
    }
    RenderedBody {
        text: clean.to_string(),
        html: markdown_to_html(clean),
    }
}

/// Renders separately substituted text and HTML sources.
pub fn render_bodies(text_source: &str, html_source: &str) -> RenderedBody {
    RenderedBody {
        text: render_body(text_source).text,
        html: render_body(html_source).html,
    }
}
