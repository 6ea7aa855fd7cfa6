//! Structured rich text to HTML
//!
//! Body content arrives as a flat list of block nodes, each carrying its text
//! and a list of inline spans addressed by UTF-16 offsets. This renderer is the
//! only place that produces markup from CMS text, so every piece of text goes
//! through `html_escape` here and is trusted as-is afterwards.

use serde::{Deserialize, Serialize};

use crate::helpers::html_escape;

/// A block-level rich text node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextNode {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub spans: Vec<Span>,

    /// Image source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Image alt text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,

    /// Embed payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oembed: Option<serde_json::Value>,
}

impl RichTextNode {
    /// Create a text node of the given type
    pub fn text(kind: &str, text: &str) -> Self {
        Self {
            kind: kind.to_string(),
            text: text.to_string(),
            spans: Vec::new(),
            url: None,
            alt: None,
            oembed: None,
        }
    }

    /// Add an inline span
    pub fn with_span(mut self, span: Span) -> Self {
        self.spans.push(span);
        self
    }
}

/// An inline formatting span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Span {
    pub fn new(kind: &str, start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            kind: kind.to_string(),
            data: None,
        }
    }

    fn open_tag(&self) -> String {
        match self.kind.as_str() {
            "strong" => "<strong>".to_string(),
            "em" => "<em>".to_string(),
            "hyperlink" => {
                let data = self.data.as_ref();
                let href = data
                    .and_then(|d| d.get("url"))
                    .and_then(|u| u.as_str())
                    .filter(|u| is_safe_href(u));
                let target = data
                    .and_then(|d| d.get("target"))
                    .and_then(|t| t.as_str())
                    .map(|t| {
                        format!(r#" target="{}" rel="noopener noreferrer""#, html_escape(t))
                    })
                    .unwrap_or_default();
                match href {
                    Some(href) => format!(r#"<a href="{}"{}>"#, html_escape(href), target),
                    None => "<a>".to_string(),
                }
            }
            "label" => {
                let label = self
                    .data
                    .as_ref()
                    .and_then(|d| d.get("label"))
                    .and_then(|l| l.as_str())
                    .unwrap_or("");
                format!(r#"<span class="{}">"#, html_escape(label))
            }
            _ => "<span>".to_string(),
        }
    }

    fn close_tag(&self) -> &'static str {
        match self.kind.as_str() {
            "strong" => "</strong>",
            "em" => "</em>",
            "hyperlink" => "</a>",
            _ => "</span>",
        }
    }
}

/// Renders rich text nodes to HTML
#[derive(Debug, Clone, Default)]
pub struct RichTextRenderer;

impl RichTextRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render a sequence of block nodes
    pub fn render(&self, nodes: &[RichTextNode]) -> String {
        let mut html = String::new();
        let mut open_list: Option<&'static str> = None;

        for node in nodes {
            let list = match node.kind.as_str() {
                "list-item" => Some("ul"),
                "o-list-item" => Some("ol"),
                _ => None,
            };

            if open_list != list {
                if let Some(tag) = open_list {
                    html.push_str(&format!("</{}>", tag));
                }
                if let Some(tag) = list {
                    html.push_str(&format!("<{}>", tag));
                }
                open_list = list;
            }

            html.push_str(&self.render_node(node));
        }

        if let Some(tag) = open_list {
            html.push_str(&format!("</{}>", tag));
        }

        html
    }

    fn render_node(&self, node: &RichTextNode) -> String {
        match node.kind.as_str() {
            "paragraph" => format!("<p>{}</p>", render_spans(&node.text, &node.spans)),
            "preformatted" => format!("<pre>{}</pre>", render_spans(&node.text, &node.spans)),
            "list-item" | "o-list-item" => {
                format!("<li>{}</li>", render_spans(&node.text, &node.spans))
            }
            kind if kind.starts_with("heading") => {
                let level = kind
                    .trim_start_matches("heading")
                    .parse::<u8>()
                    .ok()
                    .filter(|l| (1..=6).contains(l))
                    .unwrap_or(2);
                format!(
                    "<h{level}>{}</h{level}>",
                    render_spans(&node.text, &node.spans)
                )
            }
            "image" => format!(
                r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                html_escape(node.url.as_deref().unwrap_or("")),
                html_escape(node.alt.as_deref().unwrap_or(""))
            ),
            "embed" => {
                let oembed = node.oembed.as_ref();
                let field = |name: &str| {
                    oembed
                        .and_then(|o| o.get(name))
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                };
                // embed markup comes from the provider's oEmbed answer
                format!(
                    r#"<div data-oembed="{}" data-oembed-type="{}">{}</div>"#,
                    html_escape(field("embed_url")),
                    html_escape(field("type")),
                    field("html")
                )
            }
            other => {
                tracing::debug!("Skipping unsupported rich text node: {}", other);
                String::new()
            }
        }
    }
}

/// Whether a link target may be emitted: http(s), mailto or a site-relative path
fn is_safe_href(href: &str) -> bool {
    match url::Url::parse(href.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https" | "mailto"),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            href.starts_with('/') && !href.starts_with("//")
        }
        Err(_) => false,
    }
}

/// Render text with inline spans applied
fn render_spans(text: &str, spans: &[Span]) -> String {
    let mut spans: Vec<&Span> = spans.iter().filter(|s| s.end > s.start).collect();
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut out = String::with_capacity(text.len());
    let mut stack: Vec<&Span> = Vec::new();
    let mut next = 0;
    let mut offset = 0;

    for c in text.chars() {
        close_finished(&mut out, &mut stack, offset);

        while next < spans.len() && spans[next].start <= offset {
            out.push_str(&spans[next].open_tag());
            stack.push(spans[next]);
            next += 1;
        }

        match c {
            '\n' => out.push_str("<br />"),
            c => out.push_str(&html_escape(c.encode_utf8(&mut [0; 4]))),
        }
        offset += c.len_utf16();
    }

    while let Some(span) = stack.pop() {
        out.push_str(span.close_tag());
    }

    out
}

/// Close spans ending at `offset`, reopening any still-active ones that were
/// nested inside them.
fn close_finished<'a>(out: &mut String, stack: &mut Vec<&'a Span>, offset: usize) {
    if !stack.iter().any(|s| s.end <= offset) {
        return;
    }

    let mut reopen = Vec::new();
    while let Some(span) = stack.pop() {
        out.push_str(span.close_tag());
        if span.end > offset {
            reopen.push(span);
        }
    }

    for span in reopen.into_iter().rev() {
        out.push_str(&span.open_tag());
        stack.push(span);
    }
}
