// Text to HTML conversion for report blocks
use pulldown_cmark::{html, Event, Options, Parser};

/// Escape text for HTML bodies and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render narrative Markdown as HTML. Raw HTML in the text is escaped, and
/// text that renders to nothing falls back to [`plain_paragraphs`].
pub fn insights_to_html(text: &str) -> String {
    let parser = Parser::new_ext(text.trim(), Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES)
        .map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            other => other,
        });

    let mut out = String::new();
    html::push_html(&mut out, parser);

    if out.trim().is_empty() {
        return plain_paragraphs(text);
    }
    out
}

/// Escaped paragraphs split on blank lines, single newlines as `<br/>`
pub fn plain_paragraphs(text: &str) -> String {
    let escaped = escape_html(text.trim());
    format!(
        "<p>{}</p>",
        escaped.replace("\n\n", "</p><p>").replace('\n', "<br/>")
    )
}
