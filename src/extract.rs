//! HTML to plain text, shared by the http and browser backends.

use crate::selector::{CssSelector, default_content_selectors};
use scraper::{ElementRef, Html, Selector};

/// Blocks shorter than this are treated as navigation chrome, not content.
const MIN_BLOCK_CHARS: usize = 100;

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg", "head"];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "table",
    "section", "article", "header", "footer", "blockquote", "pre", "main",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageText {
    pub title: String,
    pub content: String,
    /// Selectors that contributed content; empty means the body fallback was used.
    pub matched: Vec<String>,
}

/// Collects text from `hints` then the default container table, keeping every
/// matched block of substantial length. Falls back to the whole body.
pub fn extract_page_text(html: &str, hints: &[CssSelector]) -> PageText {
    let doc = Html::parse_document(html);

    let title = first_by_tag(&doc, "title")
        .map(|e| normalize(&e.text().collect::<String>()))
        .unwrap_or_default();

    let mut parts: Vec<String> = Vec::new();
    let mut matched = Vec::new();

    for selector in hints.iter().cloned().chain(default_content_selectors()) {
        let mut hit = false;
        for element in doc.select(selector.selector()) {
            let text = element_text(element);
            if text.chars().count() > MIN_BLOCK_CHARS && !parts.contains(&text) {
                parts.push(text);
                hit = true;
            }
        }
        if hit {
            matched.push(selector.as_css().to_string());
        }
    }

    if parts.is_empty() {
        if let Some(body) = first_by_tag(&doc, "body") {
            let text = element_text(body);
            if !text.is_empty() {
                parts.push(text);
            }
        }
    }

    PageText {
        title,
        content: parts.join("\n\n"),
        matched,
    }
}

fn first_by_tag<'a>(doc: &'a Html, tag: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(tag).ok()?;
    doc.select(&selector).next()
}

/// Visible text of an element, one line per block element.
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    normalize(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if SKIPPED_TAGS.contains(&name) {
        return;
    }
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            collect_text(child_element, out);
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
    if BLOCK_TAGS.contains(&name) {
        out.push('\n');
    }
}

fn normalize(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long(word: &str) -> String {
        std::iter::repeat(word).take(40).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn prefers_content_containers() {
        let html = format!(
            "<html><head><title> Gold rallies </title><style>.x{{}}</style></head>\
             <body><nav>Home | About</nav><article><p>{}</p><script>var x=1;</script></article></body></html>",
            long("gold")
        );
        let page = extract_page_text(&html, &[]);
        assert_eq!(page.title, "Gold rallies");
        assert!(page.content.starts_with("gold gold"));
        assert!(!page.content.contains("Home"));
        assert!(!page.content.contains("var x"));
        assert_eq!(page.matched, vec!["article".to_string()]);
    }

    #[test]
    fn hints_come_first() {
        let html = format!(
            "<body><article>{}</article><div class=\"story\">{}</div></body>",
            long("article"),
            long("story")
        );
        let hints = vec![".story".parse::<CssSelector>().unwrap()];
        let page = extract_page_text(&html, &hints);
        assert!(page.content.starts_with("story"));
        assert!(page.content.contains("article"));
    }

    #[test]
    fn quoted_hint_selects_block() {
        let html = format!(
            "<body><div data-role=\"story body\">{}</div><div data-role=\"story\">{}</div></body>",
            long("hit"),
            long("miss")
        );
        let hints = vec!["div[data-role='story body']".parse::<CssSelector>().unwrap()];
        let page = extract_page_text(&html, &hints);
        assert!(page.content.starts_with("hit hit"));
        assert!(!page.content.contains("miss"));
        assert_eq!(page.matched, vec!["div[data-role='story body']".to_string()]);
    }

    #[test]
    fn falls_back_to_body() {
        let page = extract_page_text("<body><p>short</p><p>page</p></body>", &[]);
        assert_eq!(page.content, "short\npage");
        assert!(page.matched.is_empty());
    }
}
