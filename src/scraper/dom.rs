//! Small helpers over `scraper` for fallback selector chains.
//!
//! Sites change markup often, so most fields are read through an ordered
//! list of selectors where the first one yielding non-empty text wins.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::cleaner::squash_whitespace;

/// Compile a selector list, dropping entries that fail to parse.
pub fn selectors(list: &[&str]) -> Vec<Selector> {
    list.iter().filter_map(|s| Selector::parse(s).ok()).collect()
}

pub fn selector(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("selector {:?}: {:?}", css, e))
}

/// Visible text of an element with whitespace squashed.
pub fn text_of(el: ElementRef<'_>) -> String {
    squash_whitespace(&el.text().collect::<String>())
}

/// Text nodes joined with single spaces, so adjacent inline elements stay
/// separate words.
pub fn spaced_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Elements below `scope`, excluding `scope` itself, in document order.
pub fn descendants<'a>(scope: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    scope.descendants().skip(1).filter_map(ElementRef::wrap)
}

/// True when any single class token of `el` matches.
pub fn class_matches(el: ElementRef<'_>, re: &Regex) -> bool {
    el.value().classes().any(|c| re.is_match(c))
}

/// First element below `scope` whose class matches, optionally limited to tags.
pub fn find_by_class<'a>(scope: ElementRef<'a>, tags: &[&str], re: &Regex) -> Option<ElementRef<'a>> {
    descendants(scope).find(|el| (tags.is_empty() || tags.contains(&el.value().name())) && class_matches(*el, re))
}

/// First trimmed text node below `scope` matching `re`.
pub fn find_text_node(scope: ElementRef<'_>, re: &Regex) -> Option<String> {
    scope.text().map(str::trim).find(|t| re.is_match(t)).map(str::to_string)
}

/// Full text of the element holding the first text node that matches `re`,
/// e.g. the whole "HQ Location: Pune" line from a "Location" label.
pub fn text_node_parent(scope: ElementRef<'_>, re: &Regex) -> Option<String> {
    scope.descendants().find_map(|node| {
        let text = node.value().as_text()?;
        if !re.is_match(text) {
            return None;
        }
        node.parent().and_then(ElementRef::wrap).map(text_of)
    })
}

/// Text of the first match of the first selector that yields non-empty text.
pub fn first_text(scope: ElementRef<'_>, sels: &[Selector]) -> Option<String> {
    sels.iter().find_map(|sel| {
        scope
            .select(sel)
            .map(text_of)
            .find(|t| !t.is_empty())
    })
}

/// For each selector in order, parse the text of its first match; the first
/// successful parse wins.
pub fn first_parsed<T>(
    scope: ElementRef<'_>,
    sels: &[Selector],
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    sels.iter().find_map(|sel| {
        let el = scope.select(sel).next()?;
        parse(&text_of(el))
    })
}

/// Same as `first_text` but over the whole document.
pub fn first_text_doc(doc: &Html, sels: &[Selector]) -> Option<String> {
    first_text(doc.root_element(), sels)
}

/// Attribute value of the first element (over all selectors, in order) that has it.
pub fn first_attr(scope: ElementRef<'_>, sels: &[Selector], attr: &str) -> Option<String> {
    sels.iter().find_map(|sel| {
        scope
            .select(sel)
            .filter_map(|el| el.value().attr(attr))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(str::to_string)
    })
}

/// All `<a href>` values under `scope`, in document order.
pub fn hrefs(scope: ElementRef<'_>) -> Vec<String> {
    static ANCHOR: std::sync::LazyLock<Selector> =
        std::sync::LazyLock::new(|| Selector::parse("a[href]").unwrap());
    scope
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .map(|h| h.trim().to_string())
        .collect()
}

/// `content` of `<meta name=..>` or `<meta property=..>`.
pub fn meta_content(doc: &Html, key: &str) -> Option<String> {
    let css = format!(r#"meta[name="{key}"], meta[property="{key}"]"#);
    let sel = Selector::parse(&css).ok()?;
    doc.select(&sel)
        .filter_map(|m| m.value().attr("content"))
        .map(|c| c.trim().to_string())
        .find(|c| !c.is_empty())
}

/// Page `<title>` text.
pub fn title(doc: &Html) -> Option<String> {
    let sel = Selector::parse("title").ok()?;
    doc.select(&sel).next().map(text_of).filter(|t| !t.is_empty())
}

/// Raw text of every `<script>` matching the selector (JSON-LD, Next.js data).
pub fn script_bodies(doc: &Html, css: &str) -> Vec<String> {
    let Ok(sel) = Selector::parse(css) else {
        return vec![];
    };
    doc.select(&sel).map(|s| s.inner_html()).collect()
}

/// Trimmed non-empty text nodes outside the skipped element subtrees.
fn text_nodes(doc: &Html, skip: &[&str]) -> Vec<String> {
    doc.root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .map(|e| skip.contains(&e.name()))
                    .unwrap_or(false)
            });
            let text = text.trim();
            (!hidden && !text.is_empty()).then(|| text.to_string())
        })
        .collect()
}

/// What a reader would see, one text node per entry.
pub fn visible_lines(doc: &Html) -> Vec<String> {
    text_nodes(doc, &["script", "style", "noscript", "template"])
}

/// Body text with script/style/nav/header/footer subtrees removed.
pub fn content_text(doc: &Html) -> String {
    squash_whitespace(&text_nodes(doc, &["script", "style", "nav", "header", "footer"]).join(" "))
}
