//! Regex and html5ever based HTML cleanup and link discovery.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use scraper::{Html, Selector};
use url::Url;

/// Elements whose content never counts as page text or links.
pub const BLOCK_ELEMENTS: [&str; 6] = ["head", "style", "script", "noscript", "iframe", "svg"];

lazy_static! {
    static ref COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").expect("valid regex");
    static ref TAG: Regex = Regex::new(r"<[^<]+?>").expect("valid regex");
    static ref ENTITY: Regex = Regex::new(r"&\S+?;").expect("valid regex");
    static ref BLOCKS: Vec<Regex> = BLOCK_ELEMENTS.iter().map(|name| element(name)).collect();
}

fn element(name: &str) -> Regex {
    Regex::new(&format!(r"(?is)<{name}(?:\s[^>]*)?>.*?</{name}\s*>")).expect("valid regex")
}

pub fn strip_comments(html: &str) -> String {
    COMMENT.replace_all(html, "").into_owned()
}

/// Removes every `name` element together with its content.
pub fn strip_element(html: &str, name: &str) -> String {
    element(name).replace_all(html, "").into_owned()
}

/// Comments, then head, style, script, noscript, iframe and svg elements.
pub fn strip_block_elements(html: &str) -> String {
    let mut html = strip_comments(html);
    for block in BLOCKS.iter() {
        html = block.replace_all(&html, "").into_owned();
    }
    html
}

pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

/// Replaces every entity with the text it stands for, or with nothing when it
/// is not a known entity. Text around the entities is left untouched.
pub fn strip_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| decode_entity(&caps[0]).unwrap_or_default())
        .into_owned()
}

/// Decodes one `&...;` match through html5ever. `None` when the match is not
/// an entity html5ever knows.
fn decode_entity(entity: &str) -> Option<String> {
    if entity.contains(['<', '>']) {
        return None;
    }
    let decoded: String = Html::parse_fragment(entity).root_element().text().collect();
    (decoded != entity).then_some(decoded)
}

/// Plain text of a page: block elements, tags and entities removed.
pub fn strip_html(html: &str) -> String {
    strip_entities(&strip_tags(&strip_block_elements(html)))
}

pub fn extract_title(html: &str) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let doc = Html::parse_document(html);
    let title = doc.select(&selector).next()?.text().collect::<String>();
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

pub fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Drops the fragment; two urls differing only by fragment are one page.
pub fn normalize(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

/// Absolute http(s) targets of every anchor in `html`, resolved against
/// `base`, fragment-free, in document order.
pub fn find_links(base: &Url, html: &str) -> Vec<Url> {
    let Ok(anchors) = Selector::parse("a[href]") else { return Vec::new() };
    let doc = Html::parse_document(html);
    let mut links = Vec::new();
    for a in doc.select(&anchors) {
        let Some(href) = a.value().attr("href") else { continue };
        match base.join(href.trim()) {
            Ok(url) if is_http(&url) => links.push(normalize(url)),
            Ok(_) => {}
            Err(err) => tracing::trace!(href, error = %err, "ignoring malformed link"),
        }
    }
    links
}
