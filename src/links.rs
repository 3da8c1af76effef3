//! Candidate post links from listing HTML.
//!
//! Each pass is an independent [`LinkExtractor`]. They run in order over the
//! same document and the caller keeps the first occurrence of each canonical
//! path, so earlier passes (which see anchor text) win over later ones.

use regex::Regex;

use crate::text::clean_link_text;

/// An href found in the listing, with the link text when the pass saw one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLink {
    pub href: String,
    pub text: Option<String>,
}

pub trait LinkExtractor {
    fn name(&self) -> &'static str;
    fn extract(&self, html: &str) -> Vec<RawLink>;
}

/// `<a href=".../blog/...">text</a>`.
pub struct AnchorPass {
    re: Regex,
}

impl AnchorPass {
    pub fn new(prefix: &str) -> Self {
        let p = regex::escape(prefix.trim_end_matches('/'));
        let re = Regex::new(&format!(
            r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']*{p}/[^"']*)["'][^>]*>(.*?)</a>"#
        ))
        .unwrap();
        Self { re }
    }
}

impl LinkExtractor for AnchorPass {
    fn name(&self) -> &'static str {
        "anchor"
    }

    fn extract(&self, html: &str) -> Vec<RawLink> {
        self.re
            .captures_iter(html)
            .map(|c| RawLink {
                href: c[1].to_string(),
                text: Some(c[2].to_string()),
            })
            .collect()
    }
}

/// Any attribute whose value contains the prefix followed by a slug segment,
/// whatever tag it sits on (`data-href`, `content`, ...). Whatever precedes
/// the prefix is kept in the href and left to URL resolution to accept or
/// reject.
pub struct AttributePass {
    re: Regex,
}

impl AttributePass {
    pub fn new(prefix: &str) -> Self {
        let p = regex::escape(prefix.trim_end_matches('/'));
        let re = Regex::new(&format!(
            r#"(?i)[a-z_:][-a-z0-9_:.]*\s*=\s*["']([^"']*?{p}/[^"'\s?#]{{2,}})[^"']*["']"#
        ))
        .unwrap();
        Self { re }
    }
}

impl LinkExtractor for AttributePass {
    fn name(&self) -> &'static str {
        "attribute"
    }

    fn extract(&self, html: &str) -> Vec<RawLink> {
        self.re
            .captures_iter(html)
            .map(|c| RawLink {
                href: c[1].to_string(),
                text: None,
            })
            .collect()
    }
}

/// `/blog/<hyphenated-token>` anywhere in the raw text, including inline
/// scripts and JSON with escaped slashes. A `//host` directly in front of the
/// prefix stays on the href so links to other sites are still dropped.
pub struct SlugPass {
    prefix: String,
    re: Regex,
}

impl SlugPass {
    pub fn new(prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/').to_string();
        let p = regex::escape(&prefix);
        let re = Regex::new(&format!(
            r"(?i)(//[a-z0-9.:-]+)?{p}/([a-z0-9][a-z0-9-]*[a-z0-9])"
        ))
        .unwrap();
        Self { prefix, re }
    }
}

impl LinkExtractor for SlugPass {
    fn name(&self) -> &'static str {
        "slug"
    }

    fn extract(&self, html: &str) -> Vec<RawLink> {
        let unescaped = html.replace("\\/", "/");
        self.re
            .captures_iter(&unescaped)
            .map(|c| RawLink {
                href: format!(
                    "{}{}/{}",
                    c.get(1).map_or("", |h| h.as_str()),
                    self.prefix,
                    c[2].to_lowercase()
                ),
                text: None,
            })
            .collect()
    }
}

/// The three passes in precedence order.
pub fn default_extractors(prefix: &str) -> Vec<Box<dyn LinkExtractor>> {
    vec![
        Box::new(AnchorPass::new(prefix)),
        Box::new(AttributePass::new(prefix)),
        Box::new(SlugPass::new(prefix)),
    ]
}

const GENERIC_LINK_TEXT: [&str; 8] = [
    "read more",
    "learn more",
    "continue reading",
    "read article",
    "read post",
    "read the article",
    "more",
    "view post",
];

/// Link text worth showing as a title: at least 3 visible characters and not
/// a call-to-action like "Read more".
pub fn usable_title(markup: &str) -> Option<String> {
    let text = clean_link_text(markup);
    if text.chars().count() < 3 {
        return None;
    }
    let key = text
        .trim_end_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    if GENERIC_LINK_TEXT.contains(&key.as_str()) {
        return None;
    }
    Some(text)
}
