use once_cell::sync::Lazy;
use regex::Regex;

static RE_HEX_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[a-f0-9]{10,}$").unwrap());

const SKIP_SLUGS: [&str; 6] = ["feed", "rss", "tag", "category", "author", "page"];
const PAGINATION_PREFIXES: [&str; 2] = ["page-", "p-"];

/// True if `slug` looks like a real article slug rather than an ID,
/// pagination page or taxonomy path. Leans towards rejecting: a real post that
/// is missed here still comes back through allow-list completion.
pub fn is_likely_article_slug(slug: &str) -> bool {
    let s = slug.trim().to_lowercase();
    if s.chars().count() < 3 {
        return false;
    }
    if RE_HEX_ID.is_match(&s) {
        return false;
    }
    if PAGINATION_PREFIXES.iter().any(|p| s.starts_with(p)) {
        return false;
    }
    // nested paths such as tag/foo-bar are taxonomy pages
    if s.contains('/') {
        return false;
    }
    if SKIP_SLUGS.contains(&s.as_str()) {
        return false;
    }
    // real post URLs are word-word-word
    s.contains('-')
}

/// Readable title from a slug: split on hyphens, capitalize each word.
pub fn title_from_slug(slug: &str) -> String {
    let slug = slug.trim_matches('/');
    if slug.is_empty() {
        return "Blog post".to_string();
    }
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
