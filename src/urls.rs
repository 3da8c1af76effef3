//! Resolve scraped hrefs to canonical post URLs.

use html_escape::decode_html_entities;
use url::Url;

use crate::config::{origin_site, BlogConfig};

/// A link resolved to a post under the blog prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostLink {
    /// Absolute canonical URL on the configured origin.
    pub url: String,
    /// Root-relative canonical path, the dedupe key.
    pub path: String,
    pub slug: String,
}

/// Base every href is joined against: the listing URL with a trailing slash,
/// so bare relative hrefs land under the blog path.
pub fn listing_base(cfg: &BlogConfig) -> Url {
    let mut base = cfg.blog_url();
    let path = format!("{}/", base.path().trim_end_matches('/'));
    base.set_path(&path);
    base
}

/// Resolve an href (absolute, protocol-relative, root-relative or bare) to an
/// absolute http(s) URL without query or fragment.
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let decoded = decode_html_entities(href.trim());
    let trimmed = decoded.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    let mut u = base.join(trimmed).ok()?;
    if !matches!(u.scheme(), "http" | "https") {
        return None;
    }
    u.set_query(None);
    u.set_fragment(None);
    Some(u)
}

/// Map an href to its canonical post link. Foreign hosts, paths outside the
/// blog prefix and the listing page itself yield `None`.
pub fn canonicalize(cfg: &BlogConfig, base: &Url, href: &str) -> Option<PostLink> {
    let u = resolve_href(base, href)?;
    if origin_site(&u) != origin_site(&cfg.origin) {
        return None;
    }
    let slug = slug_from_path(&cfg.blog_path, u.path())?;
    Some(link_for_slug(cfg, &slug))
}

/// Canonical link for a known slug on the configured origin.
pub fn link_for_slug(cfg: &BlogConfig, slug: &str) -> PostLink {
    PostLink {
        url: cfg.post_url(slug),
        path: format!("{}/{}", cfg.blog_path.trim_end_matches('/'), slug),
        slug: slug.to_string(),
    }
}

/// Strip the blog prefix from a path and lowercase what remains.
pub fn slug_from_path(prefix: &str, path: &str) -> Option<String> {
    let prefix = prefix.trim_end_matches('/');
    let rest = path.strip_prefix(prefix)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        // "/blogroll" is not under "/blog"
        return None;
    }
    let slug = rest.trim_matches('/').trim().to_lowercase();
    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> BlogConfig {
        BlogConfig::default()
    }

    #[test]
    fn resolves_every_href_shape() {
        let c = cfg();
        let base = listing_base(&c);
        assert_eq!(base.as_str(), "https://www.voxitec.com/blog/");
        for href in [
            "https://www.voxitec.com/blog/how-autonomy-drives-successful-mission-execution/",
            "//www.voxitec.com/blog/how-autonomy-drives-successful-mission-execution",
            "/blog/how-autonomy-drives-successful-mission-execution?utm_source=x#top",
            "how-autonomy-drives-successful-mission-execution",
            "https://voxitec.com/Blog/../blog/How-Autonomy-Drives-Successful-Mission-Execution",
        ] {
            let link = canonicalize(&c, &base, href).unwrap();
            assert_eq!(
                link.url,
                "https://www.voxitec.com/blog/how-autonomy-drives-successful-mission-execution",
                "{href}"
            );
            assert_eq!(link.path, "/blog/how-autonomy-drives-successful-mission-execution");
        }
    }

    #[test]
    fn rejects_listing_foreign_and_non_http() {
        let c = cfg();
        let base = listing_base(&c);
        assert_eq!(canonicalize(&c, &base, "/blog"), None);
        assert_eq!(canonicalize(&c, &base, "/blog/"), None);
        assert_eq!(canonicalize(&c, &base, "https://other.example/blog/some-post"), None);
        assert_eq!(canonicalize(&c, &base, "mailto:hi@voxitec.com"), None);
        assert_eq!(canonicalize(&c, &base, "/about-us"), None);
    }

    #[test]
    fn slug_requires_segment_boundary() {
        assert_eq!(slug_from_path("/blog", "/blogroll/x"), None);
        assert_eq!(slug_from_path("/blog", "/blog/A-b/"), Some("a-b".into()));
    }
}
