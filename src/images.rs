//! Post images: listing heuristics, per-post page lookup and a deterministic
//! placeholder fallback.

use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::thread;
use tracing::debug;
use url::{form_urlencoded, Url};

use crate::config::BlogConfig;
use crate::fetch::Fetch;

static RE_NEXT_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"_next/image\?([^"'\s>]+)"#).unwrap());
static RE_CLOUDINARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https?://res\.cloudinary\.com/[a-zA-Z0-9_]+/image/upload/[^\s"'<>]+"#).unwrap()
});
static RE_IMG_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*["'](https?://[^"']+)["']"#).unwrap()
});

const OG_IMAGE_SELECTORS: [&str; 3] = [
    r#"meta[property="og:image"]"#,
    r#"meta[property="og:image:secure_url"]"#,
    r#"meta[name="og:image"]"#,
];

/// Builds placeholder image URLs from a numeric id or a seed string.
/// The same input always yields the same URL.
pub trait PlaceholderProvider {
    fn by_id(&self, id: u32) -> String;
    fn by_seed(&self, seed: &str) -> String;
}

/// Lorem Picsum, no API key needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Picsum {
    pub width: u32,
    pub height: u32,
}

impl Default for Picsum {
    fn default() -> Self {
        Self {
            width: 360,
            height: 240,
        }
    }
}

impl PlaceholderProvider for Picsum {
    fn by_id(&self, id: u32) -> String {
        format!("https://picsum.photos/id/{}/{}/{}", id, self.width, self.height)
    }

    fn by_seed(&self, seed: &str) -> String {
        let seed: String = form_urlencoded::byte_serialize(seed.as_bytes()).collect();
        format!("https://picsum.photos/seed/{}/{}/{}", seed, self.width, self.height)
    }
}

/// Placeholder for a slug: curated picsum id, else topic keyword, else the
/// slug itself, else "blog".
pub fn fallback_image_url(cfg: &BlogConfig, slug: &str) -> String {
    fallback_with(&cfg.placeholder, cfg, slug)
}

pub fn fallback_with<P: PlaceholderProvider>(provider: &P, cfg: &BlogConfig, slug: &str) -> String {
    if let Some(id) = cfg.picsum_id_for(slug) {
        return provider.by_id(id);
    }
    let seed = cfg
        .topic_for(slug)
        .or(Some(slug).filter(|s| !s.is_empty()))
        .unwrap_or("blog");
    provider.by_seed(seed)
}

/// `/_next/image?url=<encoded>&w=..` proxy URLs, decoded to the original image.
fn proxy_images(html: &str) -> impl Iterator<Item = String> + '_ {
    RE_NEXT_IMAGE.captures_iter(html).filter_map(|c| {
        let query = decode_html_entities(&c[1]).into_owned();
        form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == "url")
            .map(|(_, v)| v.trim().to_string())
            .filter(|v| is_absolute_http(v))
    })
}

/// Direct Cloudinary upload URLs with sizing/tracking parameters cut off.
fn cdn_images(html: &str) -> impl Iterator<Item = String> + '_ {
    RE_CLOUDINARY.find_iter(html).filter_map(|m| {
        let src = m.as_str().split('&').next().unwrap_or_default();
        (!src.is_empty()).then(|| src.to_string())
    })
}

/// `<img src>` pointing at a trusted host.
fn trusted_img_sources<'a>(
    html: &'a str,
    trusted_hosts: &'a [String],
) -> impl Iterator<Item = String> + 'a {
    RE_IMG_SRC.captures_iter(html).filter_map(move |c| {
        let src = decode_html_entities(c[1].trim()).into_owned();
        is_trusted_host(&src, trusted_hosts).then_some(src)
    })
}

fn is_absolute_http(s: &str) -> bool {
    Url::parse(s)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

pub fn is_trusted_host(src: &str, trusted_hosts: &[String]) -> bool {
    let Ok(u) = Url::parse(src) else {
        return false;
    };
    let Some(host) = u.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    trusted_hosts.iter().any(|t| {
        let t = t.to_ascii_lowercase();
        host == t || host.ends_with(&format!(".{t}"))
    })
}

/// Image URLs in the listing, in heuristic order (proxy, CDN, trusted img)
/// and document order within each, without duplicates.
pub fn extract_listing_images(html: &str, trusted_hosts: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    proxy_images(html)
        .chain(cdn_images(html))
        .chain(trusted_img_sources(html, trusted_hosts))
        .filter(|u| seen.insert(u.clone()))
        .collect()
}

/// Open Graph image of a post page, with relative values resolved against the
/// page URL. Attribute order inside the tag does not matter.
pub fn og_image(document: &Html, page_url: &Url) -> Option<String> {
    for css in OG_IMAGE_SELECTORS {
        let Ok(sel) = Selector::parse(css) else {
            continue;
        };
        for node in document.select(&sel) {
            let Some(content) = node.value().attr("content") else {
                continue;
            };
            let content = content.trim();
            if content.is_empty() {
                continue;
            }
            if let Ok(u) = page_url.join(content) {
                if matches!(u.scheme(), "http" | "https") {
                    return Some(u.into());
                }
            }
        }
    }
    None
}

/// Representative image of a single post page: og:image first, then the
/// listing heuristics.
pub fn find_post_image(html: &str, page_url: &Url, trusted_hosts: &[String]) -> Option<String> {
    let document = Html::parse_document(html);
    og_image(&document, page_url)
        .or_else(|| proxy_images(html).next())
        .or_else(|| cdn_images(html).next())
        .or_else(|| trusted_img_sources(html, trusted_hosts).next())
}

fn post_image<F: Fetch>(fetcher: &F, cfg: &BlogConfig, post_url: &str) -> Option<String> {
    let url = Url::parse(post_url).ok()?;
    match fetcher.fetch(&url) {
        Ok(html) => {
            let found = find_post_image(&html, &url, &cfg.trusted_image_hosts);
            debug!(url = %url, found = found.is_some(), "post page image lookup");
            found
        }
        Err(e) => {
            debug!(url = %url, error = %e, "post page fetch failed");
            None
        }
    }
}

/// Fetch each `(index, post_url)` page and look for its image. Up to
/// `cfg.max_concurrent_fetches` run at once on scoped threads; every result
/// comes back tagged with its index, and a failed fetch yields `None` for that
/// index only.
pub fn fetch_post_images<F: Fetch>(
    fetcher: &F,
    cfg: &BlogConfig,
    targets: &[(usize, String)],
) -> Vec<(usize, Option<String>)> {
    let mut out = Vec::with_capacity(targets.len());
    for batch in targets.chunks(cfg.max_concurrent_fetches.max(1)) {
        let results: Vec<(usize, Option<String>)> = thread::scope(|s| {
            let handles: Vec<_> = batch
                .iter()
                .map(|(idx, url)| s.spawn(move || (*idx, post_image(fetcher, cfg, url))))
                .collect();
            handles
                .into_iter()
                .filter_map(|h| h.join().ok())
                .collect()
        });
        out.extend(results);
    }
    out
}
