use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, trace};
use url::Url;

use crate::config::BlogConfig;
use crate::images::fallback_image_url;
use crate::links::{usable_title, LinkExtractor};
use crate::slug::{is_likely_article_slug, title_from_slug};
use crate::urls::{canonicalize, link_for_slug, PostLink};

/// A finished post, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Real image when one was found, otherwise the fallback.
    pub image_url: String,
    /// Placeholder the renderer can switch to if `image_url` fails to load.
    pub fallback_image_url: String,
    pub slug: String,
}

/// A post while the pipeline is still filling it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub link: PostLink,
    pub date: Option<String>,
    pub image_url: Option<String>,
    pub fallback_image_url: String,
    /// Not seen on the listing; never gets a date.
    pub synthesized: bool,
}

impl PostDraft {
    fn new(cfg: &BlogConfig, link: PostLink, title: String) -> Self {
        let fallback_image_url = fallback_image_url(cfg, &link.slug);
        Self {
            title,
            link,
            date: None,
            image_url: None,
            fallback_image_url,
            synthesized: false,
        }
    }

    /// Placeholder entry for an allow-listed slug the listing did not show.
    pub fn synthesized(cfg: &BlogConfig, slug: &str) -> Self {
        Self {
            synthesized: true,
            ..Self::new(cfg, link_for_slug(cfg, slug), title_from_slug(slug))
        }
    }

    pub fn slug(&self) -> &str {
        &self.link.slug
    }

    pub fn finish(self) -> Post {
        let image_url = self
            .image_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.fallback_image_url.clone());
        Post {
            title: self.title,
            url: self.link.url,
            date: self.date,
            image_url,
            fallback_image_url: self.fallback_image_url,
            slug: self.link.slug,
        }
    }
}

/// Run every extractor over the listing in order and keep the first
/// occurrence of each canonical path. Links that do not resolve to a post on
/// the origin, or whose slug does not look like an article, are skipped.
pub fn collect_candidates(
    cfg: &BlogConfig,
    base: &Url,
    extractors: &[Box<dyn LinkExtractor>],
    html: &str,
) -> Vec<PostDraft> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut drafts = Vec::new();

    for ex in extractors {
        let mut added = 0usize;
        for raw in ex.extract(html) {
            let Some(link) = canonicalize(cfg, base, &raw.href) else {
                continue;
            };
            if !is_likely_article_slug(&link.slug) {
                trace!(pass = ex.name(), slug = %link.slug, "not an article slug");
                continue;
            }
            if !seen.insert(link.path.clone()) {
                continue;
            }
            let title = raw
                .text
                .as_deref()
                .and_then(usable_title)
                .unwrap_or_else(|| title_from_slug(&link.slug));
            drafts.push(PostDraft::new(cfg, link, title));
            added += 1;
        }
        debug!(pass = ex.name(), added, "link pass done");
    }

    drafts
}

/// Keep only allow-listed posts, then add a synthesized entry for every
/// allow-listed slug that is still missing.
pub fn filter_and_complete(cfg: &BlogConfig, drafts: Vec<PostDraft>) -> Vec<PostDraft> {
    let mut kept: Vec<PostDraft> = drafts
        .into_iter()
        .filter(|d| cfg.is_allowed(d.slug()))
        .collect();

    let present: HashSet<String> = kept.iter().map(|d| d.slug().to_string()).collect();
    for slug in cfg.allowed_slugs() {
        if present.contains(slug) {
            continue;
        }
        debug!(slug = %slug, "allow-listed post missing from listing, synthesizing");
        kept.push(PostDraft::synthesized(cfg, slug));
    }
    kept
}

/// Sort into canonical publish order. Unknown slugs go last, keeping their
/// relative order.
pub fn sort_canonical(cfg: &BlogConfig, drafts: &mut [PostDraft]) {
    let order = cfg.allowed_slugs();
    drafts.sort_by_key(|d| {
        order
            .iter()
            .position(|s| s == d.slug())
            .unwrap_or(usize::MAX)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KnownPost;
    use crate::links::default_extractors;
    use crate::urls::listing_base;

    fn small_cfg() -> BlogConfig {
        BlogConfig::default()
            .with_known_posts(vec![
                KnownPost { slug: "first-post".into(), topic: Some("first".into()), picsum_id: None },
                KnownPost { slug: "second-post".into(), topic: None, picsum_id: Some(5) },
                KnownPost { slug: "third-post".into(), topic: None, picsum_id: None },
            ])
            .unwrap()
    }

    fn collect(cfg: &BlogConfig, html: &str) -> Vec<PostDraft> {
        collect_candidates(cfg, &listing_base(cfg), &default_extractors(&cfg.blog_path), html)
    }

    #[test]
    fn first_pass_wins_and_paths_are_unique() {
        let cfg = small_cfg();
        let html = r#"
          <div data-link="/blog/second-post"></div>
          <a href="/blog/second-post/">Second, from the anchor</a>
          <a href="https://www.voxitec.com/blog/second-post?x=1">Second again</a>
          <script>"/blog/first-post"</script>
        "#;
        let drafts = collect(&cfg, html);
        let paths: Vec<_> = drafts.iter().map(|d| d.link.path.as_str()).collect();
        assert_eq!(paths, vec!["/blog/second-post", "/blog/first-post"]);
        assert_eq!(drafts[0].title, "Second, from the anchor");
        assert_eq!(drafts[1].title, "First Post");
    }

    #[test]
    fn junk_slugs_never_become_candidates() {
        let cfg = small_cfg();
        let html = r#"<a href="/blog/b7e06e395f27e247">Page B7e06e395f27e247</a>
                      <a href="/blog/page-2">Next</a><a href="/blog/feed">RSS</a>"#;
        assert!(collect(&cfg, html).is_empty());
    }

    #[test]
    fn script_links_to_other_sites_are_dropped() {
        let cfg = small_cfg();
        let html = r#"<script>["https:\/\/partner.example.com\/blog\/first-post",
                       "https:\/\/voxitec.com\/blog\/third-post"]</script>"#;
        let slugs: Vec<_> = collect(&cfg, html).iter().map(|d| d.slug().to_string()).collect();
        assert_eq!(slugs, vec!["third-post"]);
    }

    #[test]
    fn completion_fills_missing_and_drops_unknown() {
        let cfg = small_cfg();
        let html = r#"<a href="/blog/third-post">Third</a><a href="/blog/not-allowed-post">Nope</a>"#;
        let mut drafts = filter_and_complete(&cfg, collect(&cfg, html));
        sort_canonical(&cfg, &mut drafts);
        let slugs: Vec<_> = drafts.iter().map(|d| d.slug()).collect();
        assert_eq!(slugs, vec!["first-post", "second-post", "third-post"]);
        assert_eq!(drafts[0].title, "First Post");
        assert_eq!(drafts[0].link.url, "https://www.voxitec.com/blog/first-post");
        assert_eq!(drafts[2].title, "Third");
        assert!(drafts[0].synthesized && drafts[1].synthesized);
        assert!(!drafts[2].synthesized);
    }

    #[test]
    fn unknown_slugs_sort_last() {
        let cfg = small_cfg();
        let mut drafts = vec![
            PostDraft::synthesized(&cfg, "zzz-post"),
            PostDraft::synthesized(&cfg, "third-post"),
            PostDraft::synthesized(&cfg, "first-post"),
        ];
        sort_canonical(&cfg, &mut drafts);
        let slugs: Vec<_> = drafts.iter().map(|d| d.slug()).collect();
        assert_eq!(slugs, vec!["first-post", "third-post", "zzz-post"]);
    }

    #[test]
    fn finish_falls_back_to_placeholder() {
        let cfg = small_cfg();
        let mut d = PostDraft::synthesized(&cfg, "second-post");
        d.image_url = Some("  ".into());
        let post = d.finish();
        assert_eq!(post.image_url, "https://picsum.photos/id/5/360/240");
        assert_eq!(post.image_url, post.fallback_image_url);
    }
}
