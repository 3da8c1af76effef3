//! Listing HTML in, fixed-size ordered posts out.

use tracing::{debug, info, warn};

use crate::config::BlogConfig;
use crate::dates::{assign_by_position, extract_dates};
use crate::fetch::Fetch;
use crate::images::{extract_listing_images, fetch_post_images};
use crate::links::default_extractors;
use crate::posts::{collect_candidates, filter_and_complete, sort_canonical, Post, PostDraft};
use crate::urls::listing_base;

/// Fetch the listing page and build the post list. Returns an empty list when
/// the listing itself cannot be fetched; every other failure degrades to
/// synthesized entries or placeholder images.
pub fn get_blog_posts<F: Fetch>(fetcher: &F, cfg: &BlogConfig) -> Vec<Post> {
    let listing_url = cfg.blog_url();
    let html = match fetcher.fetch(&listing_url) {
        Ok(body) => body,
        Err(e) => {
            warn!(url = %listing_url, error = %e, "listing fetch failed, no posts");
            return Vec::new();
        }
    };
    posts_from_listing(&html, cfg, fetcher)
}

/// Build posts from already-fetched listing HTML. `fetcher` is only used for
/// the per-post image lookups.
pub fn posts_from_listing<F: Fetch>(html: &str, cfg: &BlogConfig, fetcher: &F) -> Vec<Post> {
    let base = listing_base(cfg);
    let extractors = default_extractors(&cfg.blog_path);

    let candidates = collect_candidates(cfg, &base, &extractors, html);
    let scraped = candidates.len();
    let mut drafts = filter_and_complete(cfg, candidates);
    annotate_dates(html, &mut drafts);
    sort_canonical(cfg, &mut drafts);

    resolve_images(html, cfg, fetcher, &mut drafts);

    info!(
        scraped,
        posts = drafts.len(),
        with_image = drafts.iter().filter(|d| d.image_url.is_some()).count(),
        "blog posts built"
    );
    drafts.into_iter().map(PostDraft::finish).collect()
}

/// Listing images go to posts by position. Posts inside the secondary window
/// that still lack one get their own page searched; everything else is left
/// for the placeholder.
fn resolve_images<F: Fetch>(html: &str, cfg: &BlogConfig, fetcher: &F, drafts: &mut [PostDraft]) {
    let listing_images = extract_listing_images(html, &cfg.trusted_image_hosts);
    debug!(count = listing_images.len(), "listing images");
    for (draft, img) in drafts.iter_mut().zip(listing_images) {
        draft.image_url = Some(img);
    }

    let targets: Vec<(usize, String)> = drafts
        .iter()
        .enumerate()
        .take(cfg.secondary_fetch_window)
        .filter(|(_, d)| d.image_url.is_none())
        .map(|(i, d)| (i, d.link.url.clone()))
        .collect();
    if targets.is_empty() {
        return;
    }

    for (idx, img) in fetch_post_images(fetcher, cfg, &targets) {
        if let (Some(img), Some(draft)) = (img, drafts.get_mut(idx)) {
            if draft.image_url.is_none() {
                draft.image_url = Some(img);
            }
        }
    }
}

/// Runs before ordering so each date lands on the scraped post it sat near in
/// the listing. Synthesized posts are skipped.
fn annotate_dates(html: &str, drafts: &mut [PostDraft]) {
    let scraped: Vec<&mut PostDraft> = drafts.iter_mut().filter(|d| !d.synthesized).collect();
    let dates = assign_by_position(extract_dates(html), scraped.len());
    for (draft, date) in scraped.into_iter().zip(dates) {
        draft.date = date;
    }
}
