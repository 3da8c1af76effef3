use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::images::Picsum;

pub const DEFAULT_ORIGIN: &str = "https://www.voxitec.com";
pub const BLOG_PATH: &str = "/blog";
pub const USER_AGENT: &str =
    "Mozilla/5.0 (compatible; VoxitecBlogFetcher/1.0; +https://github.com/voxitec/sebastian-task-one)";

/// Environment override for the allow-list file.
pub const ENV_ALLOWLIST_PATH: &str = "VOXITEC_NEWS_ALLOWLIST";

/// Posts among the first N (final order) get a per-post image lookup.
pub const SECONDARY_FETCH_WINDOW: usize = 5;
pub const MAX_CONCURRENT_FETCHES: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading allow-list {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing allow-list TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("parsing allow-list JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid origin URL {0:?}")]
    InvalidUrl(String),
    #[error("allow-list contains no usable slugs")]
    Empty,
}

/// One curated post: its slug plus the hints used for its fallback image.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KnownPost {
    pub slug: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub picsum_id: Option<u32>,
}

impl KnownPost {
    fn new(slug: &str, topic: &str, picsum_id: u32) -> Self {
        Self {
            slug: slug.to_string(),
            topic: Some(topic.to_string()),
            picsum_id: Some(picsum_id),
        }
    }
}

/// The Voxitec posts shown under RECENT NEWS, in publish order.
pub fn default_known_posts() -> Vec<KnownPost> {
    vec![
        KnownPost::new(
            "transforming-ontario-s-education-revolution-through-technology",
            "education-technology",
            10,
        ),
        KnownPost::new(
            "why-human-in-the-loop-is-the-foundation-of-responsible-ai-systems",
            "human-ai-responsible",
            26,
        ),
        KnownPost::new(
            "how-autonomy-drives-successful-mission-execution",
            "autonomy-mission",
            24,
        ),
        KnownPost::new(
            "internship-reflections-building-the-foundation-at-voxitec",
            "internship-office-team",
            11,
        ),
        KnownPost::new(
            "the-exciting-future-of-large-language-models-1",
            "ai-future-language",
            16,
        ),
    ]
}

#[derive(Debug, Clone)]
pub struct BlogConfig {
    pub origin: Url,
    pub blog_path: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Freshness window for the fetch cache.
    pub revalidate: Duration,
    pub secondary_fetch_window: usize,
    pub max_concurrent_fetches: usize,
    /// Hosts (suffix match) whose `<img>` sources count as post images.
    pub trusted_image_hosts: Vec<String>,
    pub placeholder: Picsum,
    allowed_slugs: Vec<String>,
    topics: HashMap<String, String>,
    picsum_ids: HashMap<String, u32>,
}

impl Default for BlogConfig {
    fn default() -> Self {
        let origin = Url::parse(DEFAULT_ORIGIN).unwrap();
        let trusted_image_hosts = vec![
            "cloudinary.com".to_string(),
            origin_site(&origin).to_string(),
        ];
        let mut cfg = Self {
            origin,
            blog_path: BLOG_PATH.to_string(),
            user_agent: USER_AGENT.to_string(),
            timeout: Duration::from_millis(10_000),
            revalidate: Duration::from_secs(300),
            secondary_fetch_window: SECONDARY_FETCH_WINDOW,
            max_concurrent_fetches: MAX_CONCURRENT_FETCHES,
            trusted_image_hosts,
            placeholder: Picsum::default(),
            allowed_slugs: Vec::new(),
            topics: HashMap::new(),
            picsum_ids: HashMap::new(),
        };
        cfg.set_known_posts(default_known_posts());
        cfg
    }
}

impl BlogConfig {
    /// Point the pipeline at a different origin. The origin site is trusted
    /// as an image host in place of the previous one.
    pub fn with_origin(mut self, origin: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(origin.trim())
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
            .ok_or_else(|| ConfigError::InvalidUrl(origin.to_string()))?;
        let old_site = origin_site(&self.origin).to_string();
        self.trusted_image_hosts.retain(|h| *h != old_site);
        self.trusted_image_hosts.push(origin_site(&parsed).to_string());
        self.origin = parsed;
        Ok(self)
    }

    /// Replace the curated posts. Slugs are trimmed and lowercased; empty and
    /// repeated slugs are dropped, keeping the first occurrence.
    pub fn with_known_posts(mut self, posts: Vec<KnownPost>) -> Result<Self, ConfigError> {
        let posts = clean_known_posts(posts);
        if posts.is_empty() {
            return Err(ConfigError::Empty);
        }
        self.set_known_posts(posts);
        Ok(self)
    }

    fn set_known_posts(&mut self, posts: Vec<KnownPost>) {
        self.allowed_slugs.clear();
        self.topics.clear();
        self.picsum_ids.clear();
        for p in posts {
            if let Some(topic) = p.topic {
                self.topics.insert(p.slug.clone(), topic);
            }
            if let Some(id) = p.picsum_id {
                self.picsum_ids.insert(p.slug.clone(), id);
            }
            self.allowed_slugs.push(p.slug);
        }
    }

    /// Allow-listed slugs in canonical publish order.
    pub fn allowed_slugs(&self) -> &[String] {
        &self.allowed_slugs
    }

    pub fn is_allowed(&self, slug: &str) -> bool {
        self.allowed_slugs.iter().any(|s| s == slug)
    }

    pub fn topic_for(&self, slug: &str) -> Option<&str> {
        self.topics.get(slug).map(String::as_str)
    }

    pub fn picsum_id_for(&self, slug: &str) -> Option<u32> {
        self.picsum_ids.get(slug).copied()
    }

    /// Listing page URL, e.g. `https://www.voxitec.com/blog`.
    pub fn blog_url(&self) -> Url {
        let mut u = self.origin.clone();
        u.set_path(&self.blog_path);
        u.set_query(None);
        u.set_fragment(None);
        u
    }

    pub fn post_url(&self, slug: &str) -> String {
        format!(
            "{}{}/{}",
            self.origin.origin().ascii_serialization(),
            self.blog_path.trim_end_matches('/'),
            slug
        )
    }
}

/// Host of the origin without a leading `www.`.
pub fn origin_site(origin: &Url) -> &str {
    let host = origin.host_str().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host)
}

#[derive(Deserialize)]
struct TomlAllowlist {
    posts: Vec<KnownPost>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonEntry {
    Slug(String),
    Post(KnownPost),
}

/// Load curated posts from a TOML (`[[posts]]` tables) or JSON (array of
/// slugs or post objects) file.
pub fn load_allowlist_from(path: &Path) -> Result<Vec<KnownPost>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let posts = if ext == "json" {
        parse_json(&content)?
    } else {
        parse_toml(&content)?
    };
    let posts = clean_known_posts(posts);
    if posts.is_empty() {
        return Err(ConfigError::Empty);
    }
    Ok(posts)
}

/// Explicit path first, then `$VOXITEC_NEWS_ALLOWLIST`. `None` means use the
/// built-in list.
pub fn load_allowlist(explicit: Option<&Path>) -> Result<Option<Vec<KnownPost>>, ConfigError> {
    if let Some(p) = explicit {
        return load_allowlist_from(p).map(Some);
    }
    match std::env::var(ENV_ALLOWLIST_PATH) {
        Ok(p) if !p.trim().is_empty() => load_allowlist_from(Path::new(p.trim())).map(Some),
        _ => Ok(None),
    }
}

fn parse_toml(s: &str) -> Result<Vec<KnownPost>, ConfigError> {
    let v: TomlAllowlist = toml::from_str(s)?;
    Ok(v.posts)
}

fn parse_json(s: &str) -> Result<Vec<KnownPost>, ConfigError> {
    let entries: Vec<JsonEntry> = serde_json::from_str(s)?;
    Ok(entries
        .into_iter()
        .map(|e| match e {
            JsonEntry::Slug(slug) => KnownPost {
                slug,
                topic: None,
                picsum_id: None,
            },
            JsonEntry::Post(p) => p,
        })
        .collect())
}

fn clean_known_posts(items: Vec<KnownPost>) -> Vec<KnownPost> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for mut it in items {
        let slug = it.slug.trim().trim_matches('/').to_lowercase();
        if slug.is_empty() || !seen.insert(slug.clone()) {
            continue;
        }
        it.slug = slug;
        it.topic = it
            .topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        out.push(it);
    }
    out
}
