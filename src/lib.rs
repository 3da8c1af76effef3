//! voxitec-news - the Voxitec blog listing as a fixed, ordered list of posts.
//!
//! The listing page is scraped with three regex passes, filtered to a curated
//! allow-list (missing posts are synthesized), sorted into publish order, and
//! given an image from the listing, the post page, or a placeholder.

pub mod config;
pub mod dates;
pub mod feed;
pub mod fetch;
pub mod images;
pub mod links;
pub mod pipeline;
pub mod posts;
pub mod slug;
pub mod text;
pub mod urls;

pub use config::BlogConfig;
pub use fetch::{CachingFetcher, Fetch, FetchError, HttpFetcher};
pub use pipeline::{get_blog_posts, posts_from_listing};
pub use posts::Post;
