use clap::{Parser, ValueEnum};
use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use voxitec_news::config::{load_allowlist, DEFAULT_ORIGIN};
use voxitec_news::feed::{write_json, write_rss};
use voxitec_news::{get_blog_posts, BlogConfig, CachingFetcher, HttpFetcher, Post};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Rss,
    Json,
}

/// voxitec-news - scrape the Voxitec blog into an ordered feed of posts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Site origin hosting the blog
    #[arg(long, default_value = DEFAULT_ORIGIN)]
    origin: String,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = Format::Rss)]
    format: Format,

    /// Timeout in milliseconds for each network request
    #[arg(short = 't', long = "timeout-ms", default_value_t = 10000)]
    timeout_ms: u64,

    /// Seconds a fetched page stays fresh before it is fetched again
    #[arg(long = "revalidate-secs", default_value_t = 300)]
    revalidate_secs: u64,

    /// TOML or JSON file with the curated posts (overrides $VOXITEC_NEWS_ALLOWLIST)
    #[arg(long)]
    allowlist: Option<PathBuf>,

    /// Keep running, re-emitting the feed every revalidate interval
    #[arg(long)]
    watch: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("voxitec_news=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(io::stderr))
        .init();
}

fn main() {
    init_tracing();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(4);
        }
    }
}

fn build_config(args: &Args) -> Result<BlogConfig, Box<dyn Error>> {
    let mut cfg = BlogConfig::default().with_origin(&args.origin)?;
    cfg.timeout = Duration::from_millis(args.timeout_ms);
    cfg.revalidate = Duration::from_secs(args.revalidate_secs);
    if let Some(posts) = load_allowlist(args.allowlist.as_deref())? {
        cfg = cfg.with_known_posts(posts)?;
    }
    Ok(cfg)
}

fn emit(format: Format, cfg: &BlogConfig, posts: &[Post]) -> Result<(), Box<dyn Error>> {
    let stdout = io::stdout().lock();
    match format {
        Format::Rss => write_rss(stdout, cfg.blog_url().as_str(), posts),
        Format::Json => write_json(stdout, posts),
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let cfg = build_config(args)?;
    let fetcher = CachingFetcher::new(HttpFetcher::new(&cfg)?, cfg.revalidate);

    loop {
        let posts = get_blog_posts(&fetcher, &cfg);
        if posts.is_empty() {
            warn!(url = %cfg.blog_url(), "nothing to display");
        }
        emit(args.format, &cfg, &posts)?;

        if !args.watch {
            return Ok(());
        }
        info!(secs = cfg.revalidate.as_secs(), "waiting for next refresh");
        sleep(cfg.revalidate.max(Duration::from_secs(1)));
    }
}
