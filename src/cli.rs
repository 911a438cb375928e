use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Crawl(CrawlArgs),
}

#[derive(Debug, Args)]
pub struct CrawlArgs {
    /// Scan target: a start URL, or a bare host seeded over https and http.
    pub target: String,

    /// Maximum HTTP requests (fetches).
    #[arg(long, default_value_t = 120)]
    pub max_requests: u32,

    /// Maximum unique canonical URLs tracked.
    #[arg(long, default_value_t = 2500)]
    pub max_nodes: u32,

    /// Maximum crawl time in seconds.
    #[arg(long, default_value_t = 25.0)]
    pub max_time_s: f64,

    /// Maximum discovery depth (unlimited when unset).
    #[arg(long)]
    pub max_depth: Option<u32>,

    /// Maximum URLs per normalized URL pattern.
    #[arg(long, default_value_t = 30)]
    pub max_per_pattern: u32,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 8)]
    pub timeout_s: u64,

    /// Delay between requests in milliseconds.
    #[arg(long, default_value_t = 300)]
    pub rate_limit_ms: u64,

    /// Keep tracking query params (utm_*, gclid, ...).
    #[arg(long, default_value_t = false)]
    pub keep_tracking: bool,

    /// Comma-separated queries recorded as ?query= variants of fetched pages.
    #[arg(long)]
    pub seed_queries: Option<String>,

    /// Enable headless render discovery (needs a renderer-equipped build).
    #[arg(long, default_value_t = false)]
    pub headless: bool,

    /// Also write the JSON report to this path.
    #[arg(long)]
    pub out: Option<String>,
}
