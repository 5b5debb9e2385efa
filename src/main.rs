use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use proxy_scout::{
    logging::init_logging,
    proxy::{
        checker::{
            DEFAULT_BATCH_SIZE, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_HANDSHAKE_TIMEOUT_MS,
            DEFAULT_POLL_INTERVAL_MS,
        },
        crawler::DEFAULT_TIMEOUT_SECS as DEFAULT_FETCH_TIMEOUT_SECS,
        pipeline, rank_outcomes, ChannelCrawler, ChannelDocument, ConnectivityProber, CrawlerConfig,
        ProberConfig, ProbeOutcome, ProxyRecord,
    },
    report,
    store::ResultCache,
    Config, DEFAULT_CACHE_TTL_SECS,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Find, validate and rank MTProto proxies advertised in channels
#[derive(Parser)]
#[command(name = "proxy-scout")]
#[command(about = "Find, validate and rank MTProto proxies advertised in channels")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Result cache file path
    #[arg(short, long, default_value = "proxies.json", global = true)]
    cache: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch channels, probe their proxies and print the ranking
    Scan(ScanArgs),
    /// Print the proxy links found in a local file
    Extract {
        /// Input file (HTML or plain text)
        input: PathBuf,
        /// Treat the input as one proxy link per line
        #[arg(short, long)]
        lines: bool,
    },
    /// Probe the proxy links found in a local file
    Check {
        /// Input file (HTML or plain text)
        input: PathBuf,
        /// Treat the input as one proxy link per line
        #[arg(short, long)]
        lines: bool,
        /// Save ranked results to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        probe: ProbeArgs,
    },
    /// Print the cached ranking
    Show {
        /// Only show online proxies
        #[arg(long)]
        online_only: bool,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Channel to scan (can specify multiple)
    #[arg(long = "channel")]
    channels: Vec<String>,
    /// File containing channels to scan (one per line)
    #[arg(short = 'f', long)]
    channel_file: Option<PathBuf>,
    /// Ignore a fresh cache and scan again
    #[arg(long)]
    refresh: bool,
    /// Cache lifetime in seconds
    #[arg(long, default_value_t = DEFAULT_CACHE_TTL_SECS)]
    cache_ttl: u64,
    /// Timeout in seconds for HTTP requests
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    fetch_timeout: u64,
    /// Only show online proxies
    #[arg(long)]
    online_only: bool,
    #[command(flatten)]
    probe: ProbeArgs,
}

#[derive(Args)]
struct ProbeArgs {
    /// Number of proxies probed together
    #[arg(short = 'n', long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,
    /// Batch deadline in seconds
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_MS / 1000)]
    timeout: u64,
    /// Readiness poll slice in milliseconds
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    poll_ms: u64,
    /// Echo check timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_HANDSHAKE_TIMEOUT_MS)]
    handshake_ms: u64,
}

impl Default for ScanArgs {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            channel_file: None,
            refresh: false,
            cache_ttl: DEFAULT_CACHE_TTL_SECS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT_SECS,
            online_only: false,
            probe: ProbeArgs::default(),
        }
    }
}

impl Default for ProbeArgs {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: DEFAULT_CONNECT_TIMEOUT_MS / 1000,
            poll_ms: DEFAULT_POLL_INTERVAL_MS,
            handshake_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
        }
    }
}

impl ProbeArgs {
    fn prober(&self) -> ConnectivityProber {
        let config = ProberConfig::new()
            .with_batch_size(self.batch_size)
            .with_connect_timeout(Duration::from_secs(self.timeout))
            .with_poll_interval(Duration::from_millis(self.poll_ms))
            .with_handshake_timeout(Duration::from_millis(self.handshake_ms));
        ConnectivityProber::with_config(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = Config::default().with_cache_path(cli.cache);

    match cli.command.unwrap_or_else(|| Commands::Scan(ScanArgs::default())) {
        Commands::Scan(args) => scan(config, args).await?,
        Commands::Extract { input, lines } => {
            let records = read_records(&input, lines)?;

            println!("Found {} proxies in {:?}", records.len(), input);
            for record in &records {
                println!("{}", record);
            }
        }
        Commands::Check {
            input,
            lines,
            output,
            probe,
        } => {
            let records = read_records(&input, lines)?;
            let outcomes = pipeline::check_records(records, &probe.prober()).await;

            if let Some(path) = output {
                ResultCache::new(&path).save(&outcomes)?;
                println!("Saved {} results to {:?}", outcomes.len(), path);
            }
            print!("{}", report::render(&outcomes));
        }
        Commands::Show { online_only } => {
            let cache = config.cache();
            let outcomes = cache
                .load()?
                .with_context(|| format!("no cached results at {:?}", cache.path()))?;
            if let Some(checked_at) = cache.checked_at()? {
                println!("Checked at {}\n", checked_at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            print!("{}", report::render(&filter_online(outcomes, online_only)));
        }
    }

    Ok(())
}

async fn scan(config: Config, args: ScanArgs) -> Result<()> {
    let config = config.with_cache_ttl(Duration::from_secs(args.cache_ttl));
    let cache = config.cache();

    if !args.refresh && cache.is_fresh(config.cache_ttl) {
        if let Some(outcomes) = cache.load()? {
            info!(path = ?cache.path(), "using cached results");
            print!("{}", report::render(&filter_online(rank_outcomes(outcomes), args.online_only)));
            return Ok(());
        }
    }

    let mut channels = args.channels.clone();
    if let Some(path) = &args.channel_file {
        channels.extend(ChannelCrawler::load_channel_list(path)?);
    }
    if channels.is_empty() {
        channels = ChannelCrawler::default_channels();
    }

    let crawler = ChannelCrawler::with_config(
        CrawlerConfig::new().with_timeout(Duration::from_secs(args.fetch_timeout)),
    )?;
    info!(channels = channels.len(), "fetching channels");
    let documents = crawler.fetch_all(&channels).await;

    let outcomes = pipeline::run(&documents, &args.probe.prober()).await;
    cache.save(&outcomes)?;
    info!(path = ?cache.path(), results = outcomes.len(), "saved results");

    print!("{}", report::render(&filter_online(outcomes, args.online_only)));
    Ok(())
}

/// Collect the records of a local file, either as a document or as a link list
fn read_records(input: &Path, lines: bool) -> Result<Vec<ProxyRecord>> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {:?}", input))?;

    if lines {
        Ok(pipeline::collect_link_lines(&text))
    } else {
        Ok(pipeline::collect_records(&[ChannelDocument::new(
            input.display().to_string(),
            text,
        )]))
    }
}

fn filter_online(outcomes: Vec<ProbeOutcome>, online_only: bool) -> Vec<ProbeOutcome> {
    if online_only {
        outcomes.into_iter().filter(ProbeOutcome::is_online).collect()
    } else {
        outcomes
    }
}
