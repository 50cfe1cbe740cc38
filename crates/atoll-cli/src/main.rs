//! `atoll`: inspect server-list continuums from the command line.
//!
//! # Usage
//!
//! ```text
//! atoll pick -s servers.list user:1234 session:9876
//! atoll servers -s servers.list
//! atoll dump -s servers.list --limit 20
//! atoll stats -s servers.list -n 10000
//! atoll hash user:1234
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use atoll_hash::{ring_hash, Crc32Hasher, Md5Hasher, RingHasher};
use atoll_ring::Continuum;
use atoll_source::load_entries;
use clap::{Args, Parser, Subcommand};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "atoll", version, about = "Weighted consistent hashing ring inspector")]
struct Cli {
    /// Log level filter (overridden by RUST_LOG).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the server each key maps to.
    Pick {
        #[command(flatten)]
        ring: RingArgs,

        /// Keys to look up.
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Print the distinct servers on the ring, in ring order.
    Servers {
        #[command(flatten)]
        ring: RingArgs,
    },

    /// Print ring points as `<hash> <server>`, ascending by hash.
    Dump {
        #[command(flatten)]
        ring: RingArgs,

        /// Print at most this many points.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Pick servers for a sequential key sample and report the
    /// per-server distribution.
    Stats {
        #[command(flatten)]
        ring: RingArgs,

        /// Number of sequential integer keys to sample.
        #[arg(short = 'n', long, default_value_t = 10_000)]
        keys: usize,
    },

    /// Print the 32-bit ring hash of each key.
    Hash {
        /// Keys to hash.
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

#[derive(Args)]
struct RingArgs {
    /// Path to the server list, one `<address>TAB<weight>` per line.
    #[arg(short, long)]
    servers: PathBuf,

    /// Hash with CRC-32 instead of MD5 (unweighted lists only).
    #[arg(long)]
    crc32: bool,
}

impl RingArgs {
    fn build_continuum(&self) -> Result<Continuum> {
        let entries = load_entries(&self.servers)
            .with_context(|| format!("failed to load server list {}", self.servers.display()))?;

        let hasher: Arc<dyn RingHasher> = if self.crc32 {
            Arc::new(Crc32Hasher)
        } else {
            Arc::new(Md5Hasher)
        };

        Continuum::build_with_hasher(&entries, hasher).context("failed to build continuum")
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(&cli.log_level);

    match cli.command {
        Commands::Pick { ring, keys } => cmd_pick(&ring.build_continuum()?, &keys),
        Commands::Servers { ring } => cmd_servers(&ring.build_continuum()?),
        Commands::Dump { ring, limit } => cmd_dump(&ring.build_continuum()?, limit),
        Commands::Stats { ring, keys } => cmd_stats(&ring.build_continuum()?, keys),
        Commands::Hash { keys } => cmd_hash(&keys),
    }
}

/// Initialize the tracing subscriber with the given level filter.
///
/// `RUST_LOG` takes precedence when set.
fn setup_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_pick(continuum: &Continuum, keys: &[String]) -> Result<()> {
    for key in keys {
        let server = continuum.pick_server(key)?;
        println!("{key}\t{server}");
    }
    Ok(())
}

fn cmd_servers(continuum: &Continuum) -> Result<()> {
    for server in continuum.servers() {
        println!("{server}");
    }
    Ok(())
}

fn cmd_dump(continuum: &Continuum, limit: Option<usize>) -> Result<()> {
    let total = continuum.point_count();
    let shown = limit.unwrap_or(total).min(total);

    for (hash, server) in continuum.points().take(shown) {
        println!("{hash:>10} {server}");
    }
    if shown < total {
        println!("({shown} of {total} points)");
    }
    Ok(())
}

fn cmd_stats(continuum: &Continuum, keys: usize) -> Result<()> {
    ensure!(keys > 0, "key sample must not be empty");

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for i in 0..keys {
        let server = continuum.pick_server(i.to_string())?;
        *counts.entry(server.name()).or_default() += 1;
    }

    println!(
        "{keys} keys over {} points on {} servers",
        continuum.point_count(),
        continuum.servers().count(),
    );
    for server in continuum.servers() {
        let count = counts.get(server.name()).copied().unwrap_or(0);
        let share = count as f64 / keys as f64 * 100.0;
        println!("{server}\t{count}\t{share:.1}%");
    }
    Ok(())
}

fn cmd_hash(keys: &[String]) -> Result<()> {
    for key in keys {
        println!("{key}\t{}", ring_hash(key));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
