//! Cache command - inspect and prune the extraction cache.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;
use tracing::warn;

use bnk_core::{MemoryCache, ResultCache};

use super::default_cache_path;

/// Arguments for the cache command.
#[derive(Args)]
pub struct CacheArgs {
    /// Cache file (defaults to the user data directory)
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: CacheCommand,
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Show size, hit rate and the most reused entries
    Stats,

    /// Remove expired entries
    Cleanup,

    /// Remove every entry, keeping an empty cache file
    Clear,
}

pub fn run(args: CacheArgs) -> anyhow::Result<()> {
    let path = args.file.unwrap_or_else(default_cache_path);

    match args.command {
        CacheCommand::Stats => {
            let cache = MemoryCache::load(&path)?;
            let stats = cache.stats();

            println!("Cache file: {}", path.display());
            println!("Entries: {}", style(stats.size).bold());
            println!("Hit rate: {:.1}%", stats.hit_rate);
            if !stats.most_used.is_empty() {
                println!();
                println!("Most used:");
                for usage in &stats.most_used {
                    println!("  {:>4}  {}", usage.usage_count, usage.key);
                }
            }
        }
        CacheCommand::Cleanup => {
            let mut cache = MemoryCache::load(&path)?;
            let removed = cache.cleanup();
            cache.save(&path)?;
            println!(
                "{} Removed {} expired entries, {} left",
                style("✓").green(),
                removed,
                cache.len()
            );
        }
        CacheCommand::Clear => {
            // An unreadable file is replaced by an empty cache.
            let mut cache = MemoryCache::load(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "discarding unreadable cache");
                MemoryCache::new()
            });
            let removed = cache.len();
            cache.clear();
            cache.save(&path)?;
            println!(
                "{} Cache cleared ({} entries removed)",
                style("✓").green(),
                removed
            );
        }
    }

    Ok(())
}
