//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};

/// Resumable batch downloader for game patch archives.
///
/// patchdl scrapes a patch listing page (or takes URLs directly), then
/// fetches the selected files with byte-range resumption, global
/// pause/resume, and bounded parallel connections.
#[derive(Parser, Debug)]
#[command(name = "patchdl")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: $XDG_CONFIG_HOME/patchdl/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Discover downloadable files and print them without fetching
    List {
        /// Listing page URL (overrides the configured one)
        #[arg(long, value_name = "URL")]
        listing: Option<String>,

        /// Regex a link's URL path must match
        #[arg(long, value_name = "REGEX")]
        pattern: Option<String>,
    },

    /// Download files from explicit URLs or the configured listing page
    Fetch {
        /// URLs to download; stdin is read when piped and none are given
        #[arg(value_name = "URL")]
        urls: Vec<String>,

        /// Destination directory for downloaded files
        #[arg(short = 'd', long, value_name = "DIR")]
        dest: Option<PathBuf>,

        /// Maximum concurrent downloads (1-16)
        #[arg(short = 'p', long, value_parser = clap::value_parser!(u8).range(1..=16))]
        parallel: Option<u8>,

        /// Items to fetch as 1-based indexes and ranges, e.g. "1,3-5"
        #[arg(long, value_name = "LIST")]
        select: Option<String>,

        /// Listing page URL (overrides the configured one)
        #[arg(long, value_name = "URL")]
        listing: Option<String>,

        /// Regex a link's URL path must match
        #[arg(long, value_name = "REGEX")]
        pattern: Option<String>,
    },
}

/// Parses a `--select` expression into 0-based item indexes.
///
/// Accepts comma-separated 1-based indexes and inclusive ranges
/// (`"1,3-5"`), tolerates whitespace, and deduplicates. `count` is the
/// number of discovered items.
///
/// # Errors
///
/// Fails on empty or non-numeric tokens, reversed ranges, and indexes
/// outside `1..=count`.
pub fn parse_selection(spec: &str, count: usize) -> Result<Vec<usize>> {
    let mut picked = vec![false; count];

    for token in spec.split(',') {
        let token = token.trim();
        if token.is_empty() {
            bail!("Empty entry in selection '{spec}'");
        }

        let (start, end) = match token.split_once('-') {
            Some((lo, hi)) => (parse_index(lo, count)?, parse_index(hi, count)?),
            None => {
                let index = parse_index(token, count)?;
                (index, index)
            }
        };
        if start > end {
            bail!("Reversed range '{token}' in selection");
        }
        for slot in &mut picked[start..=end] {
            *slot = true;
        }
    }

    Ok(picked
        .iter()
        .enumerate()
        .filter_map(|(index, marked)| marked.then_some(index))
        .collect())
}

/// One 1-based selection token to a 0-based index.
fn parse_index(token: &str, count: usize) -> Result<usize> {
    let value: usize = token
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid selection entry '{token}': expected a number"))?;
    if value == 0 || value > count {
        bail!("Selection entry {value} is out of range (1-{count})");
    }
    Ok(value - 1)
}
