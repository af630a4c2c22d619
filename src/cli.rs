// CLI commands

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::chain::Chain;
use crate::config::ChainConfig;
use crate::consensus::{NoProgress, ProgressObserver, SearchControl};
use crate::core::{Block, Hash256};

/// Records mined when none are given on the command line
pub const DEFAULT_RECORDS: [&str; 2] = ["First block", "Second block"];

#[derive(Parser)]
#[command(name = "powchain")]
#[command(about = "Proof-of-work hash chain", long_about = None)]
pub struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Difficulty in bits (overrides the config file)
    #[arg(short, long, global = true)]
    pub difficulty: Option<u32>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a chain from the given records and print every block
    Mine {
        /// Records to append after the genesis block
        data: Vec<String>,

        /// Highest nonce to try per block
        #[arg(long)]
        max_nonce: Option<u64>,

        /// Give up on a block after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Print the chain as JSON
        #[arg(long)]
        json: bool,

        /// Show the digest of every attempt on stderr
        #[arg(long)]
        progress: bool,
    },

    /// Show the target for the configured difficulty
    Target,
}

impl Cli {
    /// Resolve the chain config from the file and flag overrides
    pub fn chain_config(&self) -> anyhow::Result<ChainConfig> {
        let mut config = match &self.config {
            Some(path) => ChainConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ChainConfig::default(),
        };

        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        if let Commands::Mine { max_nonce: Some(max_nonce), .. } = &self.command {
            config.max_nonce = *max_nonce;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Rewrites the current candidate digest on a single terminal line.
///
/// Observers cannot fail the search, so the first write error is held and
/// returned from [`ProgressPrinter::finish`]; later attempts are not printed.
pub struct ProgressPrinter<W: Write> {
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> ProgressPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out, error: None }
    }

    /// End the progress line, reporting any write that failed while mining
    pub fn finish(mut self) -> io::Result<()> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        writeln!(self.out)
    }
}

impl<W: Write> ProgressObserver for ProgressPrinter<W> {
    fn on_attempt(&mut self, _nonce: u64, hash: &Hash256) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = write!(self.out, "\r{}", hash) {
            self.error = Some(e);
        }
    }
}

fn search_control(timeout_secs: Option<u64>) -> SearchControl {
    match timeout_secs {
        Some(secs) => SearchControl::new().with_timeout(Duration::from_secs(secs)),
        None => SearchControl::new(),
    }
}

/// CLI handler
pub struct CliHandler<W: Write> {
    config: ChainConfig,
    out: W,
}

impl<W: Write> CliHandler<W> {
    pub fn new(config: ChainConfig, out: W) -> Self {
        Self { config, out }
    }

    /// Handle CLI command
    pub fn handle(&mut self, command: Commands) -> anyhow::Result<()> {
        match command {
            Commands::Mine { data, timeout_secs, json, progress, .. } => {
                self.mine(data, timeout_secs, json, progress)
            }
            Commands::Target => self.target(),
        }
    }

    fn mine(
        &mut self,
        data: Vec<String>,
        timeout_secs: Option<u64>,
        json: bool,
        progress: bool,
    ) -> anyhow::Result<()> {
        let start = Instant::now();

        let records = if data.is_empty() {
            DEFAULT_RECORDS.iter().map(|s| s.to_string()).collect()
        } else {
            data
        };

        let mut printer = ProgressPrinter::new(io::stderr());
        let mut quiet = NoProgress;
        let observer: &mut dyn ProgressObserver = if progress { &mut printer } else { &mut quiet };

        // Each block gets its own timeout window
        let mut chain = Chain::new_with(&self.config, &search_control(timeout_secs), observer)?;
        for record in records {
            chain.append_with(record, &search_control(timeout_secs), observer)?;
        }

        if progress {
            printer.finish()?;
        }

        if json {
            writeln!(self.out, "{}", serde_json::to_string_pretty(&chain)?)?;
        } else {
            for block in &chain {
                write_block(&mut self.out, block)?;
            }
        }

        let valid = chain.validate();
        writeln!(self.out, "Chain valid: {}", valid)?;
        writeln!(self.out, "Elapsed: {:?}", start.elapsed())?;

        if !valid {
            bail!("mined chain failed validation");
        }
        Ok(())
    }

    fn target(&mut self) -> anyhow::Result<()> {
        let target = self.config.target()?;
        writeln!(self.out, "Difficulty: {} bits", target.difficulty())?;
        writeln!(self.out, "Target: {}", target)?;
        writeln!(self.out, "Expected attempts: {}", target.expected_attempts())?;
        Ok(())
    }
}

/// Print block information
pub fn write_block<W: Write>(out: &mut W, block: &Block) -> std::io::Result<()> {
    writeln!(out, "Index: {}", block.index())?;
    writeln!(out, "Nonce: {}", block.nonce())?;
    writeln!(out, "Timestamp: {}", block.timestamp())?;
    writeln!(out, "Data: {}", block.data())?;
    writeln!(out, "Hash: {}", block.hash())?;
    writeln!(out, "PrevHash: {}", block.prev_hash())?;
    Ok(())
}
