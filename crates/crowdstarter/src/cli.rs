use std::path::PathBuf;

use clap::Parser;

/// Crowdstarter: replay escrow transactions against a ledger snapshot.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Ledger snapshot (JSON). Rewritten after every committed transaction
    /// unless `--dry-run` is set.
    #[arg(long, env = "CROWDSTARTER_STATE")]
    pub state: PathBuf,

    /// Transaction journal (JSONL, one transaction per line).
    #[arg(long, env = "CROWDSTARTER_JOURNAL")]
    pub journal: PathBuf,

    /// Apply transactions in memory only; never write the snapshot.
    #[arg(long)]
    pub dry_run: bool,

    /// Continue after a rejected transaction instead of stopping.
    #[arg(long)]
    pub keep_going: bool,
}
