mod cli;
mod replay;

use std::sync::Arc;

use clap::Parser;
use eyre::{eyre, WrapErr};

use crowdstarter_core::audit::audit;
use crowdstarter_core::journal::load_journal;
use crowdstarter_core::{Ledger, MemoryRepository, Snapshot};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .init();

    // A dry run works on a detached copy so the snapshot file is never
    // touched, even by successful transactions.
    let repo = if args.dry_run {
        let snapshot = Snapshot::load(&args.state)
            .await
            .with_context(|| format!("load ledger snapshot {}", args.state.display()))?;
        MemoryRepository::from_snapshot(snapshot).context("index ledger snapshot")?
    } else {
        MemoryRepository::with_persistence(&args.state)
            .await
            .with_context(|| format!("open ledger snapshot {}", args.state.display()))?
    };
    let ledger = Ledger::new(Arc::new(repo));

    let entries = load_journal(&args.journal)
        .await
        .with_context(|| format!("load transaction journal {}", args.journal.display()))?;

    let before = ledger.repository().snapshot().await;
    tracing::info!(
        backers = before.backers.len(),
        creators = before.creators.len(),
        projects = before.projects.len(),
        transactions = entries.len(),
        dry_run = args.dry_run,
        "replaying journal"
    );
    for violation in audit(&before) {
        tracing::warn!(%violation, "snapshot violates a ledger invariant before replay");
    }

    println!();
    let summary = replay::replay(&ledger, &entries, args.keep_going)
        .await
        .context("apply transaction journal")?;

    let after = ledger.repository().snapshot().await;
    let violations = audit(&after);

    println!();
    println!("  applied:   {}", summary.applied);
    println!("  rejected:  {}", summary.rejected);
    println!("  supply:    {} -> {}", before.total_supply(), after.total_supply());
    if let Some(line) = summary.stopped_at {
        println!("  stopped at line {line} (use --keep-going to continue past rejections)");
    }
    for violation in &violations {
        println!("  violation: {violation}");
    }
    println!();

    if before.total_supply() != after.total_supply() {
        return Err(eyre!(
            "token supply changed from {} to {}",
            before.total_supply(),
            after.total_supply()
        ));
    }
    if !violations.is_empty() {
        return Err(eyre!("{} ledger invariant violation(s)", violations.len()));
    }
    if summary.rejected > 0 {
        return Err(eyre!("{} transaction(s) rejected", summary.rejected));
    }
    Ok(())
}
