use crowdstarter_core::ledger::{Ledger, LedgerEvent, Receipt};
use crowdstarter_core::{CoreError, Repository, Transaction};

// ==============================================================================
// Replay
// ==============================================================================

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub rejected: usize,
    /// Journal line of the rejection that stopped the replay.
    pub stopped_at: Option<usize>,
}

/// Apply journal entries in order, printing one line per transaction.
///
/// Rejections are counted and, unless `keep_going`, stop the replay.
/// Collaborator failures (persistence, I/O) always abort with the error.
pub async fn replay<R: Repository>(
    ledger: &Ledger<R>,
    entries: &[(usize, Transaction)],
    keep_going: bool,
) -> Result<ReplaySummary, CoreError> {
    let mut summary = ReplaySummary::default();

    for (line, tx) in entries {
        let project = tx.backed_project().map(|p| p.as_str()).unwrap_or("-");
        match ledger.apply(tx).await {
            Ok(receipt) => {
                summary.applied += 1;
                println!("  line {line}: {} {project} ok: {}", tx.kind(), describe(&receipt));
            }
            Err(e) if e.is_rejection() => {
                summary.rejected += 1;
                println!("  line {line}: {} {project} rejected: {e}", tx.kind());
                if !keep_going {
                    summary.stopped_at = Some(*line);
                    break;
                }
            }
            Err(e) => return Err(e),
        }
    }

    Ok(summary)
}

/// One-line human summary of a receipt.
fn describe(receipt: &Receipt) -> String {
    let mut returned = 0u64;
    let mut parts = Vec::new();
    for event in &receipt.events {
        match event {
            LedgerEvent::Pledged {
                backer,
                value,
                project_balance,
                ..
            } => parts.push(format!(
                "{backer} pledged {value} (escrow {})",
                project_balance.after
            )),
            LedgerEvent::Returned { value, .. } => returned += value.0,
            LedgerEvent::PaidOut { creator, value, .. } => {
                parts.push(format!("{value} paid to {creator}"))
            }
            LedgerEvent::Closed { outcome, .. } => {
                if returned > 0 {
                    parts.push(format!("{returned} returned to backers"));
                }
                parts.push(format!("closed ({outcome})"));
            }
        }
    }
    parts.join(", ")
}
