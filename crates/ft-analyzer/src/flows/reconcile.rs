//! Reconciliation of flows split by active-timeout expiry.
//!
//! Exporters flush long-lived flows every `active_timeout`, so one logical
//! flow shows up as several consecutive records with the same key. Two
//! consecutive records of one key are merged when:
//! - the earlier record lasted at least `active_timeout`, and
//! - the gap from its end to the next record's start is at most
//!   `inactive_timeout` (overlap counts as zero gap).
//!
//! A short record followed by a gap is a separate flow and stays separate.
//! Durations and gaps use the record span across both directions.

use ft_common::{FlowKey, FlowRecord};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Exporter timeout pair in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timeouts {
    pub active_ms: i64,
    pub inactive_ms: i64,
}

impl Timeouts {
    pub fn from_secs(active: u64, inactive: u64) -> Self {
        let to_ms = |secs: u64| i64::try_from(secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        Timeouts {
            active_ms: to_ms(active),
            inactive_ms: to_ms(inactive),
        }
    }
}

/// Errors from reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("record #{position} ({key}) ends before it starts ({start} > {end})")]
    ReversedTimestamps {
        position: usize,
        key: FlowKey,
        start: i64,
        end: i64,
    },
}

impl From<ReconcileError> for ft_common::Error {
    fn from(err: ReconcileError) -> Self {
        ft_common::Error::Reconciliation(err.to_string())
    }
}

/// Counters describing one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    /// Records handed to the reconciler.
    pub records_in: usize,
    /// Logical flows produced.
    pub flows_out: usize,
    /// Records folded into an earlier record.
    pub merges: usize,
    /// Distinct flow keys.
    pub keys: usize,
    /// Distinct keys once both directions of a conversation are folded.
    pub conversations: usize,
}

/// Merge timeout-split records into logical flows.
///
/// Output order: keys in order of first appearance, flows of one key by
/// start time.
pub fn reconcile(
    records: &[FlowRecord],
    timeouts: Timeouts,
) -> Result<(Vec<FlowRecord>, ReconcileStats), ReconcileError> {
    for (idx, rec) in records.iter().enumerate() {
        if !rec.is_ordered() {
            let (start, end) = match rec.reverse {
                Some(rev) if rec.start <= rec.end => (rev.start, rev.end),
                _ => (rec.start, rec.end),
            };
            return Err(ReconcileError::ReversedTimestamps {
                position: idx + 1,
                key: rec.key(),
                start,
                end,
            });
        }
    }

    let mut group_of: HashMap<FlowKey, usize> = HashMap::new();
    let mut groups: Vec<Vec<&FlowRecord>> = Vec::new();
    for rec in records {
        let next = groups.len();
        let idx = *group_of.entry(rec.key()).or_insert(next);
        if idx == next {
            groups.push(Vec::new());
        }
        groups[idx].push(rec);
    }

    let mut stats = ReconcileStats {
        records_in: records.len(),
        keys: groups.len(),
        conversations: group_of
            .keys()
            .map(|key| key.normalized())
            .collect::<HashSet<_>>()
            .len(),
        ..Default::default()
    };
    let mut flows = Vec::with_capacity(records.len());

    for mut group in groups {
        // Stable: equal spans keep input order.
        group.sort_by_key(|rec| rec.span());

        let mut pieces = group.into_iter();
        let Some(first) = pieces.next() else {
            continue;
        };
        let mut current = first.clone();
        let mut last_piece = first;

        for piece in pieces {
            if is_continuation(last_piece, piece, timeouts) {
                current.absorb(piece);
                stats.merges += 1;
            } else {
                flows.push(std::mem::replace(&mut current, piece.clone()));
            }
            last_piece = piece;
        }
        flows.push(current);
    }

    stats.flows_out = flows.len();
    Ok((flows, stats))
}

/// Whether `next` continues the flow that `prev` was cut from.
fn is_continuation(prev: &FlowRecord, next: &FlowRecord, timeouts: Timeouts) -> bool {
    let (prev_start, prev_end) = prev.span();
    let (next_start, _) = next.span();

    // Timestamps span the whole i64 range; saturate instead of wrapping.
    let duration = prev_end.saturating_sub(prev_start);
    let gap = next_start.saturating_sub(prev_end).max(0);

    duration >= timeouts.active_ms && gap <= timeouts.inactive_ms
}
