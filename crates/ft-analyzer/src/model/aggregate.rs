//! Metric aggregation over filtered records.

use ft_common::FlowRecord;

use super::types::MetricType;

/// Sum of `metric` over `records`.
///
/// Packet and byte totals include the reverse direction; `FLOWS` counts
/// records, which after reconciliation are logical flows.
pub fn aggregate<'a, I>(records: I, metric: MetricType) -> u64
where
    I: IntoIterator<Item = &'a FlowRecord>,
{
    let records = records.into_iter();
    match metric {
        MetricType::Packets => records.fold(0u64, |acc, r| acc.saturating_add(r.total_packets())),
        MetricType::Bytes => records.fold(0u64, |acc, r| acc.saturating_add(r.total_bytes())),
        MetricType::Flows => records.count() as u64,
    }
}
