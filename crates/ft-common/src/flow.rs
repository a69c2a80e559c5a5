//! Flow record model.
//!
//! A [`FlowRecord`] is one exported flow observation. Biflow-aware exporters
//! attach a [`ReverseCounters`] block describing the opposite direction.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::time::TimestampMs;

/// Identity of a flow for reconciliation purposes.
///
/// Direction-sensitive: `a -> b` and `b -> a` are different keys unless
/// [`FlowKey::normalized`] is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowKey {
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
    pub l3_proto: u8,
    pub l4_proto: u8,
}

impl FlowKey {
    /// Canonical endpoint order so both directions share one key.
    pub fn normalized(self) -> Self {
        if (self.src_ip, self.src_port) <= (self.dst_ip, self.dst_port) {
            self
        } else {
            FlowKey {
                src_ip: self.dst_ip,
                dst_ip: self.src_ip,
                src_port: self.dst_port,
                dst_port: self.src_port,
                ..self
            }
        }
    }
}

impl std::fmt::Display for FlowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{} (l3={}, l4={})",
            self.src_ip, self.src_port, self.dst_ip, self.dst_port, self.l3_proto, self.l4_proto
        )
    }
}

/// Reverse-direction counterpart of a biflow record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseCounters {
    pub start: TimestampMs,
    pub end: TimestampMs,
    pub packets: u64,
    pub bytes: u64,
}

/// One exported flow observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
    pub l3_proto: u8,
    pub l4_proto: u8,
    /// First packet of the forward direction.
    pub start: TimestampMs,
    /// Last packet of the forward direction.
    pub end: TimestampMs,
    pub packets: u64,
    pub bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse: Option<ReverseCounters>,
}

impl FlowRecord {
    pub fn key(&self) -> FlowKey {
        FlowKey {
            src_ip: self.src_ip,
            dst_ip: self.dst_ip,
            src_port: self.src_port,
            dst_port: self.dst_port,
            l3_proto: self.l3_proto,
            l4_proto: self.l4_proto,
        }
    }

    /// Earliest start and latest end across both directions.
    pub fn span(&self) -> (TimestampMs, TimestampMs) {
        match self.reverse {
            Some(rev) => (self.start.min(rev.start), self.end.max(rev.end)),
            None => (self.start, self.end),
        }
    }

    /// True when start <= end holds for every direction present.
    pub fn is_ordered(&self) -> bool {
        self.start <= self.end && self.reverse.map_or(true, |rev| rev.start <= rev.end)
    }

    /// Packets in both directions.
    pub fn total_packets(&self) -> u64 {
        self.packets
            .saturating_add(self.reverse.map_or(0, |rev| rev.packets))
    }

    /// Bytes in both directions.
    pub fn total_bytes(&self) -> u64 {
        self.bytes.saturating_add(self.reverse.map_or(0, |rev| rev.bytes))
    }

    /// Move every timestamp by `offset` milliseconds.
    pub fn shift(&mut self, offset: i64) {
        self.start = self.start.saturating_add(offset);
        self.end = self.end.saturating_add(offset);
        if let Some(rev) = self.reverse.as_mut() {
            rev.start = rev.start.saturating_add(offset);
            rev.end = rev.end.saturating_add(offset);
        }
    }

    /// Fold a later fragment of the same logical flow into this record.
    ///
    /// Counters are summed, start takes the minimum and end the maximum.
    /// A reverse side present on only one fragment is carried over as-is.
    pub fn absorb(&mut self, other: &FlowRecord) {
        self.start = self.start.min(other.start);
        self.end = self.end.max(other.end);
        self.packets = self.packets.saturating_add(other.packets);
        self.bytes = self.bytes.saturating_add(other.bytes);
        self.reverse = match (self.reverse, other.reverse) {
            (Some(a), Some(b)) => Some(ReverseCounters {
                start: a.start.min(b.start),
                end: a.end.max(b.end),
                packets: a.packets.saturating_add(b.packets),
                bytes: a.bytes.saturating_add(b.bytes),
            }),
            (a, b) => a.or(b),
        };
    }
}
