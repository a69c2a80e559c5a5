//! Segment membership of flow records.

use ft_common::FlowRecord;
use ipnet::IpNet;
use std::net::IpAddr;

use super::types::{Segment, SubnetSegment, TimeSegment};

fn side_matches(net: &Option<IpNet>, addr: &IpAddr) -> bool {
    net.as_ref().map_or(true, |n| n.contains(addr))
}

impl SubnetSegment {
    /// Forward addresses only; reverse counters never affect membership.
    pub fn matches(&self, record: &FlowRecord) -> bool {
        let direct = side_matches(&self.source, &record.src_ip)
            && side_matches(&self.dest, &record.dst_ip);
        if direct || !self.bidir {
            return direct;
        }
        side_matches(&self.source, &record.dst_ip) && side_matches(&self.dest, &record.src_ip)
    }
}

impl TimeSegment {
    /// Inclusive on both bounds, tested against the record span.
    pub fn matches(&self, record: &FlowRecord) -> bool {
        let (start, end) = record.span();
        self.start.map_or(true, |bound| start >= bound) && self.end.map_or(true, |bound| end <= bound)
    }
}

impl Segment {
    pub fn matches(&self, record: &FlowRecord) -> bool {
        match self {
            Segment::Subnet(subnet) => subnet.matches(record),
            Segment::Time(window) => window.matches(record),
        }
    }
}

/// Records belonging to `segment`; no segment selects everything.
pub fn filter<'a>(
    records: &'a [FlowRecord],
    segment: Option<&'a Segment>,
) -> impl Iterator<Item = &'a FlowRecord> + 'a {
    records
        .iter()
        .filter(move |rec| segment.map_or(true, |seg| seg.matches(rec)))
}
