//! Flow file loader.
//!
//! Parses comma-separated flow files into [`FlowRecord`]s.
//! Format:
//! - The first non-empty, non-comment line is a header naming the columns
//! - Column names are case-insensitive and may appear in any order
//! - Lines starting with # are comments, empty lines are ignored
//! - Unknown columns are ignored
//!
//! Required columns: `SRC_IP`, `DST_IP`, `START_TIME`, `END_TIME`,
//! `L3_PROTO`, `L4_PROTO`, `SRC_PORT`, `DST_PORT`, `PACKETS`, `BYTES`.
//! Optional reverse columns: `PACKETS_REV` and `BYTES_REV` (together),
//! `START_TIME_REV`, `END_TIME_REV`.
//!
//! Any malformed row aborts the whole load.

use ft_common::{parse_timestamp, FlowRecord, ReverseCounters, TimestampMs};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors from flow file loading.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("flow file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read flow file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: missing header line", path.display())]
    MissingHeader { path: PathBuf },

    #[error("{}:{line}: {message}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

impl LoadError {
    pub fn path(&self) -> &Path {
        match self {
            LoadError::NotFound { path }
            | LoadError::Io { path, .. }
            | LoadError::MissingHeader { path }
            | LoadError::Malformed { path, .. } => path,
        }
    }
}

impl From<LoadError> for ft_common::Error {
    fn from(err: LoadError) -> Self {
        use ft_common::Error;

        match err {
            LoadError::NotFound { path } => Error::FileNotFound { path },
            LoadError::Io { path, source } => Error::Unreadable {
                path,
                message: source.to_string(),
            },
            LoadError::MissingHeader { path } => Error::MalformedFlow {
                path,
                line: 0,
                message: "missing header line".to_string(),
            },
            LoadError::Malformed {
                path,
                line,
                message,
            } => Error::MalformedFlow {
                path,
                line,
                message,
            },
        }
    }
}

/// Known flow file columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    SrcIp,
    DstIp,
    StartTime,
    EndTime,
    L3Proto,
    L4Proto,
    SrcPort,
    DstPort,
    Packets,
    Bytes,
    PacketsRev,
    BytesRev,
    StartTimeRev,
    EndTimeRev,
}

impl Column {
    pub const ALL: [Column; 14] = [
        Column::SrcIp,
        Column::DstIp,
        Column::StartTime,
        Column::EndTime,
        Column::L3Proto,
        Column::L4Proto,
        Column::SrcPort,
        Column::DstPort,
        Column::Packets,
        Column::Bytes,
        Column::PacketsRev,
        Column::BytesRev,
        Column::StartTimeRev,
        Column::EndTimeRev,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::SrcIp => "SRC_IP",
            Column::DstIp => "DST_IP",
            Column::StartTime => "START_TIME",
            Column::EndTime => "END_TIME",
            Column::L3Proto => "L3_PROTO",
            Column::L4Proto => "L4_PROTO",
            Column::SrcPort => "SRC_PORT",
            Column::DstPort => "DST_PORT",
            Column::Packets => "PACKETS",
            Column::Bytes => "BYTES",
            Column::PacketsRev => "PACKETS_REV",
            Column::BytesRev => "BYTES_REV",
            Column::StartTimeRev => "START_TIME_REV",
            Column::EndTimeRev => "END_TIME_REV",
        }
    }

    pub fn is_required(self) -> bool {
        !matches!(
            self,
            Column::PacketsRev | Column::BytesRev | Column::StartTimeRev | Column::EndTimeRev
        )
    }

    fn from_header(name: &str) -> Option<Column> {
        let name = name.trim().trim_matches('"');
        Column::ALL
            .into_iter()
            .find(|col| col.name().eq_ignore_ascii_case(name))
    }
}

/// Column positions resolved from a header line.
#[derive(Debug, Clone)]
struct Schema {
    positions: [Option<usize>; Column::ALL.len()],
    width: usize,
}

impl Schema {
    fn from_header(header: &str) -> Result<Self, String> {
        let mut positions = [None; Column::ALL.len()];
        let fields: Vec<&str> = header.split(',').collect();

        for (pos, field) in fields.iter().enumerate() {
            if let Some(col) = Column::from_header(field) {
                let slot = &mut positions[col as usize];
                if slot.is_some() {
                    return Err(format!("duplicate column {}", col.name()));
                }
                *slot = Some(pos);
            }
        }

        let missing: Vec<&str> = Column::ALL
            .into_iter()
            .filter(|col| col.is_required() && positions[*col as usize].is_none())
            .map(Column::name)
            .collect();
        if !missing.is_empty() {
            return Err(format!("missing required columns: {}", missing.join(", ")));
        }

        let has_packets_rev = positions[Column::PacketsRev as usize].is_some();
        let has_bytes_rev = positions[Column::BytesRev as usize].is_some();
        if has_packets_rev != has_bytes_rev {
            return Err("PACKETS_REV and BYTES_REV must be present together".to_string());
        }

        Ok(Schema {
            positions,
            width: fields.len(),
        })
    }

    fn has_reverse(&self) -> bool {
        self.positions[Column::PacketsRev as usize].is_some()
    }

    fn field<'a>(&self, fields: &[&'a str], col: Column) -> Option<&'a str> {
        self.positions[col as usize].map(|pos| fields[pos].trim().trim_matches('"'))
    }

    fn parse<T>(&self, fields: &[&str], col: Column) -> Result<T, String>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self
            .field(fields, col)
            .ok_or_else(|| format!("column {} is not present", col.name()))?;
        raw.parse::<T>()
            .map_err(|e| format!("column {}: '{}': {}", col.name(), raw, e))
    }

    fn timestamp(&self, fields: &[&str], col: Column) -> Result<Option<TimestampMs>, String> {
        match self.field(fields, col) {
            None => Ok(None),
            Some(raw) => parse_timestamp(raw)
                .map(Some)
                .map_err(|e| format!("column {}: {}", col.name(), e)),
        }
    }

    fn record(&self, fields: &[&str]) -> Result<FlowRecord, String> {
        if fields.len() != self.width {
            return Err(format!(
                "expected {} fields, found {}",
                self.width,
                fields.len()
            ));
        }

        let start = self.required_timestamp(fields, Column::StartTime)?;
        let end = self.required_timestamp(fields, Column::EndTime)?;

        let reverse = if self.has_reverse() {
            Some(ReverseCounters {
                start: self.timestamp(fields, Column::StartTimeRev)?.unwrap_or(start),
                end: self.timestamp(fields, Column::EndTimeRev)?.unwrap_or(end),
                packets: self.parse(fields, Column::PacketsRev)?,
                bytes: self.parse(fields, Column::BytesRev)?,
            })
        } else {
            None
        };

        Ok(FlowRecord {
            src_ip: self.parse::<IpAddr>(fields, Column::SrcIp)?,
            dst_ip: self.parse::<IpAddr>(fields, Column::DstIp)?,
            src_port: self.parse(fields, Column::SrcPort)?,
            dst_port: self.parse(fields, Column::DstPort)?,
            l3_proto: self.parse(fields, Column::L3Proto)?,
            l4_proto: self.parse(fields, Column::L4Proto)?,
            start,
            end,
            packets: self.parse(fields, Column::Packets)?,
            bytes: self.parse(fields, Column::Bytes)?,
            reverse,
        })
    }

    fn required_timestamp(&self, fields: &[&str], col: Column) -> Result<TimestampMs, String> {
        self.timestamp(fields, col)?
            .ok_or_else(|| format!("column {} is not present", col.name()))
    }
}

/// Load a flow file from disk.
///
/// Input order is preserved in the returned records.
pub fn load_flows(path: &Path) -> Result<Vec<FlowRecord>, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_flows(&content, path)
}

/// Parse flow file content. `path` is used for error messages only.
///
/// This is the core parsing logic, separated for testability.
pub fn parse_flows(content: &str, path: &Path) -> Result<Vec<FlowRecord>, LoadError> {
    let mut schema: Option<Schema> = None;
    let mut records = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        // Skip empty lines and comments
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let malformed = |message: String| LoadError::Malformed {
            path: path.to_path_buf(),
            line: line_num + 1,
            message,
        };

        match schema {
            None => schema = Some(Schema::from_header(trimmed).map_err(malformed)?),
            Some(ref schema) => {
                let fields: Vec<&str> = trimmed.split(',').collect();
                records.push(schema.record(&fields).map_err(malformed)?);
            }
        }
    }

    if schema.is_none() {
        return Err(LoadError::MissingHeader {
            path: path.to_path_buf(),
        });
    }

    Ok(records)
}
