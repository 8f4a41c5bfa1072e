//! Commit log dumps: JSON loading, timestamp normalization, and conversion
//! into [`CommitRecord`]s for the resolver.
//!
//! Both VCS exports use the same dump shape:
//!
//! ```text
//! {"messages": [{"revnum": 12, "node": "<hash>", "date": "...", "email": "...", "desc": "..."}]}
//! ```
//!
//! Old-system dumps (Mercurial) carry an integer `revnum`; new-system dumps
//! (git) put the hash there, which is tolerated and ignored.

use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RelinkError;

// ─── Dump types ─────────────────────────────────────────────────────

/// A whole log dump as written by `relink export-log`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LogDump {
    pub messages: Vec<LogEntry>,
}

/// One raw entry of a log dump. Fields stay optional here so that a missing
/// field is reported with its position instead of failing the whole file.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revnum: Option<serde_json::Value>,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
}

/// Which side of the migration a log describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogSide {
    Old,
    New,
}

impl LogSide {
    pub fn label(self) -> &'static str {
        match self {
            LogSide::Old => "old",
            LogSide::New => "new",
        }
    }
}

/// A validated commit: identity, UTC timestamp, message and (old side only)
/// the sequential revision number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitRecord {
    pub identity: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub revision: Option<u64>,
}

// ─── Timestamps ─────────────────────────────────────────────────────

/// Offset-carrying formats produced by `hg log` (`isodatesec`, `isodate`)
/// and `git log --date=iso`.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M %z"];

/// Naive formats, interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a commit timestamp into UTC.
///
/// Both logs must normalize to the same instant for the correlation key to
/// match, so offsets are applied rather than discarded.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }
    None
}

/// Interpret a dump's `revnum` as an integer revision number.
/// Git dumps store the commit hash there, which yields `None`.
fn revision_number(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ─── Conversion ─────────────────────────────────────────────────────

impl CommitRecord {
    /// Validate one raw entry. `position` is the zero-based index in the dump
    /// and only used for error reporting.
    pub fn from_entry(entry: &LogEntry, side: LogSide, position: usize) -> Result<Self, RelinkError> {
        let malformed = |reason: String| RelinkError::MalformedLogEntry {
            log: side.label(),
            position,
            reason,
        };

        let identity = entry
            .node
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| malformed("missing 'node'".to_string()))?;
        let date = entry
            .date
            .as_deref()
            .ok_or_else(|| malformed(format!("missing 'date' for {}", identity)))?;
        let timestamp = parse_timestamp(date)
            .ok_or_else(|| malformed(format!("unparseable timestamp '{}' for {}", date, identity)))?;
        let message = entry
            .desc
            .as_deref()
            .ok_or_else(|| malformed(format!("missing 'desc' for {}", identity)))?;

        let revision = match side {
            LogSide::Old => entry.revnum.as_ref().and_then(revision_number),
            LogSide::New => None,
        };

        Ok(CommitRecord {
            identity: identity.to_string(),
            timestamp,
            message: message.trim().to_string(),
            revision,
        })
    }
}

/// Validate every entry of a dump, failing on the first malformed one.
pub fn parse_records(entries: &[LogEntry], side: LogSide) -> Result<Vec<CommitRecord>, RelinkError> {
    entries
        .iter()
        .enumerate()
        .map(|(position, entry)| CommitRecord::from_entry(entry, side, position))
        .collect()
}

/// Read a JSON log dump from disk.
pub fn load_dump(path: &Path) -> Result<LogDump, RelinkError> {
    let text = fs::read_to_string(path)?;
    let dump: LogDump = serde_json::from_str(&text)?;
    Ok(dump)
}

/// Write a JSON log dump to disk (pretty-printed, like the issue exports).
pub fn save_dump(path: &Path, dump: &LogDump) -> Result<(), RelinkError> {
    let file = fs::File::create(path)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), dump)?;
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────
