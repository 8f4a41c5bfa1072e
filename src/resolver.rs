//! Changeset-identity resolver: maps old-system commit identities onto
//! new-system commit identities.
//!
//! The two histories share no identifier, so commits are correlated on
//! `(timestamp, trimmed message)`. The index keeps:
//!
//! - `forward`: every old identity → `Some(new identity)` or `None` (unresolved)
//! - `sorted_old`: old identities in lexicographic order, for prefix lookup
//!   (text usually abbreviates hashes to 12 characters)
//! - `revisions`: old sequential revision number → full old identity
//!
//! The index is built once per run and is read-only afterwards.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::RelinkError;
use crate::log::{parse_records, CommitRecord, LogEntry, LogSide};

/// Query sentinel meaning "no resolvable commit" (the Mercurial `tip` tag).
pub const TIP: &str = "tip";

/// Counters gathered while building the index.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub old_commits: usize,
    pub new_commits: usize,
    /// New-log entries whose key matched at least one old identity
    pub matched_new: usize,
    /// New-log entries with no old counterpart
    pub unmatched_new: usize,
    /// Old entries whose key was already held by a different old identity
    pub collisions: usize,
}

/// Outcome of a lookup, without side effects. [`IdentityIndex::resolve`]
/// turns this into `Option<&str>` plus diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Resolved { old: &'a str, new: &'a str },
    /// The `tip` sentinel: never resolvable, never warned about.
    Tip,
    /// Nothing to look up after stripping a `REV:` prefix.
    Empty,
    /// No old identity starts with the query.
    UnknownOld,
    /// A known old identity with no correlating new-log entry.
    AbsentFromNew { old: &'a str },
}

/// One-directional old → new commit identity index.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct IdentityIndex {
    forward: HashMap<String, Option<String>>,
    sorted_old: Vec<String>,
    revisions: HashMap<u64, String>,
    #[serde(default)]
    stats: IndexStats,
}

type CorrelationKey<'a> = (DateTime<Utc>, &'a str);

impl IdentityIndex {
    /// Build the index from already-validated records, in log order.
    ///
    /// When several old identities share a correlation key, every one of them
    /// maps to the same new identity. When several new entries share a key,
    /// the last one processed wins.
    pub fn build(old: &[CommitRecord], new: &[CommitRecord]) -> Self {
        let mut forward: HashMap<String, Option<String>> = HashMap::with_capacity(old.len());
        let mut revisions: HashMap<u64, String> = HashMap::new();
        let mut by_key: HashMap<CorrelationKey<'_>, Vec<&str>> = HashMap::with_capacity(old.len());
        let mut stats = IndexStats {
            old_commits: old.len(),
            new_commits: new.len(),
            ..Default::default()
        };

        for record in old {
            let identity = record.identity.as_str();
            let holders = by_key.entry((record.timestamp, record.message.as_str())).or_default();
            if !holders.contains(&identity) {
                if let Some(first) = holders.first() {
                    stats.collisions += 1;
                    warn!(
                        old = %identity,
                        existing = %first,
                        timestamp = %record.timestamp,
                        "Old-log commits share timestamp and message; both will map to the same new commit"
                    );
                }
                holders.push(identity);
            }
            forward.insert(identity.to_string(), None);
            if let Some(rev) = record.revision {
                revisions.insert(rev, identity.to_string());
            }
        }

        for record in new {
            let key = (record.timestamp, record.message.as_str());
            let Some(holders) = by_key.get(&key) else {
                stats.unmatched_new += 1;
                warn!(
                    new = %record.identity,
                    timestamp = %record.timestamp,
                    "New-log commit has no counterpart in old log, skipping"
                );
                continue;
            };
            stats.matched_new += 1;
            for old_identity in holders {
                let slot = forward.entry(old_identity.to_string()).or_insert(None);
                if let Some(previous) = slot.as_deref() {
                    if previous != record.identity {
                        debug!(
                            old = %old_identity,
                            previous = %previous,
                            new = %record.identity,
                            "Later new-log commit overrides earlier match"
                        );
                    }
                }
                *slot = Some(record.identity.clone());
            }
        }

        let mut sorted_old: Vec<String> = forward.keys().cloned().collect();
        sorted_old.sort_unstable();

        let index = IdentityIndex {
            forward,
            sorted_old,
            revisions,
            stats,
        };
        info!(
            old = stats.old_commits,
            new = stats.new_commits,
            resolved = index.resolved_count(),
            unresolved = index.len() - index.resolved_count(),
            collisions = stats.collisions,
            "Identity index built"
        );
        index
    }

    /// Validate both raw dumps and build the index. A malformed entry in
    /// either log fails the whole build.
    pub fn from_logs(old: &[LogEntry], new: &[LogEntry]) -> Result<Self, RelinkError> {
        let old_records = parse_records(old, LogSide::Old)?;
        let new_records = parse_records(new, LogSide::New)?;
        Ok(Self::build(&old_records, &new_records))
    }

    /// Number of distinct old identities.
    pub fn len(&self) -> usize {
        self.sorted_old.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted_old.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    /// Number of old identities that have a new counterpart.
    pub fn resolved_count(&self) -> usize {
        self.forward.values().filter(|v| v.is_some()).count()
    }

    /// Old identities in lexicographic order.
    pub fn old_identities(&self) -> impl Iterator<Item = &str> {
        self.sorted_old.iter().map(String::as_str)
    }

    /// Direct mapping for a full old identity: `None` if unknown,
    /// `Some(None)` if known but unresolved.
    pub fn mapping(&self, old_identity: &str) -> Option<Option<&str>> {
        self.forward.get(old_identity).map(|v| v.as_deref())
    }

    /// Classify a query without logging.
    ///
    /// Accepted forms: a full or abbreviated old identity, `REV:IDENT`
    /// (only `IDENT` is used), a bare revision number, or `tip`.
    pub fn lookup<'a>(&'a self, query: &str) -> Lookup<'a> {
        let mut needle = query.trim();
        if let Some((rev, ident)) = needle.split_once(':') {
            if is_revision_number(rev) {
                needle = ident.trim();
            }
        }
        if needle == TIP {
            return Lookup::Tip;
        }
        if needle.is_empty() {
            return Lookup::Empty;
        }

        // Revision numbers take precedence; unknown numbers fall back to
        // being read as a (digits-only) hash prefix.
        let prefix = if is_revision_number(needle) {
            needle
                .parse::<u64>()
                .ok()
                .and_then(|rev| self.revisions.get(&rev))
                .map(String::as_str)
                .unwrap_or(needle)
        } else {
            needle
        };

        let Some(old) = self.find_old(prefix) else {
            return Lookup::UnknownOld;
        };
        match self.forward.get(old).and_then(|v| v.as_deref()) {
            Some(new) => Lookup::Resolved { old, new },
            None => Lookup::AbsentFromNew { old },
        }
    }

    /// Resolve a query to a new identity, warning about anything that does
    /// not resolve (except `tip`).
    pub fn resolve<'a>(&'a self, query: &str) -> Option<&'a str> {
        match self.lookup(query) {
            Lookup::Resolved { new, .. } => Some(new),
            Lookup::Tip => None,
            Lookup::Empty => {
                warn!(query = %query, "Empty changeset reference");
                None
            }
            Lookup::UnknownOld => {
                warn!(query = %query, "Changeset reference not found in old log");
                None
            }
            Lookup::AbsentFromNew { old } => {
                warn!(query = %query, old = %old, "Old commit is known but absent from new log");
                None
            }
        }
    }

    /// Smallest old identity ≥ `prefix`, accepted only if it starts with it.
    fn find_old(&self, prefix: &str) -> Option<&str> {
        let idx = self.sorted_old.partition_point(|id| id.as_str() < prefix);
        self.sorted_old
            .get(idx)
            .map(String::as_str)
            .filter(|candidate| candidate.starts_with(prefix))
    }
}

fn is_revision_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
