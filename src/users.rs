//! Account existence checks on the old host, used to decide which
//! `@username` tokens are real mentions.
//!
//! The check is a collaborator: [`UserDirectory`] is the seam, with a fixed
//! list implementation for offline runs and tests, and an HTTP implementation
//! that sends HEAD requests with a blocking `reqwest` client. [`VerifiedUsers`]
//! adds per-run memoization.

use std::collections::HashSet;
use std::time::Duration;

use tracing::debug;

use crate::error::RelinkError;
use crate::memo::MemoCache;

/// Default request timeout for [`HttpUserDirectory`].
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 20;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Answers "does this username exist on the old host?".
///
/// Errors are collaborator failures and propagate to the caller; a missing
/// account is `Ok(false)`.
pub trait UserDirectory {
    fn user_exists(&self, username: &str) -> Result<bool, RelinkError>;
}

// ─── Fixed list ─────────────────────────────────────────────────────

/// A known set of usernames (from config or the command line).
/// Comparison is ASCII case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct KnownUsers {
    names: HashSet<String>,
}

impl KnownUsers {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().trim().to_ascii_lowercase())
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl UserDirectory for KnownUsers {
    fn user_exists(&self, username: &str) -> Result<bool, RelinkError> {
        Ok(self.names.contains(&username.to_ascii_lowercase()))
    }
}

// ─── HTTP ───────────────────────────────────────────────────────────

/// Checks `<host_root>/<username>` with a HEAD request. 2xx (after
/// redirects) means the account exists, 404/410 means it does not, anything
/// else is a collaborator failure.
#[derive(Debug, Clone)]
pub struct HttpUserDirectory {
    host_root: String,
    client: reqwest::blocking::Client,
}

impl HttpUserDirectory {
    pub fn new(host_root: &str) -> Result<Self, RelinkError> {
        Self::with_timeout(host_root, Duration::from_secs(DEFAULT_LOOKUP_TIMEOUT_SECS))
    }

    /// `timeout` bounds each whole request; connecting gets at most 10s of it.
    pub fn with_timeout(host_root: &str, timeout: Duration) -> Result<Self, RelinkError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(CONNECT_TIMEOUT_SECS)))
            .timeout(timeout)
            .user_agent(concat!("relink/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| collaborator(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            host_root: host_root.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn profile_url(&self, username: &str) -> String {
        format!("{}/{}", self.host_root, username)
    }

    fn fetch_status(&self, url: &str) -> Result<u16, RelinkError> {
        let response = self
            .client
            .head(url)
            .send()
            .map_err(|e| collaborator(format!("HEAD {} failed: {}", url, e)))?;
        Ok(response.status().as_u16())
    }
}

impl UserDirectory for HttpUserDirectory {
    fn user_exists(&self, username: &str) -> Result<bool, RelinkError> {
        let url = self.profile_url(username);
        let status = self.fetch_status(&url)?;
        debug!(user = %username, status, "User lookup");
        status_means_exists(status)
            .ok_or_else(|| collaborator(format!("unexpected HTTP status {} for {}", status, url)))
    }
}

fn collaborator(message: String) -> RelinkError {
    RelinkError::Collaborator {
        collaborator: "user lookup",
        message,
    }
}

fn status_means_exists(status: u16) -> Option<bool> {
    match status {
        200..=299 => Some(true),
        404 | 410 => Some(false),
        _ => None,
    }
}

// ─── Memoized wrapper ───────────────────────────────────────────────

/// A directory plus a run-scoped cache: repeated mentions of the same user
/// cost one lookup. Usernames are case-insensitive, so the cache key and the
/// lookup both use the ASCII-lowercased name.
pub struct VerifiedUsers {
    directory: Box<dyn UserDirectory>,
    cache: MemoCache<String, bool>,
}

impl VerifiedUsers {
    pub fn new(directory: Box<dyn UserDirectory>) -> Self {
        Self {
            directory,
            cache: MemoCache::new(),
        }
    }

    pub fn is_verified(&self, username: &str) -> Result<bool, RelinkError> {
        let key = username.to_ascii_lowercase();
        self.cache
            .get_or_try_insert_with(key.clone(), || self.directory.user_exists(&key))
    }

    /// `(hits, misses)` of the underlying cache.
    pub fn cache_counters(&self) -> (u64, u64) {
        self.cache.counters()
    }
}

impl std::fmt::Debug for VerifiedUsers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifiedUsers")
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
