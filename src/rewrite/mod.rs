//! Reference rewriter: converts old-host references in free text into
//! new-host references.
//!
//! [`Rewriter::convert_all`] runs six passes in a fixed order. Later passes
//! never see anything an earlier pass would produce for them to match:
//!
//! 1. URL normalization (`http://`/`www.` variants, `/changeset/` → `/commits/`)
//! 2. changeset markers `<<cset X>>` → `\<\<cset Y\>\>`
//! 3. commit links `…/commits/X` → `…/commit/Y`
//! 4. issue links `…/issue/N/slug` → `…/issues/N`
//! 5. source links `…/src/X/path#cl-N` → `…/blob/Y/path#LN`
//! 6. user mentions `@name` → `[@name](<old host>/name)` (only with a user directory)
//!
//! Unresolved commits never fail a conversion: markers and commit links get
//! [`UNRESOLVED_PLACEHOLDER`], source links fall back to [`FALLBACK_BRANCH`].

use std::collections::HashMap;

use regex::{Captures, Regex};
use tracing::info;

use crate::error::RelinkError;
use crate::resolver::IdentityIndex;
use crate::users::VerifiedUsers;

mod links;
mod mentions;

/// Written in place of a commit identity that could not be resolved.
pub const UNRESOLVED_PLACEHOLDER: &str = "None";

/// Source links to unresolvable commits point at the default branch instead.
pub const FALLBACK_BRANCH: &str = "master";

/// `@tokens` that are common false positives (decorators, CSS at-rules,
/// the host's own name).
pub const DEFAULT_DENYLIST: &[&str] = &[
    "class",
    "import",
    "github",
    "property",
    "staticmethod",
    "classmethod",
];

// ─── Context ────────────────────────────────────────────────────────

/// Old and new repository base URLs, e.g. `https://bitbucket.org/birkenfeld/sphinx`
/// and `https://github.com/sphinx-doc/sphinx`.
///
/// The old base URL is stored in canonical form (`https`, no `www.`, no
/// trailing slash) so it matches text after URL normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteContext {
    old_base_url: String,
    new_base_url: String,
    old_host: String,
}

impl RewriteContext {
    pub fn new(old_base_url: &str, new_base_url: &str) -> Result<Self, RelinkError> {
        let (_, old_host, old_path) = split_base_url(old_base_url)?;
        let (new_scheme, new_host, new_path) = split_base_url(new_base_url)?;
        let old_host = old_host.strip_prefix("www.").unwrap_or(old_host).to_string();
        Ok(Self {
            old_base_url: format!("https://{}{}", old_host, old_path),
            new_base_url: format!("{}://{}{}", new_scheme, new_host, new_path),
            old_host,
        })
    }

    pub fn old_base_url(&self) -> &str {
        &self.old_base_url
    }

    pub fn new_base_url(&self) -> &str {
        &self.new_base_url
    }

    /// Old host name without `www.`, e.g. `bitbucket.org`.
    pub fn old_host(&self) -> &str {
        &self.old_host
    }

    /// Canonical root of the old host, e.g. `https://bitbucket.org`.
    /// User profile links hang off this.
    pub fn old_host_root(&self) -> String {
        format!("https://{}", self.old_host)
    }
}

/// Split `scheme://host/path/` into `(scheme, host, "/path")`.
fn split_base_url(url: &str) -> Result<(&str, &str, &str), RelinkError> {
    let url = url.trim().trim_end_matches('/');
    let (scheme, rest) = url
        .split_once("://")
        .ok_or_else(|| RelinkError::InvalidArgs(format!("Base URL '{}' must start with a scheme (https://...)", url)))?;
    let (host, path) = match rest.find('/') {
        Some(pos) => rest.split_at(pos),
        None => (rest, ""),
    };
    if scheme.is_empty() || host.is_empty() {
        return Err(RelinkError::InvalidArgs(format!("Base URL '{}' has no host", url)));
    }
    Ok((scheme, host, path))
}

// ─── Patterns ───────────────────────────────────────────────────────

/// Regexes compiled once per rewriter; the link patterns embed the escaped
/// old base URL.
#[derive(Debug)]
struct Patterns {
    cset: Regex,
    commit_link: Regex,
    issue_link: Regex,
    src_link: Regex,
    mention: Regex,
}

impl Patterns {
    fn new(ctx: &RewriteContext) -> Result<Self, RelinkError> {
        let old = regex::escape(ctx.old_base_url());
        Ok(Self {
            cset: compile(r"<<(?:cset|changeset) ([^>]+)>>".to_string())?,
            commit_link: compile(format!(r"{}/commits/([0-9a-f]+)/?", old))?,
            issue_link: compile(format!(r"{}/issue/(\d+)(?:/[\w.,\-]*)?", old))?,
            src_link: compile(format!(r#"{}/src/([^/\s?#)\]>"']+)(/[\w/?=#.,\-]*)?"#, old))?,
            // Rust regex has no look-behind: the preceding character (or start
            // of text) is matched and kept outside the username group.
            mention: compile(
                r"(?:^|[^\w.@/\[])@([A-Za-z0-9_](?:[A-Za-z0-9_\-]*[A-Za-z0-9_])?)".to_string(),
            )?,
        })
    }
}

fn compile(pattern: String) -> Result<Regex, RelinkError> {
    Regex::new(&pattern).map_err(|source| RelinkError::InvalidRegex { pattern, source })
}

/// Replace every match of `re`, rendering each distinct matched text once so
/// identical references are converted together (and warned about once).
fn replace_each(re: &Regex, text: &str, mut render: impl FnMut(&Captures<'_>) -> String) -> String {
    let mut rendered: HashMap<String, String> = HashMap::new();
    re.replace_all(text, |caps: &Captures<'_>| {
        rendered
            .entry(caps[0].to_string())
            .or_insert_with(|| render(caps))
            .clone()
    })
    .into_owned()
}

// ─── Rewriter ───────────────────────────────────────────────────────

/// Converts content fields for one migration run. Holds the index
/// read-only; the only mutable state is the user-verification cache.
#[derive(Debug)]
pub struct Rewriter<'a> {
    index: &'a IdentityIndex,
    ctx: RewriteContext,
    patterns: Patterns,
    legacy_roots: Vec<String>,
    canonical_root: String,
    legacy_changeset: String,
    current_commits: String,
    users: Option<VerifiedUsers>,
    denylist: Vec<String>,
}

impl<'a> Rewriter<'a> {
    pub fn new(index: &'a IdentityIndex, ctx: RewriteContext) -> Result<Self, RelinkError> {
        let patterns = Patterns::new(&ctx)?;
        let host = ctx.old_host();
        let legacy_roots = vec![
            format!("http://www.{}/", host),
            format!("http://{}/", host),
            format!("https://www.{}/", host),
        ];
        let canonical_root = format!("https://{}/", host);
        let legacy_changeset = format!("{}/changeset/", ctx.old_base_url());
        let current_commits = format!("{}/commits/", ctx.old_base_url());
        Ok(Self {
            index,
            ctx,
            patterns,
            legacy_roots,
            canonical_root,
            legacy_changeset,
            current_commits,
            users: None,
            denylist: DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Enable the mention pass, verifying usernames through `users`.
    pub fn with_users(mut self, users: VerifiedUsers) -> Self {
        self.users = Some(users);
        self
    }

    /// Add `@tokens` that must never be treated as mentions.
    pub fn with_extra_denylist<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denylist.extend(extra.into_iter().map(Into::into));
        self
    }

    pub fn context(&self) -> &RewriteContext {
        &self.ctx
    }

    /// Rewrite every old-host reference in one content field.
    ///
    /// Fails only when the user directory fails; unresolved commits are
    /// substituted and logged.
    pub fn convert_all(&self, text: &str) -> Result<String, RelinkError> {
        let text = self.normalize_urls(text);
        let text = self.convert_cset_markers(&text);
        let text = self.convert_commit_links(&text);
        let text = self.convert_issue_links(&text);
        let text = self.convert_src_links(&text);
        self.convert_mentions(&text)
    }

    /// Log the user-lookup cache statistics (end of run).
    pub fn log_summary(&self) {
        if let Some(users) = &self.users {
            let (hits, misses) = users.cache_counters();
            info!(hits, lookups = misses, "User verification cache");
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "rewrite_tests.rs"]
mod tests;
