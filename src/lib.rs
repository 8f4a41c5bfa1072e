//! # relink — issue tracker reference migration
//!
//! Moves issue text from one repository host to another after the history
//! was converted between version control systems. Commits are correlated
//! across the two histories by `(timestamp, message)`, and every reference
//! to the old host in issue bodies and comments (changeset markers, commit,
//! issue and source links, `@mentions`) is rewritten to point at the new host.
//!
//! ## Library usage
//!
//! The crate is primarily the `relink` CLI; the building blocks are exposed
//! for benchmarking and integration testing:
//!
//! ```no_run
//! use relink::{IdentityIndex, RewriteContext, Rewriter, load_dump};
//! # fn main() -> Result<(), relink::RelinkError> {
//! let old = load_dump("hglog.json".as_ref())?;
//! let new = load_dump("gitlog.json".as_ref())?;
//! let index = IdentityIndex::from_logs(&old.messages, &new.messages)?;
//! let ctx = RewriteContext::new("https://bitbucket.org/birkenfeld/sphinx", "https://github.com/sphinx-doc/sphinx")?;
//! let rewriter = Rewriter::new(&index, ctx)?;
//! println!("{}", rewriter.convert_all("fixed in <<cset 0f18c81b53fc>>")?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod issues;
pub mod log;
pub mod markup;
pub mod memo;
pub mod resolver;
pub mod rewrite;
pub mod storage;
pub mod users;

pub use config::{MigrationConfig, UserCheck};
pub use error::RelinkError;
pub use export::{export_log, Vcs};
pub use issues::{convert_document, ConversionOptions, ConversionSummary};
pub use log::{load_dump, save_dump, CommitRecord, LogDump, LogEntry, LogSide};
pub use resolver::{IdentityIndex, IndexStats, Lookup, TIP};
pub use rewrite::{RewriteContext, Rewriter, FALLBACK_BRANCH, UNRESOLVED_PLACEHOLDER};
pub use storage::{load_index, save_index, SavedIndex};
pub use users::{HttpUserDirectory, KnownUsers, UserDirectory, VerifiedUsers};

// ─── Tests ───────────────────────────────────────────────────────────


// ─── Property-based tests (proptest) ─────────────────────────────────

#[cfg(test)]
mod property_tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn rewriter_over(index: &IdentityIndex) -> Rewriter<'_> {
        let ctx = RewriteContext::new("https://bb.example/repo", "https://gh.example/repo").unwrap();
        Rewriter::new(index, ctx).unwrap()
    }

    fn single_commit_index(old: &str, new: &str) -> IdentityIndex {
        let at = Utc.with_ymd_and_hms(2015, 3, 1, 9, 0, 0).unwrap();
        let record = |identity: &str| CommitRecord {
            identity: identity.to_string(),
            timestamp: at,
            message: "release".to_string(),
            revision: None,
        };
        IdentityIndex::build(&[record(old)], &[record(new)])
    }

    proptest! {
        /// No changeset marker survives conversion, resolved or not.
        #[test]
        fn markers_never_survive(
            idents in proptest::collection::vec("[0-9a-f]{4,12}", 1..6),
            filler in "[a-z ]{0,20}"
        ) {
            let index = single_commit_index("0f18c81b53fc", "20fa9c09b23e");
            let rewriter = rewriter_over(&index);
            let text: String = idents.iter().map(|i| format!("{filler}<<cset {i}>>")).collect();
            let out = rewriter.convert_all(&text).unwrap();
            prop_assert!(!out.contains("<<cset"), "unconverted marker in {}", out);
            prop_assert_eq!(out.matches(r"\<\<cset ").count(), idents.len());
        }

        /// Every issue link keeps its number.
        #[test]
        fn issue_numbers_preserved(number in 1u32..100_000, slug in "[a-z\\-]{0,12}") {
            let index = IdentityIndex::default();
            let rewriter = rewriter_over(&index);
            let text = format!("https://bb.example/repo/issue/{number}/{slug} done");
            let out = rewriter.convert_all(&text).unwrap();
            prop_assert_eq!(out, format!("https://gh.example/repo/issues/{number} done"));
        }

        /// Source links always end up on the new host, resolved or not.
        #[test]
        fn src_links_always_point_at_new_host(ident in "[0-9a-z]{1,12}", line in 1u32..5000) {
            let index = single_commit_index("0f18c81b53fc", "20fa9c09b23e");
            let rewriter = rewriter_over(&index);
            let text = format!("https://bb.example/repo/src/{ident}/setup.py#cl-{line}");
            let out = rewriter.convert_all(&text).unwrap();
            prop_assert!(out.starts_with("https://gh.example/repo/blob/"), "{}", out);
            let expected_suffix = format!("/setup.py#L{}", line);
            prop_assert!(out.ends_with(&expected_suffix), "{}", out);
        }
    }
}
