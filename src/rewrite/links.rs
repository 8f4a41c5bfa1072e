//! URL normalization and the four link/marker passes.

use tracing::{debug, warn_span};

use super::{replace_each, Rewriter, FALLBACK_BRANCH, UNRESOLVED_PLACEHOLDER};

impl Rewriter<'_> {
    /// Rewrite legacy scheme/host variants of the old host to
    /// `https://<host>/`, and the legacy `/changeset/` path to `/commits/`.
    /// Idempotent.
    pub fn normalize_urls(&self, text: &str) -> String {
        let mut out = text.to_string();
        for legacy in &self.legacy_roots {
            if out.contains(legacy.as_str()) {
                out = out.replace(legacy.as_str(), &self.canonical_root);
            }
        }
        if out.contains(self.legacy_changeset.as_str()) {
            out = out.replace(self.legacy_changeset.as_str(), &self.current_commits);
        }
        out
    }

    /// ```text
    /// before: <<cset 0f18c81b53fc>>            (old identity)
    /// before: <<changeset 123:0f18c81b53fc>>
    /// after:  \<\<cset 20fa9c09b23e…\>\>        (new identity)
    /// ```
    ///
    /// The escaped output is never matched again. Resolution warnings are
    /// emitted inside a `marker` span carrying the full marker text.
    pub fn convert_cset_markers(&self, text: &str) -> String {
        replace_each(&self.patterns.cset, text, |caps| {
            let ident = strip_revision_prefix(caps[1].trim());
            let _marker = warn_span!("marker", text = %&caps[0]).entered();
            let target = self.index.resolve(ident).unwrap_or(UNRESOLVED_PLACEHOLDER);
            let replacement = format!(r"\<\<cset {}\>\>", target);
            debug!(from = %&caps[0], to = %replacement, "Changeset marker");
            replacement
        })
    }

    /// ```text
    /// before: <old>/commits/e282b3a8ef4802da3a685f10b5e9a39633e2c23a/
    /// after:  <new>/commit/1d063726ee185dce974f919f2ae696bd1b6b826b
    /// ```
    pub fn convert_commit_links(&self, text: &str) -> String {
        replace_each(&self.patterns.commit_link, text, |caps| {
            let _link = warn_span!("commit_link", url = %&caps[0]).entered();
            let target = self.index.resolve(&caps[1]).unwrap_or(UNRESOLVED_PLACEHOLDER);
            let replacement = format!("{}/commit/{}", self.ctx.new_base_url(), target);
            debug!(from = %&caps[0], to = %replacement, "Commit link");
            replacement
        })
    }

    /// ```text
    /// before: <old>/issue/63/make-sphinx
    /// after:  <new>/issues/63
    /// ```
    ///
    /// Issue numbers are carried over as-is. Idempotent.
    pub fn convert_issue_links(&self, text: &str) -> String {
        replace_each(&self.patterns.issue_link, text, |caps| {
            let replacement = format!("{}/issues/{}", self.ctx.new_base_url(), &caps[1]);
            debug!(from = %&caps[0], to = %replacement, "Issue link");
            replacement
        })
    }

    /// ```text
    /// before: <old>/src/e2a0e4fde899/sphinx/builders/html.py?at=default#cl-321
    /// after:  <new>/blob/6336eab7c825…/sphinx/builders/html.py#L321
    /// ```
    ///
    /// The query string is dropped. Unresolvable identities point at
    /// [`FALLBACK_BRANCH`] so the link stays usable.
    pub fn convert_src_links(&self, text: &str) -> String {
        replace_each(&self.patterns.src_link, text, |caps| {
            let ident = &caps[1];
            let rest = caps.get(2).map_or("", |m| m.as_str());
            let (path, fragment) = split_src_rest(rest);
            let _link = warn_span!("src_link", url = %&caps[0]).entered();
            let target = self.index.resolve(ident).unwrap_or(FALLBACK_BRANCH);
            let replacement = format!(
                "{}/blob/{}{}{}",
                self.ctx.new_base_url(),
                target,
                path,
                line_anchor(fragment)
            );
            debug!(from = %&caps[0], to = %replacement, "Source link");
            replacement
        })
    }
}

/// `123:abcdef` → `abcdef`; anything else is returned unchanged.
pub(crate) fn strip_revision_prefix(ident: &str) -> &str {
    match ident.split_once(':') {
        Some((rev, rest)) if !rev.is_empty() && rev.bytes().all(|b| b.is_ascii_digit()) => rest.trim(),
        _ => ident,
    }
}

/// Split the tail of a source link into `(path, fragment)`; the query (if
/// any) sits between them and is discarded.
pub(crate) fn split_src_rest(rest: &str) -> (&str, &str) {
    let path_end = rest.find(['?', '#']).unwrap_or(rest.len());
    let fragment = rest.find('#').map_or("", |pos| &rest[pos + 1..]);
    (&rest[..path_end], fragment)
}

/// `cl-321` → `#L321`; any other fragment yields no anchor.
pub(crate) fn line_anchor(fragment: &str) -> String {
    let Some(tail) = fragment.strip_prefix("cl-") else {
        return String::new();
    };
    let digits_end = tail.find(|c: char| !c.is_ascii_digit()).unwrap_or(tail.len());
    if digits_end == 0 {
        return String::new();
    }
    format!("#L{}", &tail[..digits_end])
}
