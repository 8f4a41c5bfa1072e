//! Issue export conversion.
//!
//! Documents look like
//! `{"issues": [{"issue": {"local_id": 63, "content": "…"}, "comments": [{"body": "…"}]}]}`.
//! Only `issue.content` and `comments[].body` are rewritten; every other
//! field is carried through untouched. With attribution enabled, each
//! rewritten field also gets a footer naming where and by whom it was
//! originally posted.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::error::RelinkError;
use crate::markup::clean_body;
use crate::rewrite::Rewriter;

/// Optional post-processing applied by [`convert_document`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversionOptions {
    /// Turn `{{{ … }}}` wiki blocks into Markdown before rewriting.
    pub wiki_blocks: bool,
    /// Insert placeholder issues for unused `local_id` numbers.
    pub fill_gaps: bool,
    /// Append an origin footer to issue contents and comment bodies.
    pub attribution: bool,
}

const FOOTER_RULE: &str = "---------------------------------------";
const ANONYMOUS: &str = "Anonymous";

/// What a conversion run touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    pub issues: usize,
    pub comments: usize,
    /// Content fields whose text changed.
    pub fields_rewritten: usize,
    pub placeholders_added: usize,
}

pub fn load_document(path: &Path) -> Result<Value, RelinkError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Write `doc` as pretty-printed JSON (4-space indent).
pub fn save_document(path: &Path, doc: &Value) -> Result<(), RelinkError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    doc.serialize(&mut ser)?;
    buf.push(b'\n');
    std::fs::write(path, buf)?;
    Ok(())
}

/// Rewrite every issue content and comment body in `doc` in place.
pub fn convert_document(
    doc: &mut Value,
    rewriter: &Rewriter<'_>,
    options: ConversionOptions,
) -> Result<ConversionSummary, RelinkError> {
    let issues = doc
        .get_mut("issues")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| RelinkError::InvalidDocument("top-level \"issues\" array is missing".to_string()))?;

    let ctx = rewriter.context();
    let host_root = ctx.old_host_root();

    let mut summary = ConversionSummary::default();
    for (position, issue) in issues.iter_mut().enumerate() {
        if !issue.is_object() {
            return Err(RelinkError::InvalidDocument(format!("issue #{position} is not an object")));
        }
        summary.issues += 1;

        let footer = options
            .attribution
            .then(|| issue_footer(issue, ctx.old_base_url(), &host_root));
        let content = issue.get_mut("issue").and_then(|i| i.get_mut("content"));
        if convert_field(content, rewriter, options, footer)? {
            summary.fields_rewritten += 1;
        }

        if let Some(comments) = issue.get_mut("comments").and_then(Value::as_array_mut) {
            for comment in comments {
                summary.comments += 1;
                let footer = options.attribution.then(|| comment_footer(comment, &host_root));
                if convert_field(comment.get_mut("body"), rewriter, options, footer)? {
                    summary.fields_rewritten += 1;
                }
            }
        }
        debug!(position, local_id = ?local_id(issue), "Converted issue");
    }

    if options.fill_gaps {
        summary.placeholders_added = fill_gaps(issues);
    }

    info!(
        issues = summary.issues,
        comments = summary.comments,
        rewritten = summary.fields_rewritten,
        placeholders = summary.placeholders_added,
        "Converted issue document"
    );
    Ok(summary)
}

/// Convert one string field, then append `footer` untouched by the rewrite
/// passes. `None`, `null` and non-string values are left alone. Returns
/// whether the text changed.
fn convert_field(
    slot: Option<&mut Value>,
    rewriter: &Rewriter<'_>,
    options: ConversionOptions,
    footer: Option<String>,
) -> Result<bool, RelinkError> {
    let Some(Value::String(text)) = slot else {
        return Ok(false);
    };
    let mut converted = if options.wiki_blocks {
        rewriter.convert_all(&clean_body(text))?
    } else {
        rewriter.convert_all(text)?
    };
    if let Some(footer) = footer {
        converted.push_str(&footer);
    }
    if converted == *text {
        return Ok(false);
    }
    *text = converted;
    Ok(true)
}

/// Old issue URL, reporter and creation time of one issue.
fn issue_footer(issue: &Value, old_base_url: &str, host_root: &str) -> String {
    let meta = issue.get("issue").unwrap_or(issue);
    let url = local_id(issue).map_or_else(|| old_base_url.to_string(), |id| format!("{}/issue/{}", old_base_url, id));
    let reporter = format_user(meta.get("reported_by"), host_root);
    let created = meta.get("created_on").and_then(Value::as_str).unwrap_or("unknown");
    format!(
        "\n\n{FOOTER_RULE}\n- Original issue: {url}\n- Originally reported by: {reporter}\n- Originally created at: {created}\n"
    )
}

/// `author_info` (object) or `user` (username or object) of one comment.
fn comment_footer(comment: &Value, host_root: &str) -> String {
    let author = comment.get("author_info").or_else(|| comment.get("user"));
    format!("\n\n{FOOTER_RULE}\nOriginal comment by: {}\n", format_user(author, host_root))
}

/// `[First Last](<host_root>/<username>)`; the username stands in for a
/// missing name, and no username gives plain text or `Anonymous`.
fn format_user(user: Option<&Value>, host_root: &str) -> String {
    match user {
        Some(Value::String(name)) if !name.trim().is_empty() => {
            format!("[{0}]({1}/{0})", name.trim(), host_root)
        }
        Some(Value::Object(info)) => {
            let display = match (text_field(info, "first_name"), text_field(info, "last_name")) {
                (Some(first), Some(last)) => Some(format!("{first} {last}")),
                _ => None,
            };
            match text_field(info, "username") {
                Some(username) => format!(
                    "[{}]({}/{})",
                    display.as_deref().unwrap_or(username),
                    host_root,
                    username
                ),
                None => display.unwrap_or_else(|| ANONYMOUS.to_string()),
            }
        }
        _ => ANONYMOUS.to_string(),
    }
}

fn text_field<'a>(info: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    info.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

/// `issue.local_id`, or a top-level `local_id` for flat exports.
pub fn local_id(issue: &Value) -> Option<u64> {
    issue
        .get("issue")
        .and_then(|i| i.get("local_id"))
        .or_else(|| issue.get("local_id"))
        .and_then(Value::as_u64)
}

/// Insert a placeholder for every number in `1..=max(local_id)` that no
/// issue uses, then order issues by `local_id` (issues without one go last).
/// Returns the number of placeholders added.
pub fn fill_gaps(issues: &mut Vec<Value>) -> usize {
    let used: BTreeSet<u64> = issues.iter().filter_map(local_id).collect();
    let Some(&max) = used.last() else {
        return 0;
    };
    let before = issues.len();
    issues.extend((1..=max).filter(|n| !used.contains(n)).map(placeholder_issue));
    issues.sort_by_key(|issue| local_id(issue).unwrap_or(u64::MAX));
    let added = issues.len() - before;
    if added > 0 {
        info!(added, highest = max, "Filled issue number gaps");
    }
    added
}

fn placeholder_issue(number: u64) -> Value {
    json!({
        "issue": {
            "local_id": number,
            "title": format!("Placeholder for missing issue #{number}"),
            "content": "This issue number was not used on the old tracker.",
            "status": "invalid",
        },
        "comments": [],
    })
}
