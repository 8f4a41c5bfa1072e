//! Produce log dumps by running the VCS command-line tools.
//!
//! Both exports list commits oldest first and emit one record per commit,
//! with fields and records delimited by separators that do not occur in
//! commit messages.

use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::RelinkError;
use crate::log::{LogDump, LogEntry};

const FIELD_SEP: &str = "␞";
const RECORD_SEP: &str = "␟";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Vcs {
    Git,
    Hg,
}

impl Vcs {
    pub fn program(self) -> &'static str {
        match self {
            Vcs::Git => "git",
            Vcs::Hg => "hg",
        }
    }

    /// Fields per record: git `node date email desc`, hg `rev node date author desc`.
    fn field_count(self) -> usize {
        match self {
            Vcs::Git => 4,
            Vcs::Hg => 5,
        }
    }

    fn command(self, repo: &Path) -> Command {
        let mut cmd = Command::new(self.program());
        match self {
            Vcs::Git => {
                let format = format!("{RECORD_SEP}%H{FIELD_SEP}%ad{FIELD_SEP}%ae{FIELD_SEP}%B");
                cmd.arg("-C")
                    .arg(repo)
                    .args(["log", "--date-order", "--reverse", "--date=iso"])
                    .arg(format!("--format={format}"));
            }
            Vcs::Hg => {
                let template = format!(
                    "{RECORD_SEP}{{rev}}{FIELD_SEP}{{node}}{FIELD_SEP}{{date|isodatesec}}{FIELD_SEP}{{author}}{FIELD_SEP}{{desc}}"
                );
                cmd.arg("-R")
                    .arg(repo)
                    .args(["log", "-r", "0:tip", "--template"])
                    .arg(template)
                    .env("HGENCODING", "utf8")
                    .env("HGPLAIN", "1");
            }
        }
        cmd
    }
}

/// Export the full history of `repo` as a log dump.
pub fn export_log(vcs: Vcs, repo: &Path) -> Result<LogDump, RelinkError> {
    let output = run_vcs(vcs, &mut vcs.command(repo))?;
    let messages = parse_export(vcs, &output)?;
    info!(vcs = vcs.program(), repo = %repo.display(), commits = messages.len(), "Exported log");
    Ok(LogDump { messages })
}

fn run_vcs(vcs: Vcs, cmd: &mut Command) -> Result<String, RelinkError> {
    let collaborator = vcs.program();
    let output = cmd.output().map_err(|e| RelinkError::Collaborator {
        collaborator,
        message: format!("Failed to execute {}: {}. Is it installed and in PATH?", collaborator, e),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RelinkError::Collaborator {
            collaborator,
            message: format!("command failed ({}): {}", output.status, stderr.trim()),
        });
    }

    match String::from_utf8(output.stdout) {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!(vcs = collaborator, "Log output is not valid UTF-8, invalid bytes replaced");
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

/// Parse separator-delimited VCS output into log entries.
///
/// Git entries carry the commit hash as `revnum`; hg entries carry the
/// integer revision.
pub fn parse_export(vcs: Vcs, output: &str) -> Result<Vec<LogEntry>, RelinkError> {
    let expected = vcs.field_count();
    output
        .split(RECORD_SEP)
        .filter(|record| !record.trim().is_empty())
        .enumerate()
        .map(|(position, record)| {
            let fields: Vec<&str> = record.splitn(expected, FIELD_SEP).collect();
            if fields.len() < expected {
                return Err(RelinkError::MalformedLogEntry {
                    log: vcs.program(),
                    position,
                    reason: format!("expected {} fields, found {}", expected, fields.len()),
                });
            }
            let (revnum, rest) = match vcs {
                Vcs::Git => (Value::String(fields[0].trim().to_string()), &fields[..]),
                Vcs::Hg => {
                    let rev: u64 = fields[0].trim().parse().map_err(|_| RelinkError::MalformedLogEntry {
                        log: vcs.program(),
                        position,
                        reason: format!("revision '{}' is not a number", fields[0].trim()),
                    })?;
                    (Value::from(rev), &fields[1..])
                }
            };
            Ok(LogEntry {
                revnum: Some(revnum),
                node: Some(rest[0].trim().to_string()),
                date: Some(rest[1].trim().to_string()),
                email: Some(rest[2].trim().to_string()),
                desc: Some(rest[3].trim().to_string()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_record(node: &str, date: &str, email: &str, desc: &str) -> String {
        format!("{RECORD_SEP}{node}{FIELD_SEP}{date}{FIELD_SEP}{email}{FIELD_SEP}{desc}")
    }

    #[test]
    fn test_parse_git_export() {
        let output = format!(
            "{}\n{}\n",
            git_record("20fa9c09", "2014-01-01 12:00:00 +0100", "a@example.org", "Fix bug\n\nDetails\n"),
            git_record("1d063726", "2014-01-02 08:30:00 +0000", "b@example.org", "Second")
        );
        let entries = parse_export(Vcs::Git, &output).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].revnum, Some(Value::from("20fa9c09")));
        assert_eq!(entries[0].node.as_deref(), Some("20fa9c09"));
        assert_eq!(entries[0].date.as_deref(), Some("2014-01-01 12:00:00 +0100"));
        assert_eq!(entries[0].desc.as_deref(), Some("Fix bug\n\nDetails"));
        assert_eq!(entries[1].email.as_deref(), Some("b@example.org"));
    }

    #[test]
    fn test_parse_hg_export() {
        let output = format!(
            "{RECORD_SEP}0{FIELD_SEP}0f18c81b{FIELD_SEP}2014-01-01 12:00:00 +0100{FIELD_SEP}Georg <g@example.org>{FIELD_SEP}Initial{RECORD_SEP}1{FIELD_SEP}e282b3a8{FIELD_SEP}2014-01-02 12:00:00 +0100{FIELD_SEP}Georg <g@example.org>{FIELD_SEP}Second"
        );
        let entries = parse_export(Vcs::Hg, &output).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].revnum, Some(Value::from(1u64)));
        assert_eq!(entries[1].node.as_deref(), Some("e282b3a8"));
        assert_eq!(entries[1].email.as_deref(), Some("Georg <g@example.org>"));
    }

    #[test]
    fn test_parse_hg_rejects_non_numeric_revision() {
        let output = format!("{RECORD_SEP}x{FIELD_SEP}n{FIELD_SEP}d{FIELD_SEP}a{FIELD_SEP}m");
        let err = parse_export(Vcs::Hg, &output).unwrap_err();
        assert!(err.to_string().contains("not a number"));
    }

    #[test]
    fn test_parse_short_record() {
        let output = format!("{RECORD_SEP}abc{FIELD_SEP}2014-01-01");
        let err = parse_export(Vcs::Git, &output).unwrap_err();
        assert!(matches!(err, RelinkError::MalformedLogEntry { log: "git", position: 0, .. }));
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_export(Vcs::Git, "").unwrap().is_empty());
        assert!(parse_export(Vcs::Hg, "\n").unwrap().is_empty());
    }

    #[test]
    fn test_export_missing_repository_is_collaborator_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = export_log(Vcs::Git, &dir.path().join("no-such-repo")).unwrap_err();
        assert!(matches!(err, RelinkError::Collaborator { collaborator: "git", .. }));
    }

    #[test]
    fn test_export_real_git_repository() {
        if Command::new("git").arg("--version").output().is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let git = |args: &[&str]| {
            let status = Command::new("git")
                .arg("-C")
                .arg(dir.path())
                .args(["-c", "user.name=Test", "-c", "user.email=test@example.org"])
                .args(args)
                .env("GIT_AUTHOR_DATE", "2014-01-01T12:00:00+01:00")
                .env("GIT_COMMITTER_DATE", "2014-01-01T12:00:00+01:00")
                .status()
                .unwrap();
            assert!(status.success(), "git {:?} failed", args);
        };
        git(&["init", "--quiet"]);
        git(&["commit", "--quiet", "--allow-empty", "-m", "First commit"]);
        git(&["commit", "--quiet", "--allow-empty", "-m", "Second commit"]);

        let dump = export_log(Vcs::Git, dir.path()).unwrap();
        assert_eq!(dump.messages.len(), 2);
        assert_eq!(dump.messages[0].desc.as_deref(), Some("First commit"));
        assert_eq!(dump.messages[0].email.as_deref(), Some("test@example.org"));
        assert_eq!(dump.messages[0].date.as_deref(), Some("2014-01-01 12:00:00 +0100"));
        assert_eq!(dump.messages[0].node.as_ref().map(|n| n.len()), Some(40));
    }
}
