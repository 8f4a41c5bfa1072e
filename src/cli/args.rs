//! CLI argument structs for all subcommands.

use std::path::PathBuf;

use clap::{Args, Parser};

use relink::{UserCheck, Vcs};

/// Logging flags shared by every subcommand.
#[derive(Args, Debug)]
pub struct LogArgs {
    /// Log level: error, warn, info, debug, trace (RUST_LOG overrides)
    #[arg(long, global = true, default_value = "info",
          value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Where the identity index comes from: a saved index, or a pair of log dumps.
#[derive(Args, Debug)]
#[group(required = true, multiple = true)]
pub struct IndexSourceArgs {
    /// Saved index file (from `relink index`)
    #[arg(long, conflicts_with_all = ["old_log", "new_log"])]
    pub index: Option<PathBuf>,

    /// Log dump of the old repository (e.g. hglog.json)
    #[arg(long, requires = "new_log")]
    pub old_log: Option<PathBuf>,

    /// Log dump of the new repository (e.g. gitlog.json)
    #[arg(long, requires = "old_log")]
    pub new_log: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ExportLogArgs {
    /// Version control system of the repository
    #[arg(long, value_enum)]
    pub vcs: Vcs,

    /// Path to the repository working copy
    pub repo: PathBuf,

    /// Output log dump (JSON)
    #[arg(short, long)]
    pub output: PathBuf,
}

#[derive(Parser, Debug)]
pub struct IndexArgs {
    /// Log dump of the old repository
    #[arg(long)]
    pub old_log: PathBuf,

    /// Log dump of the new repository
    #[arg(long)]
    pub new_log: PathBuf,

    /// Where to save the index
    #[arg(short, long)]
    pub output: PathBuf,

    /// Print index statistics as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub source: IndexSourceArgs,

    /// Old identities to resolve: hash prefixes, revision numbers, `REV:HASH`
    #[arg(required = true)]
    pub queries: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// Issue export to read (JSON)
    pub input: PathBuf,

    /// Converted issue export to write (JSON)
    pub output: PathBuf,

    #[command(flatten)]
    pub source: IndexSourceArgs,

    /// Configuration file (default: <config dir>/relink/config.json if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Old repository base URL, e.g. https://bitbucket.org/owner/repo
    #[arg(long)]
    pub old_base_url: Option<String>,

    /// New repository base URL, e.g. https://github.com/owner/repo
    #[arg(long)]
    pub new_base_url: Option<String>,

    /// How @mentions are verified before linking
    #[arg(long, value_enum)]
    pub user_check: Option<UserCheck>,

    /// Known account on the old host (repeatable; implies --user-check list)
    #[arg(long = "known-user", value_name = "NAME")]
    pub known_users: Vec<String>,

    /// @token that is never a mention (repeatable)
    #[arg(long = "deny", value_name = "TOKEN")]
    pub deny: Vec<String>,

    /// Request timeout in seconds for --user-check http
    #[arg(long, value_name = "SECS", default_value_t = relink::users::DEFAULT_LOOKUP_TIMEOUT_SECS)]
    pub user_check_timeout: u64,

    /// Insert placeholder issues for unused issue numbers
    #[arg(long)]
    pub fill_gaps: bool,

    /// Convert {{{ }}} wiki code blocks to Markdown before rewriting
    #[arg(long)]
    pub wiki_blocks: bool,

    /// Append an "originally reported/commented by" footer to each body
    #[arg(long)]
    pub attribution: bool,
}
