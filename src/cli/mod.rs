//! CLI layer: argument parsing, logging setup, and subcommand implementations.

pub mod args;

pub use args::*;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use relink::issues::{load_document, save_document};
use relink::{
    convert_document, export_log, load_dump, load_index, save_dump, save_index, ConversionOptions,
    HttpUserDirectory, IdentityIndex, KnownUsers, Lookup, MigrationConfig, RelinkError,
    RewriteContext, Rewriter, SavedIndex, UserCheck, VerifiedUsers,
};

// ─── CLI ─────────────────────────────────────────────────────────────

/// Migrate issue tracker references between repository hosts
#[derive(Parser, Debug)]
#[command(
    name = "relink",
    version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_DATETIME"), ")"),
    about,
    after_help = "\
Typical run:\n  \
relink export-log --vcs hg ./sphinx-hg -o hglog.json\n  \
relink export-log --vcs git ./sphinx-git -o gitlog.json\n  \
relink convert issues.json issues_git.json --old-log hglog.json --new-log gitlog.json \\\n    \
--old-base-url https://bitbucket.org/birkenfeld/sphinx --new-base-url https://github.com/sphinx-doc/sphinx"
)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub logging: LogArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Dump a repository's commit log as JSON (runs git or hg)
    ExportLog(ExportLogArgs),

    /// Correlate two log dumps and save the identity index
    Index(IndexArgs),

    /// Resolve old commit identities to new ones
    Resolve(ResolveArgs),

    /// Rewrite references in an issue export
    Convert(ConvertArgs),
}

// ─── Main entry point ───────────────────────────────────────────────

pub fn run() {
    let cli = Cli::parse();
    init_logging(&cli.logging);

    let result = match cli.command {
        Commands::ExportLog(args) => cmd_export_log(args),
        Commands::Index(args) => cmd_index(args),
        Commands::Resolve(args) => cmd_resolve(args),
        Commands::Convert(args) => cmd_convert(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(args: &LogArgs) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if args.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ─── Commands ───────────────────────────────────────────────────────

fn cmd_export_log(args: ExportLogArgs) -> Result<(), RelinkError> {
    let dump = export_log(args.vcs, &args.repo)?;
    save_dump(&args.output, &dump)?;
    info!(commits = dump.messages.len(), path = %args.output.display(), "Log dump written");
    Ok(())
}

fn cmd_index(args: IndexArgs) -> Result<(), RelinkError> {
    let index = index_from_logs(&args.old_log, &args.new_log)?;
    let stats = index.stats();
    let identities = index.len();
    let resolved = index.resolved_count();
    save_index(&args.output, &SavedIndex::new(index, &args.old_log, &args.new_log))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Index saved to {}", args.output.display());
        println!("  old identities: {}", identities);
        println!("  resolved:       {}", resolved);
        println!("  unresolved:     {}", identities - resolved);
        println!("  new unmatched:  {}", stats.unmatched_new);
        println!("  collisions:     {}", stats.collisions);
    }
    Ok(())
}

fn cmd_resolve(args: ResolveArgs) -> Result<(), RelinkError> {
    let index = load_source(&args.source)?;
    for query in &args.queries {
        let outcome = match index.lookup(query) {
            Lookup::Resolved { new, .. } => new.to_string(),
            Lookup::Tip => "unresolved (tip)".to_string(),
            Lookup::Empty => "unresolved (empty)".to_string(),
            Lookup::UnknownOld => "unresolved (not in old log)".to_string(),
            Lookup::AbsentFromNew { old } => format!("unresolved ({} absent from new log)", old),
        };
        println!("{} -> {}", query, outcome);
    }
    Ok(())
}

fn cmd_convert(args: ConvertArgs) -> Result<(), RelinkError> {
    let config = MigrationConfig::resolve(args.config.as_deref())?;
    let old_base = args.old_base_url.or(config.old_base_url).ok_or_else(|| {
        RelinkError::InvalidArgs("--old-base-url is required (or old_base_url in the config file)".to_string())
    })?;
    let new_base = args.new_base_url.or(config.new_base_url).ok_or_else(|| {
        RelinkError::InvalidArgs("--new-base-url is required (or new_base_url in the config file)".to_string())
    })?;

    let index = load_source(&args.source)?;
    let ctx = RewriteContext::new(&old_base, &new_base)?;
    let host_root = ctx.old_host_root();
    let rewriter = Rewriter::new(&index, ctx)?
        .with_extra_denylist(config.extra_denylist.into_iter().chain(args.deny));

    let user_check = match args.user_check {
        Some(check) => check,
        None if !args.known_users.is_empty() => UserCheck::List,
        None => config.user_check,
    };
    let rewriter = match user_check {
        UserCheck::Off => rewriter,
        UserCheck::List => {
            let names = config.known_users.into_iter().chain(args.known_users);
            rewriter.with_users(VerifiedUsers::new(Box::new(KnownUsers::new(names))))
        }
        UserCheck::Http => {
            let timeout = std::time::Duration::from_secs(args.user_check_timeout);
            let directory = HttpUserDirectory::with_timeout(&host_root, timeout)?;
            rewriter.with_users(VerifiedUsers::new(Box::new(directory)))
        }
    };

    let mut doc = load_document(&args.input)?;
    let options = ConversionOptions {
        wiki_blocks: args.wiki_blocks,
        fill_gaps: args.fill_gaps,
        attribution: args.attribution,
    };
    let summary = convert_document(&mut doc, &rewriter, options)?;
    save_document(&args.output, &doc)?;
    rewriter.log_summary();

    info!(
        path = %args.output.display(),
        issues = summary.issues,
        rewritten = summary.fields_rewritten,
        "Converted issues written"
    );
    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────

fn index_from_logs(old_log: &std::path::Path, new_log: &std::path::Path) -> Result<IdentityIndex, RelinkError> {
    let old = load_dump(old_log)?;
    let new = load_dump(new_log)?;
    IdentityIndex::from_logs(&old.messages, &new.messages)
}

fn load_source(source: &IndexSourceArgs) -> Result<IdentityIndex, RelinkError> {
    match (&source.index, &source.old_log, &source.new_log) {
        (Some(path), _, _) => Ok(load_index(path)?.index),
        (None, Some(old_log), Some(new_log)) => index_from_logs(old_log, new_log),
        _ => Err(RelinkError::InvalidArgs(
            "either --index or both --old-log and --new-log are required".to_string(),
        )),
    }
}
