    use super::cli::{Cli, Commands};
    use clap::{CommandFactory, Parser};
    use relink::{UserCheck, Vcs};
    use std::path::PathBuf;

    // ─── Argument parsing ────────────────────────────────

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_export_log() {
        let cli = Cli::try_parse_from(["relink", "export-log", "--vcs", "hg", "repo", "-o", "hglog.json"]).unwrap();
        match cli.command {
            Commands::ExportLog(args) => {
                assert_eq!(args.vcs, Vcs::Hg);
                assert_eq!(args.repo, PathBuf::from("repo"));
                assert_eq!(args.output, PathBuf::from("hglog.json"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.logging.log_level, "info");
        assert!(!cli.logging.log_json);
    }

    #[test]
    fn test_parse_index() {
        let cli = Cli::try_parse_from([
            "relink", "index", "--old-log", "hg.json", "--new-log", "git.json", "-o", "out.relink", "--json",
        ])
        .unwrap();
        let Commands::Index(args) = cli.command else {
            panic!("expected index command");
        };
        assert_eq!(args.old_log, PathBuf::from("hg.json"));
        assert!(args.json);
    }

    #[test]
    fn test_parse_resolve_with_saved_index() {
        let cli = Cli::try_parse_from(["relink", "resolve", "--index", "s.relink", "0f18c81b", "123", "tip"]).unwrap();
        let Commands::Resolve(args) = cli.command else {
            panic!("expected resolve command");
        };
        assert_eq!(args.source.index, Some(PathBuf::from("s.relink")));
        assert_eq!(args.queries, vec!["0f18c81b", "123", "tip"]);
    }

    #[test]
    fn test_resolve_requires_a_source() {
        assert!(Cli::try_parse_from(["relink", "resolve", "0f18c81b"]).is_err());
    }

    #[test]
    fn test_resolve_old_log_requires_new_log() {
        assert!(Cli::try_parse_from(["relink", "resolve", "--old-log", "hg.json", "abc"]).is_err());
    }

    #[test]
    fn test_index_conflicts_with_logs() {
        let result = Cli::try_parse_from([
            "relink", "resolve", "--index", "s.relink", "--old-log", "a", "--new-log", "b", "abc",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_convert_full() {
        let cli = Cli::try_parse_from([
            "relink",
            "convert",
            "issues.json",
            "issues_git.json",
            "--old-log",
            "hg.json",
            "--new-log",
            "git.json",
            "--old-base-url",
            "https://bitbucket.org/birkenfeld/sphinx",
            "--new-base-url",
            "https://github.com/sphinx-doc/sphinx",
            "--user-check",
            "none",
            "--known-user",
            "birkenfeld",
            "--known-user",
            "shimizukawa",
            "--deny",
            "media",
            "--fill-gaps",
            "--wiki-blocks",
            "--attribution",
            "--user-check-timeout",
            "5",
            "--log-level",
            "debug",
            "--log-json",
        ])
        .unwrap();
        assert_eq!(cli.logging.log_level, "debug");
        assert!(cli.logging.log_json);
        let Commands::Convert(args) = cli.command else {
            panic!("expected convert command");
        };
        assert_eq!(args.input, PathBuf::from("issues.json"));
        assert_eq!(args.output, PathBuf::from("issues_git.json"));
        assert_eq!(args.user_check, Some(UserCheck::Off));
        assert_eq!(args.known_users, vec!["birkenfeld", "shimizukawa"]);
        assert_eq!(args.deny, vec!["media"]);
        assert_eq!(args.user_check_timeout, 5);
        assert!(args.fill_gaps);
        assert!(args.wiki_blocks);
        assert!(args.attribution);
    }

    #[test]
    fn test_parse_convert_defaults() {
        let cli = Cli::try_parse_from(["relink", "convert", "in.json", "out.json", "--index", "s.relink"]).unwrap();
        let Commands::Convert(args) = cli.command else {
            panic!("expected convert command");
        };
        assert_eq!(args.user_check, None);
        assert_eq!(args.user_check_timeout, relink::users::DEFAULT_LOOKUP_TIMEOUT_SECS);
        assert!(!args.attribution);
        assert!(!args.fill_gaps);
        assert!(!args.wiki_blocks);
    }

    #[test]
    fn test_convert_rejects_unknown_flag() {
        let result = Cli::try_parse_from([
            "relink", "convert", "in.json", "out.json", "--index", "s.relink", "--curl", "curl",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        assert!(Cli::try_parse_from(["relink", "--log-level", "loud", "resolve", "--index", "x", "a"]).is_err());
    }

    #[test]
    fn test_invalid_vcs_rejected() {
        assert!(Cli::try_parse_from(["relink", "export-log", "--vcs", "svn", "repo", "-o", "x.json"]).is_err());
    }
