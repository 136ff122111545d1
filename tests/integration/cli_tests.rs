use clap::Parser;
use dupeguard::cli::Cli;
use dupeguard::config::Overrides;
use dupeguard::duplicates::{ActionMode, KeepRule};
use dupeguard::output::OutputFormat;
use dupeguard::scanner::HashAlgorithm;
use std::path::PathBuf;

#[test]
fn test_minimal_invocation() {
    let cli = Cli::try_parse_from(["dupeguard", "/data"]).unwrap();

    assert_eq!(cli.scan.root, PathBuf::from("/data"));
    assert_eq!(cli.scan.action, ActionMode::ReportOnly);
    assert_eq!(cli.scan.format, OutputFormat::Text);
    assert!(!cli.scan.dry_run);
    assert_eq!(cli.scan.overrides(), Overrides::default());
}

#[test]
fn test_full_invocation() {
    let cli = Cli::try_parse_from([
        "dupeguard",
        "-r",
        "-a",
        "sha256",
        "--min-size",
        "1KiB",
        "--keep",
        "shortest-path",
        "--action",
        "move:/tmp/q",
        "--dry-run",
        "--verify",
        "--io-threads",
        "2",
        "--format",
        "json",
        "-vv",
        "/data",
    ])
    .unwrap();

    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.scan.action, ActionMode::Move(PathBuf::from("/tmp/q")));
    assert_eq!(cli.scan.format, OutputFormat::Json);
    assert!(cli.scan.dry_run);

    let overrides = cli.scan.overrides();
    assert_eq!(overrides.recursive, Some(true));
    assert_eq!(overrides.algorithm, Some(HashAlgorithm::Strong));
    assert_eq!(overrides.min_size, Some(1024));
    assert_eq!(overrides.keep, Some(KeepRule::ShortestPath));
    assert_eq!(overrides.io_threads, Some(2));
    assert_eq!(overrides.verify, Some(true));
    assert_eq!(overrides.follow_symlinks, None);
}

#[test]
fn test_invalid_action_rejected() {
    assert!(Cli::try_parse_from(["dupeguard", "--action", "shred", "/data"]).is_err());
    assert!(Cli::try_parse_from(["dupeguard", "--action", "move:", "/data"]).is_err());
}

#[test]
fn test_interactive_conflicts_with_yes() {
    let result = Cli::try_parse_from(["dupeguard", "--action", "delete", "-i", "-y", "/data"]);
    assert!(result.is_err());
}

#[test]
fn test_quiet_conflicts_with_verbose() {
    assert!(Cli::try_parse_from(["dupeguard", "-q", "-v", "/data"]).is_err());
}

#[test]
fn test_root_is_required() {
    assert!(Cli::try_parse_from(["dupeguard"]).is_err());
}

#[test]
fn test_bad_size_rejected() {
    assert!(Cli::try_parse_from(["dupeguard", "--min-size", "12XB", "/data"]).is_err());
}

#[test]
fn test_config_and_report_paths() {
    let cli = Cli::try_parse_from([
        "dupeguard",
        "--config",
        "/etc/dupeguard.toml",
        "--report",
        "out.json",
        "--json-errors",
        "/data",
    ])
    .unwrap();

    assert_eq!(cli.config, Some(PathBuf::from("/etc/dupeguard.toml")));
    assert_eq!(cli.scan.report, Some(PathBuf::from("out.json")));
    assert!(cli.json_errors);
}
