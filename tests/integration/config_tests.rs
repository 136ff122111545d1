use dupeguard::config::{ConfigError, Overrides, Settings, ENV_PREFIX};
use dupeguard::duplicates::{ActionMode, KeepRule};
use dupeguard::scanner::HashAlgorithm;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_settings_save_and_reload_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let settings = Settings {
        recursive: true,
        algorithm: HashAlgorithm::Strong,
        min_size: 4096,
        keep: KeepRule::ShortestPath,
        io_threads: 2,
        ..Default::default()
    };
    let content = toml::to_string_pretty(&settings).unwrap();
    assert!(content.contains("algorithm = \"strong\""));
    assert!(content.contains("keep = \"shortest-path\""));
    fs::write(&path, content).unwrap();

    let loaded: Settings = Figment::from(Serialized::defaults(Settings::default()))
        .merge(Toml::file(&path))
        .extract()
        .unwrap();
    assert_eq!(loaded, settings);
}

#[test]
fn test_partial_file_keeps_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "verify = true\n").unwrap();

    let loaded: Settings = Figment::from(Serialized::defaults(Settings::default()))
        .merge(Toml::file(&path))
        .extract()
        .unwrap();

    assert!(loaded.verify);
    assert_eq!(loaded.io_threads, 4);
    assert_eq!(loaded.keep, KeepRule::FirstPath);
    assert_eq!(loaded.algorithm, HashAlgorithm::Fast);
}

#[test]
fn test_invalid_toml_is_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "recursive = [not toml").unwrap();

    let result = Settings::load(Some(&path), &Overrides::default());
    assert!(matches!(result, Err(ConfigError::Load(_))));
}

#[test]
fn test_env_layer_over_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "follow_symlinks = false\nchunk_size = 1024\n").unwrap();

    std::env::set_var("DUPEGUARD_FOLLOW_SYMLINKS", "true");

    // Figment directly so other tests' environment does not leak in.
    let loaded: Settings = Figment::from(Serialized::defaults(Settings::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed(ENV_PREFIX).only(&["follow_symlinks"]))
        .extract()
        .unwrap();

    std::env::remove_var("DUPEGUARD_FOLLOW_SYMLINKS");

    assert!(loaded.follow_symlinks);
    assert_eq!(loaded.chunk_size, 1024);
}

#[test]
fn test_cli_overrides_win() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "keep = \"oldest\"\nmin_size = 100\n").unwrap();

    let overrides = Overrides {
        keep: Some(KeepRule::FirstPath),
        ..Default::default()
    };
    let settings = Settings::load(Some(&path), &overrides).unwrap();

    assert_eq!(settings.keep, KeepRule::FirstPath);
    assert_eq!(settings.min_size, 100);
}

#[test]
fn test_resolve_canonicalizes_root() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("inner");
    fs::create_dir(&nested).unwrap();
    let dotted = nested.join("..").join("inner");

    let options = Settings::default()
        .resolve(&dotted, ActionMode::ReportOnly, false)
        .unwrap();

    assert_eq!(options.root, nested.canonicalize().unwrap());
    assert_eq!(options.action, ActionMode::ReportOnly);
}

#[test]
fn test_resolve_errors_are_config_errors() {
    let dir = tempdir().unwrap();

    let missing = Settings::default().resolve(
        &dir.path().join("absent"),
        ActionMode::ReportOnly,
        false,
    );
    assert!(matches!(missing, Err(ConfigError::RootNotFound(_))));

    let dry_report = Settings::default().resolve(dir.path(), ActionMode::ReportOnly, true);
    assert!(matches!(dry_report, Err(ConfigError::DryRunWithReportOnly)));

    let err = dry_report.unwrap_err();
    assert!(err.to_string().contains("report-only"));
}
