use dupeguard::config::{PipelineOptions, Settings};
use dupeguard::duplicates::{ActionMode, KeepRule};
use dupeguard::error::ExitCode;
use dupeguard::events::{EventSink, NullSink, Phase};
use dupeguard::output::{OutputFormat, Report};
use dupeguard::pipeline::Pipeline;
use dupeguard::scanner::HashAlgorithm;
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

fn options(root: &Path, settings: Settings, action: ActionMode, dry_run: bool) -> PipelineOptions {
    settings.resolve(root, action, dry_run).unwrap()
}

fn run(options: PipelineOptions) -> Report {
    Pipeline::new(options)
        .with_events(Arc::new(NullSink))
        .run()
        .unwrap()
}

fn path_str(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

/// a.txt and b.txt share content, c.txt has the same size but differs.
fn write_abc(dir: &Path) {
    fs::write(dir.join("a.txt"), b"hello").unwrap();
    fs::write(dir.join("b.txt"), b"hello").unwrap();
    fs::write(dir.join("c.txt"), b"world").unwrap();
}

#[test]
fn test_report_only_basic_group() {
    let dir = tempdir().unwrap();
    write_abc(dir.path());
    let root = dir.path().canonicalize().unwrap();

    let report = run(options(
        dir.path(),
        Settings::default(),
        ActionMode::ReportOnly,
        false,
    ));

    assert_eq!(report.plans.len(), 1);
    let plan = &report.plans[0];
    assert_eq!(plan.keeper, path_str(root.join("a.txt")));
    assert_eq!(plan.removable.len(), 1);
    assert_eq!(plan.removable[0].path, path_str(root.join("b.txt")));
    assert_eq!(plan.size, 5);
    assert_eq!(plan.digest_hex.len(), 32);

    assert_eq!(report.summary.files_scanned, 3);
    assert_eq!(report.summary.bytes_reclaimable, 5);
    assert_eq!(report.summary.bytes_reclaimed, 0);
    assert_eq!(report.exit_code(), ExitCode::Success);

    // Report-only never touches the filesystem.
    assert!(root.join("b.txt").exists());
}

#[test]
fn test_empty_directory() {
    let dir = tempdir().unwrap();
    let report = run(options(
        dir.path(),
        Settings::default(),
        ActionMode::ReportOnly,
        false,
    ));

    assert!(report.plans.is_empty());
    assert_eq!(report.summary.files_scanned, 0);
    assert_eq!(report.exit_code(), ExitCode::Success);
}

#[test]
fn test_strong_digest_and_verify_agree() {
    let dir = tempdir().unwrap();
    write_abc(dir.path());
    fs::write(dir.path().join("d.txt"), b"hello").unwrap();

    let fast = run(options(
        dir.path(),
        Settings::default(),
        ActionMode::ReportOnly,
        false,
    ));
    let strong = run(options(
        dir.path(),
        Settings {
            algorithm: HashAlgorithm::Strong,
            verify: true,
            ..Default::default()
        },
        ActionMode::ReportOnly,
        false,
    ));

    assert_eq!(strong.algorithm, HashAlgorithm::Strong);
    assert_eq!(strong.plans[0].digest_hex.len(), 64);

    let members = |r: &Report| -> Vec<(String, Vec<String>)> {
        r.plans
            .iter()
            .map(|p| {
                (
                    p.keeper.clone(),
                    p.removable.iter().map(|f| f.path.clone()).collect(),
                )
            })
            .collect()
    };
    assert_eq!(members(&fast), members(&strong));
}

#[test]
fn test_recursive_and_min_size() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("nested");
    fs::create_dir(&sub).unwrap();
    fs::write(dir.path().join("top.bin"), b"same bytes").unwrap();
    fs::write(sub.join("deep.bin"), b"same bytes").unwrap();
    fs::write(dir.path().join("tiny1"), b"x").unwrap();
    fs::write(dir.path().join("tiny2"), b"x").unwrap();

    let flat = run(options(
        dir.path(),
        Settings::default(),
        ActionMode::ReportOnly,
        false,
    ));
    // Only the tiny pair lives directly under the root.
    assert_eq!(flat.plans.len(), 1);
    assert_eq!(flat.plans[0].size, 1);

    let recursive = run(options(
        dir.path(),
        Settings {
            recursive: true,
            min_size: 2,
            ..Default::default()
        },
        ActionMode::ReportOnly,
        false,
    ));
    assert_eq!(recursive.plans.len(), 1);
    assert_eq!(recursive.plans[0].size, 10);
    assert_eq!(recursive.summary.files_scanned, 2);
}

#[test]
fn test_groups_sorted_by_size_descending() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("s1"), b"ab").unwrap();
    fs::write(dir.path().join("s2"), b"ab").unwrap();
    fs::write(dir.path().join("l1"), b"abcdefgh").unwrap();
    fs::write(dir.path().join("l2"), b"abcdefgh").unwrap();

    let report = run(options(
        dir.path(),
        Settings::default(),
        ActionMode::ReportOnly,
        false,
    ));

    let sizes: Vec<u64> = report.plans.iter().map(|p| p.size).collect();
    assert_eq!(sizes, vec![8, 2]);
}

#[test]
fn test_keep_oldest() {
    let dir = tempdir().unwrap();
    write_abc(dir.path());
    set_file_mtime(dir.path().join("a.txt"), FileTime::from_unix_time(2_000_000, 0)).unwrap();
    set_file_mtime(dir.path().join("b.txt"), FileTime::from_unix_time(1_000_000, 0)).unwrap();
    let root = dir.path().canonicalize().unwrap();

    let report = run(options(
        dir.path(),
        Settings {
            keep: KeepRule::Oldest,
            ..Default::default()
        },
        ActionMode::ReportOnly,
        false,
    ));

    assert_eq!(report.plans[0].keeper, path_str(root.join("b.txt")));
    assert_eq!(report.plans[0].removable[0].path, path_str(root.join("a.txt")));
}

#[test]
fn test_delete_then_rerun_is_idempotent() {
    let dir = tempdir().unwrap();
    write_abc(dir.path());
    fs::write(dir.path().join("d.txt"), b"hello").unwrap();

    let first = run(options(
        dir.path(),
        Settings::default(),
        ActionMode::Delete,
        false,
    ));
    assert_eq!(first.summary.duplicate_files, 2);
    assert_eq!(first.summary.bytes_reclaimed, 10);
    assert_eq!(first.exit_code(), ExitCode::Success);
    assert!(dir.path().join("a.txt").exists());
    assert!(!dir.path().join("b.txt").exists());
    assert!(!dir.path().join("d.txt").exists());
    assert!(dir.path().join("c.txt").exists());

    let second = run(options(
        dir.path(),
        Settings::default(),
        ActionMode::Delete,
        false,
    ));
    assert!(second.plans.is_empty());
    assert_eq!(second.summary.bytes_reclaimed, 0);
    assert_eq!(second.exit_code(), ExitCode::Success);
}

#[test]
fn test_dry_run_matches_real_run() {
    let dir = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    write_abc(dir.path());
    fs::write(dir.path().join("d.txt"), b"hello").unwrap();
    let action = ActionMode::Move(quarantine.path().to_path_buf());

    let dry = run(options(dir.path(), Settings::default(), action.clone(), true));
    assert!(dry.dry_run);
    assert_eq!(dry.summary.bytes_reclaimed, 0);
    assert!(dir.path().join("b.txt").exists());
    assert!(fs::read_dir(quarantine.path()).unwrap().next().is_none());

    let real = run(options(dir.path(), Settings::default(), action, false));
    assert!(!real.dry_run);
    assert_eq!(real.summary.bytes_reclaimed, 10);

    let mut normalized = dry.clone();
    normalized.dry_run = real.dry_run;
    normalized.summary.bytes_reclaimed = real.summary.bytes_reclaimed;
    assert_eq!(normalized, real);
}

#[test]
fn test_runs_are_deterministic() {
    let dir = tempdir().unwrap();
    for i in 0..6 {
        fs::write(dir.path().join(format!("x{i}")), b"repeated").unwrap();
        fs::write(dir.path().join(format!("y{i}")), format!("unique {i}")).unwrap();
    }
    fs::write(dir.path().join("p1"), b"pair").unwrap();
    fs::write(dir.path().join("p2"), b"pair").unwrap();

    let settings = Settings {
        io_threads: 3,
        ..Default::default()
    };
    let first = run(options(dir.path(), settings.clone(), ActionMode::ReportOnly, false));
    let second = run(options(dir.path(), settings, ActionMode::ReportOnly, false));

    assert_eq!(first, second);
    assert_eq!(first.plans.len(), 2);
}

#[test]
fn test_modified_file_fails_in_isolation() {
    let dir = tempdir().unwrap();
    for name in ["a.txt", "b.txt", "c.txt"] {
        fs::write(dir.path().join(name), b"payload").unwrap();
    }

    let pipeline = Pipeline::new(options(
        dir.path(),
        Settings::default(),
        ActionMode::Delete,
        false,
    ))
    .with_events(Arc::new(NullSink));
    let (plans, summary) = pipeline.plan().unwrap();

    // Changed between planning and execution.
    fs::write(dir.path().join("b.txt"), b"payload, but longer").unwrap();

    let report = pipeline.execute(&plans, &summary);
    let removable = &report.plans[0].removable;
    assert!(removable[0].error.is_some());
    assert!(removable[1].succeeded);
    assert!(dir.path().join("b.txt").exists());
    assert!(!dir.path().join("c.txt").exists());

    assert_eq!(report.summary.action_errors, 1);
    assert_eq!(report.summary.bytes_reclaimed, 7);
    assert_eq!(report.exit_code(), ExitCode::PartialSuccess);
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    write_abc(dir.path());
    let locked = dir.path().join("locked.txt");
    fs::write(&locked, b"hello").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    if fs::File::open(&locked).is_ok() {
        // Running with elevated privileges; permissions are not enforced.
        return;
    }

    let report = run(options(
        dir.path(),
        Settings::default(),
        ActionMode::ReportOnly,
        false,
    ));

    assert_eq!(report.plans.len(), 1);
    assert_eq!(report.plans[0].removable.len(), 1);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].path.ends_with("locked.txt"));
    assert_eq!(report.summary.files_skipped, 1);
    assert_eq!(report.exit_code(), ExitCode::PartialSuccess);

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
}

#[test]
fn test_interrupted_before_start() {
    let dir = tempdir().unwrap();
    write_abc(dir.path());

    let flag = Arc::new(AtomicBool::new(true));
    let report = Pipeline::new(options(
        dir.path(),
        Settings::default(),
        ActionMode::Delete,
        false,
    ))
    .with_events(Arc::new(NullSink))
    .with_shutdown_flag(flag)
    .run()
    .unwrap();

    assert!(report.interrupted);
    assert_eq!(report.exit_code(), ExitCode::Interrupted);
    assert!(dir.path().join("b.txt").exists());
}

#[test]
fn test_json_report_shape() {
    let dir = tempdir().unwrap();
    write_abc(dir.path());

    let report = run(options(
        dir.path(),
        Settings::default(),
        ActionMode::Delete,
        true,
    ));

    let mut buffer = Vec::new();
    OutputFormat::Json.write_report(&report, &mut buffer).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

    assert_eq!(value["dry_run"], true);
    assert_eq!(value["action"], "delete");
    assert_eq!(value["exit_code"], 0);
    assert_eq!(value["exit_code_name"], "DG000");
    assert_eq!(value["summary"]["groups_found"], 1);
    assert_eq!(value["plans"][0]["removable"][0]["succeeded"], true);
    assert!(value["generated_at"].is_string());
}

#[test]
fn test_text_report_shape() {
    let dir = tempdir().unwrap();
    write_abc(dir.path());

    let report = run(options(
        dir.path(),
        Settings::default(),
        ActionMode::Delete,
        true,
    ));

    let mut buffer = Vec::new();
    OutputFormat::Text.write_report(&report, &mut buffer).unwrap();
    let text = String::from_utf8(buffer).unwrap();

    assert!(text.starts_with("DRY RUN"));
    assert!(text.contains("[KEEP]"));
    assert!(text.contains("[DUPLICATE]"));
    assert!(text.contains("b.txt"));
    assert!(!text.contains("c.txt"));
}

/// Raises the shutdown flag once `phase` reports progress item `at`.
struct InterruptAt {
    phase: Phase,
    at: usize,
    flag: Arc<AtomicBool>,
}

impl EventSink for InterruptAt {
    fn on_progress(&self, phase: Phase, current: usize, _path: &Path) {
        if phase == self.phase && current >= self.at {
            self.flag.store(true, Ordering::SeqCst);
        }
    }
}

/// Three duplicate pairs of distinct sizes.
fn write_pairs(dir: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for (name, content) in [("x", "1"), ("y", "22"), ("z", "333")] {
        for suffix in ["a", "b"] {
            let path = dir.join(format!("{name}_{suffix}.txt"));
            fs::write(&path, content).unwrap();
            paths.push(path);
        }
    }
    paths
}

fn run_interrupted(root: &Path, phase: Phase, at: usize) -> Report {
    let flag = Arc::new(AtomicBool::new(false));
    let settings = Settings {
        io_threads: 1,
        ..Default::default()
    };
    Pipeline::new(options(root, settings, ActionMode::Delete, false))
        .with_events(Arc::new(InterruptAt {
            phase,
            at,
            flag: flag.clone(),
        }))
        .with_shutdown_flag(flag)
        .run()
        .unwrap()
}

#[test]
fn test_interrupted_while_hashing() {
    let dir = tempdir().unwrap();
    let paths = write_pairs(dir.path());

    // Items one to four hash, the fifth sees the flag.
    let report = run_interrupted(dir.path(), Phase::Hash, 5);

    assert!(report.interrupted);
    assert_eq!(report.exit_code(), ExitCode::Interrupted);
    assert_eq!(report.plans.len(), 2);
    assert_eq!(report.summary.groups_found, 2);
    for plan in &report.plans {
        assert!(Path::new(&plan.keeper).exists());
        assert!(plan.removable.iter().all(|r| !r.succeeded && r.error.is_none()));
    }
    assert!(paths.iter().all(|p| p.exists()));
    assert_eq!(report.summary.bytes_reclaimed, 0);
}

#[test]
fn test_interrupted_while_executing() {
    let dir = tempdir().unwrap();
    write_pairs(dir.path());

    let report = run_interrupted(dir.path(), Phase::Execute, 1);

    assert!(report.interrupted);
    assert_eq!(report.exit_code(), ExitCode::Interrupted);
    assert_eq!(report.plans.len(), 3);

    let removables: Vec<_> = report.plans.iter().flat_map(|p| &p.removable).collect();
    assert_eq!(removables.iter().filter(|r| r.succeeded).count(), 1);
    assert_eq!(
        removables
            .iter()
            .filter(|r| !r.succeeded && !r.declined && r.error.is_none())
            .count(),
        2
    );
    for plan in &report.plans {
        assert!(Path::new(&plan.keeper).exists());
    }
    assert_eq!(report.summary.bytes_reclaimed, report.plans[0].size);
}

#[cfg(unix)]
#[test]
fn test_permission_denied_is_isolated() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let locked = dir.path().join("sub");
    let open = dir.path().join("sub2");
    fs::create_dir_all(&locked).unwrap();
    fs::create_dir_all(&open).unwrap();
    fs::write(dir.path().join("a.txt"), b"copy").unwrap();
    fs::write(locked.join("b.txt"), b"copy").unwrap();
    fs::write(open.join("c.txt"), b"copy").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

    let canary = locked.join("canary");
    if fs::write(&canary, b"").is_ok() {
        // Running with elevated privileges; permissions are not enforced.
        let _ = fs::remove_file(&canary);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let settings = Settings {
        recursive: true,
        ..Default::default()
    };
    let report = run(options(dir.path(), settings, ActionMode::Delete, false));
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let plan = &report.plans[0];
    assert!(plan.keeper.ends_with("a.txt"));
    let b = plan.removable.iter().find(|r| r.path.ends_with("b.txt")).unwrap();
    let c = plan.removable.iter().find(|r| r.path.ends_with("c.txt")).unwrap();
    assert!(!b.succeeded);
    assert!(b.error.as_deref().unwrap().contains("permission denied"));
    assert!(c.succeeded);

    assert!(locked.join("b.txt").exists());
    assert!(!open.join("c.txt").exists());
    assert_eq!(report.summary.action_errors, 1);
    assert_eq!(report.summary.bytes_reclaimed, 4);
    assert_eq!(report.exit_code(), ExitCode::PartialSuccess);
}

#[cfg(unix)]
#[test]
fn test_hardlinks_are_not_reclaimable() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, b"linked").unwrap();
    fs::hard_link(&a, &b).unwrap();

    let report = run(options(
        dir.path(),
        Settings::default(),
        ActionMode::Delete,
        false,
    ));

    assert!(report.plans.is_empty());
    assert_eq!(report.summary.files_scanned, 2);
    assert_eq!(report.summary.aliases_skipped, 1);
    assert_eq!(report.summary.bytes_reclaimable, 0);
    assert_eq!(report.summary.bytes_reclaimed, 0);
    assert!(a.exists() && b.exists());
    assert_eq!(report.exit_code(), ExitCode::Success);
}

#[cfg(unix)]
#[test]
fn test_followed_symlink_never_costs_the_target() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("z_target.txt");
    let link = dir.path().join("a_link.txt");
    fs::write(&target, b"payload").unwrap();
    std::os::unix::fs::symlink(&target, &link).unwrap();

    let settings = Settings {
        follow_symlinks: true,
        ..Default::default()
    };
    let report = run(options(dir.path(), settings, ActionMode::Delete, false));

    assert!(report.plans.is_empty());
    assert_eq!(report.summary.aliases_skipped, 1);
    assert_eq!(fs::read(&target).unwrap(), b"payload");
    assert_eq!(fs::read(&link).unwrap(), b"payload");
}
