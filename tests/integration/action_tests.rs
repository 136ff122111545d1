use dupeguard::actions::{AutoDecline, TerminalPrompt};
use dupeguard::config::Settings;
use dupeguard::duplicates::ActionMode;
use dupeguard::error::ExitCode;
use dupeguard::events::NullSink;
use dupeguard::output::{Report, TextOutput};
use dupeguard::pipeline::Pipeline;
use std::fs;
use std::io::{self, Cursor};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn pipeline(root: &Path, settings: Settings, action: ActionMode) -> Pipeline {
    let options = settings.resolve(root, action, false).unwrap();
    Pipeline::new(options).with_events(Arc::new(NullSink))
}

fn prompt(answers: &str) -> Arc<TerminalPrompt> {
    Arc::new(TerminalPrompt::with_io(
        Cursor::new(answers.as_bytes().to_vec()),
        io::sink(),
    ))
}

fn write_copies(dir: &Path, names: &[&str], content: &[u8]) {
    for name in names {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}

fn run(pipeline: &Pipeline) -> Report {
    pipeline.run().unwrap()
}

#[test]
fn test_move_mirrors_relative_layout() {
    let dir = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    write_copies(dir.path(), &["a.txt", "sub/b.txt", "sub/deeper/c.txt"], b"twin");

    let settings = Settings {
        recursive: true,
        ..Default::default()
    };
    let report = run(&pipeline(
        dir.path(),
        settings,
        ActionMode::Move(quarantine.path().to_path_buf()),
    ));

    let q = quarantine.path().canonicalize().unwrap();
    assert!(dir.path().join("a.txt").exists());
    assert!(!dir.path().join("sub/b.txt").exists());
    assert!(!dir.path().join("sub/deeper/c.txt").exists());
    assert_eq!(fs::read(q.join("sub/b.txt")).unwrap(), b"twin");
    assert_eq!(fs::read(q.join("sub/deeper/c.txt")).unwrap(), b"twin");

    let destinations: Vec<_> = report.plans[0]
        .removable
        .iter()
        .map(|r| r.destination.clone().unwrap())
        .collect();
    assert_eq!(
        destinations,
        vec![
            q.join("sub/b.txt").to_string_lossy().into_owned(),
            q.join("sub/deeper/c.txt").to_string_lossy().into_owned(),
        ]
    );
    assert_eq!(report.summary.bytes_reclaimed, 8);
    assert_eq!(report.exit_code(), ExitCode::Success);
}

#[test]
fn test_move_never_overwrites() {
    let dir = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    write_copies(dir.path(), &["a.txt", "b.txt"], b"twin");
    fs::write(quarantine.path().join("b.txt"), b"precious").unwrap();

    let report = run(&pipeline(
        dir.path(),
        Settings::default(),
        ActionMode::Move(quarantine.path().to_path_buf()),
    ));

    let outcome = &report.plans[0].removable[0];
    assert!(!outcome.succeeded);
    assert!(outcome.error.as_deref().unwrap().contains("already exists"));
    assert!(dir.path().join("b.txt").exists());
    assert_eq!(fs::read(quarantine.path().join("b.txt")).unwrap(), b"precious");
    assert_eq!(report.exit_code(), ExitCode::PartialSuccess);
}

#[test]
fn test_declined_batch_changes_nothing() {
    let dir = tempdir().unwrap();
    write_copies(dir.path(), &["a.txt", "b.txt", "c.txt"], b"same");

    let report = run(&pipeline(dir.path(), Settings::default(), ActionMode::Delete)
        .with_decision_provider(Arc::new(AutoDecline)));

    assert!(report.plans[0].removable.iter().all(|r| r.declined));
    assert_eq!(report.summary.bytes_reclaimed, 0);
    assert_eq!(report.summary.action_errors, 0);
    assert_eq!(report.exit_code(), ExitCode::Success);
    for name in ["a.txt", "b.txt", "c.txt"] {
        assert!(dir.path().join(name).exists());
    }
}

#[test]
fn test_prompt_answers_per_file() {
    let dir = tempdir().unwrap();
    write_copies(dir.path(), &["a.txt", "b.txt", "c.txt", "d.txt"], b"same");

    // b: yes, c: skip, d: yes
    let report = run(&pipeline(dir.path(), Settings::default(), ActionMode::Delete)
        .with_decision_provider(prompt("y\nn\nyes\n")));

    let removable = &report.plans[0].removable;
    assert!(removable[0].succeeded);
    assert!(removable[1].declined);
    assert!(removable[2].succeeded);
    assert!(!dir.path().join("b.txt").exists());
    assert!(dir.path().join("c.txt").exists());
    assert!(!dir.path().join("d.txt").exists());
    assert_eq!(report.summary.bytes_reclaimed, 8);
    assert!(!report.interrupted);
}

#[test]
fn test_prompt_quit_stops_run() {
    let dir = tempdir().unwrap();
    write_copies(dir.path(), &["a.txt", "b.txt", "c.txt", "d.txt"], b"same");

    let report = run(&pipeline(dir.path(), Settings::default(), ActionMode::Delete)
        .with_decision_provider(prompt("y\nq\n")));

    let removable = &report.plans[0].removable;
    assert!(removable[0].succeeded);
    for unreached in &removable[1..] {
        assert!(!unreached.succeeded);
        assert!(!unreached.declined);
        assert!(unreached.error.is_none());
    }
    assert!(dir.path().join("c.txt").exists());
    assert!(dir.path().join("d.txt").exists());
    assert!(report.interrupted);
    assert_eq!(report.exit_code(), ExitCode::Interrupted);

    let text = TextOutput::new(&report).render();
    assert!(text.contains("(not processed)"));
}

#[test]
fn test_prompt_end_of_input_stops() {
    let dir = tempdir().unwrap();
    write_copies(dir.path(), &["a.txt", "b.txt"], b"same");

    let report = run(&pipeline(dir.path(), Settings::default(), ActionMode::Delete)
        .with_decision_provider(prompt("")));

    assert!(report.interrupted);
    assert!(dir.path().join("b.txt").exists());
}

#[test]
fn test_report_only_ignores_decisions() {
    let dir = tempdir().unwrap();
    write_copies(dir.path(), &["a.txt", "b.txt"], b"same");

    let report = run(&pipeline(dir.path(), Settings::default(), ActionMode::ReportOnly)
        .with_decision_provider(Arc::new(AutoDecline)));

    assert!(report.plans[0].removable[0].succeeded);
    assert_eq!(report.summary.bytes_reclaimed, 0);
    assert!(dir.path().join("b.txt").exists());
}

#[test]
fn test_keeper_deleted_after_scan_spares_copies() {
    let dir = tempdir().unwrap();
    write_copies(dir.path(), &["a.txt", "b.txt"], b"same");

    let pipeline = pipeline(dir.path(), Settings::default(), ActionMode::Delete);
    let (plans, summary) = pipeline.plan().unwrap();
    assert!(plans[0].keeper.path.ends_with("a.txt"));

    fs::remove_file(dir.path().join("a.txt")).unwrap();
    let report = pipeline.execute(&plans, &summary);

    let removable = &report.plans[0].removable[0];
    assert!(!removable.succeeded);
    assert!(removable.error.as_deref().unwrap().contains("keeper"));
    assert_eq!(fs::read(dir.path().join("b.txt")).unwrap(), b"same");
    assert_eq!(report.summary.bytes_reclaimed, 0);
    assert_eq!(report.exit_code(), ExitCode::PartialSuccess);
}
