use std::cell::Cell;
use std::fs::{self, File, OpenOptions};
use std::path::Path;

use fs2::FileExt;
use shimguard_core::backup;
use shimguard_core::gate::{self, GateDecision, LockPrompt, PromptChoice};
use shimguard_core::install::{self, BatchOutcome, DirectoryPayload, Progress};
use shimguard_core::instance::InstanceGuard;
use shimguard_core::selection::TargetSelection;
use shimguard_core::session::SessionContext;
use shimguard_core::supervisor::{FaultChoice, SessionFault, Supervisor};
use shimguard_core::Error;
use tempfile::tempdir;

/// Stand-in for a running game holding its shim library open.
fn hold(path: &Path) -> File {
    let file = OpenOptions::new().read(true).write(true).open(path).unwrap();
    file.lock_exclusive().unwrap();
    file
}

#[test]
fn running_game_blocks_until_closed() {
    let dir = tempdir().unwrap();
    let exe = dir.path().join("game.exe");
    let dll = dir.path().join("steam_api.dll");
    fs::write(&exe, b"exe").unwrap();
    fs::write(&dll, b"dll").unwrap();
    let selection = TargetSelection::new("Portal", [exe, dll.clone()]);

    let mut game = Some(hold(&dll));
    assert!(selection.files_currently_locked());

    let mut prompts = Vec::new();
    let decision = gate::confirm_target_closed(&selection, &mut |p: &LockPrompt| {
        prompts.push(p.message.clone());
        // The user closes the game, then presses Retry
        game.take();
        PromptChoice::Retry
    });

    assert_eq!(decision, GateDecision::Proceed);
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Portal"));
    assert!(!selection.files_currently_locked());
}

#[test]
fn running_game_aborts_install_without_changes() {
    let dir = tempdir().unwrap();
    let payload_dir = tempdir().unwrap();
    let dll = dir.path().join("steam_api.dll");
    fs::write(&dll, b"original").unwrap();
    fs::write(payload_dir.path().join("steam_api.dll"), b"shim").unwrap();
    let selection = TargetSelection::new("Portal", [dll.clone()]);
    let _game = hold(&dll);

    let ctx = SessionContext::new();
    let outcome = install::install(
        &ctx,
        &selection,
        &DirectoryPayload::new(payload_dir.path()),
        &mut |_: &LockPrompt| PromptChoice::Cancel,
        None::<fn(Progress)>,
    )
    .unwrap();

    assert_eq!(outcome, BatchOutcome::Aborted);
    assert!(!backup::has_backup(&dll));
}

#[test]
fn crash_after_backup_is_recoverable_on_next_run() {
    let dir = tempdir().unwrap();
    let dll = dir.path().join("a.dll");
    fs::write(&dll, b"pre-mutation").unwrap();

    // First run: backup succeeds, then the process dies mid-mutation
    backup::backup(&dll).unwrap();
    fs::write(&dll, b"half-wri").unwrap();

    // Next run
    assert!(backup::has_backup(&dll));
    assert_eq!(backup::find_backups(dir.path()).unwrap(), vec![dll.clone()]);
    backup::restore(&dll).unwrap();

    assert_eq!(fs::read(&dll).unwrap(), b"pre-mutation");
    assert!(!backup::has_backup(&dll));
}

#[test]
fn instance_lock_is_exclusive_until_released() {
    let dir = tempdir().unwrap();

    let first = InstanceGuard::acquire_in(dir.path()).unwrap();
    assert!(matches!(
        InstanceGuard::acquire_in(dir.path()),
        Err(Error::SecondInstance)
    ));
    drop(first);

    let again = InstanceGuard::acquire_in(dir.path());
    assert!(again.is_ok());
}

#[test]
fn supervised_install_retries_after_state_error() {
    let dir = tempdir().unwrap();
    let dll = dir.path().join("steam_api.dll");
    fs::write(&dll, b"original").unwrap();

    let ctx = SessionContext::new();
    let mut supervisor = Supervisor::new(ctx.clone());
    let attempts = Cell::new(0);

    let outcome = supervisor.run(
        |_ctx| {
            attempts.set(attempts.get() + 1);
            // A restore without a backup is a sequencing bug, not a silent no-op
            backup::restore(&dll)?;
            Ok(())
        },
        &mut |fault: &SessionFault| {
            assert!(matches!(fault, SessionFault::Core(Error::NoBackupFound { .. })));
            if attempts.get() == 1 {
                // Fix the state before retrying
                backup::backup(&dll).unwrap();
                FaultChoice::Retry
            } else {
                FaultChoice::Accept
            }
        },
    );

    assert!(outcome.completed);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(fs::read(&dll).unwrap(), b"original");
    assert!(ctx.is_cleaned_up());
}
