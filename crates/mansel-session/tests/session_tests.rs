//! End-to-end tests for the selection session.

use std::fs;

use mansel_core::{SelectConfig, SelectionTree};
use mansel_scan::Generation;
use mansel_session::{ComputationPhase, Coordinator, CoordinatorState, StatusEvent};
use tempfile::TempDir;

/// Root with `a/x` (10 bytes), `a/y` (20 bytes) and `b` (5 bytes).
fn create_test_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    fs::create_dir(root.join("a")).unwrap();
    fs::write(root.join("a/x"), vec![0u8; 10]).unwrap();
    fs::write(root.join("a/y"), vec![0u8; 20]).unwrap();
    fs::write(root.join("b"), vec![0u8; 5]).unwrap();

    temp
}

fn start_with(temp: &TempDir, preselection: &[&str]) -> Coordinator {
    let mut tree = SelectionTree::open(SelectConfig::new(temp.path())).unwrap();
    let report = tree.preselect(preselection);
    assert!(report.is_clean());
    Coordinator::start(tree)
}

fn settled_total(state: &CoordinatorState) -> u64 {
    match state {
        CoordinatorState::Settled { total, .. } => *total,
        other => panic!("not settled: {other:?}"),
    }
}

#[tokio::test]
async fn test_preselected_directory_total() {
    let temp = create_test_tree();
    let mut coordinator = start_with(&temp, &["a"]);

    assert_eq!(coordinator.selection_set().to_strings(), vec!["a"]);
    let state = coordinator.settle().await.clone();
    assert_eq!(settled_total(&state), 30);
    assert_eq!(
        state,
        CoordinatorState::Settled {
            generation: Generation(0),
            total: 30,
            skipped: 0,
        }
    );
    let display = coordinator.display_total();
    assert!(!display.calculating);
    assert_eq!(display.bytes, 30);
}

#[tokio::test]
async fn test_checking_sibling_updates_total() {
    let temp = create_test_tree();
    let mut coordinator = start_with(&temp, &["a"]);
    coordinator.settle().await;

    let b = coordinator.tree().find("b").unwrap();
    coordinator.set_checked(b, true).unwrap();
    assert_eq!(coordinator.generation(), Generation(1));
    assert!(coordinator.display_total().calculating);
    assert_eq!(coordinator.selection_set().to_strings(), vec!["a", "b"]);

    assert_eq!(settled_total(coordinator.settle().await), 35);
}

#[tokio::test]
async fn test_unchecking_before_completion_settles_to_zero() {
    let temp = create_test_tree();
    let mut coordinator = start_with(&temp, &[]);
    coordinator.settle().await;

    let root = coordinator.tree().root();
    coordinator.expand(root).unwrap();
    let a = coordinator.tree().find("a").unwrap();

    coordinator.set_checked(a, true).unwrap();
    let checked_generation = coordinator.generation();
    coordinator.set_checked(a, false).unwrap();

    assert!(coordinator.in_flight().contains(&(checked_generation, ComputationPhase::Stale)));

    assert_eq!(settled_total(coordinator.settle().await), 0);
    assert_eq!(coordinator.generation(), Generation(2));

    // The superseded computation drains without touching the result.
    coordinator.drain().await;
    assert!(coordinator.in_flight().is_empty());
    assert_eq!(
        coordinator.state(),
        &CoordinatorState::Settled {
            generation: Generation(2),
            total: 0,
            skipped: 0,
        }
    );
}

#[tokio::test]
async fn test_unchanged_selection_does_not_restart() {
    let temp = create_test_tree();
    let mut coordinator = start_with(&temp, &["a"]);
    coordinator.settle().await;

    let a = coordinator.tree().find("a").unwrap();
    coordinator.set_checked(a, true).unwrap();
    assert_eq!(coordinator.generation(), Generation(0));
    assert!(coordinator.state().is_settled());
}

#[tokio::test]
async fn test_settled_total_follows_last_mutation() {
    let temp = create_test_tree();
    let mut coordinator = start_with(&temp, &[]);

    let root = coordinator.tree().root();
    coordinator.expand(root).unwrap();
    let a = coordinator.tree().find("a").unwrap();
    let b = coordinator.tree().find("b").unwrap();

    for _ in 0..10 {
        coordinator.toggle(a).unwrap();
        coordinator.toggle(b).unwrap();
    }
    coordinator.toggle(b).unwrap();

    // Ten full cycles leave both unchecked; the last toggle checks `b`.
    assert_eq!(coordinator.selection_set().to_strings(), vec!["b"]);
    assert_eq!(settled_total(coordinator.settle().await), 5);
    assert_eq!(coordinator.generation(), Generation(41));

    coordinator.drain().await;
    assert_eq!(settled_total(coordinator.state()), 5);
}

#[tokio::test]
async fn test_deleted_selection_is_unavailable() {
    let temp = create_test_tree();
    let mut coordinator = start_with(&temp, &["b"]);
    assert_eq!(settled_total(coordinator.settle().await), 5);

    let a = coordinator.tree().find("a").unwrap();
    fs::remove_dir_all(temp.path().join("a")).unwrap();
    coordinator.set_checked(a, true).unwrap();

    match coordinator.settle().await {
        CoordinatorState::Unavailable {
            generation,
            stale_total,
            ..
        } => {
            assert_eq!(*generation, Generation(1));
            assert_eq!(*stale_total, Some(5));
        }
        other => panic!("unexpected state: {other:?}"),
    }

    // The failed generation never finishes, so the stale total is final.
    coordinator.drain().await;
    let display = coordinator.display_total();
    assert!(display.unavailable);
    assert!(!display.calculating);
    assert_eq!(display.bytes, 5);

    // A later successful generation clears the flag.
    coordinator.set_checked(a, false).unwrap();
    assert!(!coordinator.display_total().unavailable);
    assert_eq!(settled_total(coordinator.settle().await), 5);
    assert!(!coordinator.display_total().unavailable);
}

#[tokio::test]
async fn test_expanding_checked_root_lists_children() {
    let temp = create_test_tree();
    fs::write(temp.path().join(".secret"), vec![0u8; 100]).unwrap();
    let config = SelectConfig::builder()
        .root(temp.path())
        .include_hidden(false)
        .build()
        .unwrap();
    let mut tree = SelectionTree::open(config).unwrap();
    assert!(tree.preselect(["."]).is_clean());

    let mut coordinator = Coordinator::start(tree);
    assert_eq!(coordinator.selection_set().to_strings(), vec!["."]);

    let root = coordinator.tree().root();
    coordinator.expand(root).unwrap();
    assert_eq!(coordinator.selection_set().to_strings(), vec!["a", "b"]);
    assert_eq!(coordinator.selection_set(), &coordinator.tree().selection_set());
    assert_eq!(coordinator.generation(), Generation(0));
    assert_eq!(settled_total(coordinator.settle().await), 35);
}

#[tokio::test]
async fn test_settled_directories_are_cached() {
    let temp = create_test_tree();
    let mut coordinator = start_with(&temp, &["a"]);
    assert_eq!(settled_total(coordinator.settle().await), 30);
    assert_eq!(coordinator.size_cache().get("a").map(|s| s.bytes), Some(30));

    let b = coordinator.tree().find("b").unwrap();
    coordinator.toggle(b).unwrap();
    assert_eq!(settled_total(coordinator.settle().await), 35);

    // Unchecking `a` and checking it again is answered from the cache.
    let a = coordinator.tree().find("a").unwrap();
    coordinator.toggle(a).unwrap();
    coordinator.toggle(a).unwrap();
    assert_eq!(settled_total(coordinator.settle().await), 35);
    assert_eq!(coordinator.size_cache().get("a").map(|s| s.files), Some(2));
}

#[tokio::test]
async fn test_status_events() {
    let temp = create_test_tree();
    let mut coordinator = start_with(&temp, &["a"]);
    let mut status = coordinator.subscribe();
    coordinator.settle().await;

    let mut saw_final = false;
    while let Ok(event) = status.try_recv() {
        if let StatusEvent::TotalUpdated {
            generation,
            bytes,
            is_final: true,
        } = event
        {
            assert_eq!(generation, Generation(0));
            assert_eq!(bytes, 30);
            saw_final = true;
        }
    }
    assert!(saw_final);

    let b = coordinator.tree().find("b").unwrap();
    coordinator.toggle(b).unwrap();
    assert_eq!(status.try_recv().unwrap(), StatusEvent::CheckStateChanged(b));
}

#[tokio::test]
async fn test_close_ignores_late_results() {
    let temp = create_test_tree();
    let mut coordinator = start_with(&temp, &["a"]);

    coordinator.close();
    assert!(coordinator.is_closed());
    assert!(
        coordinator
            .in_flight()
            .iter()
            .all(|(_, phase)| *phase == ComputationPhase::Stale)
    );

    coordinator.drain().await;
    assert_eq!(coordinator.state(), &CoordinatorState::Closed);

    // Mutations after close do not start new work.
    let b = coordinator.tree().find("b").unwrap();
    coordinator.set_checked(b, true).unwrap();
    assert_eq!(coordinator.generation(), Generation(0));
    assert!(coordinator.in_flight().is_empty());
}
