
use std::time::Duration;

use certgen_client::{
    ClientError, JobSession, SessionEvent, SessionState, StartOutcome, UploadOutcome,
};
use test_helpers::*;
use tokio::sync::mpsc::UnboundedReceiver;

fn drain(events: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(ev) = events.try_recv() {
        out.push(ev);
    }
    out
}

fn rendered_names(events: &[SessionEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|ev| match ev {
            SessionEvent::ItemRendered { item } => Some(item.name.clone()),
            _ => None,
        })
        .collect()
}

/// Let tasks woken by an `advance` run to their next await point.
async fn settle() {
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_item_renders_at_most_once_across_sources() {
    let backend = FakeBackend::new();
    // Alice arrives through every source: the resume snapshot, the
    // pre-generate snapshot, a poll tick, and the final response.
    backend.push_status(resumable_snapshot(vec![ok_item("Alice")]));
    backend.push_status(resumable_snapshot(vec![ok_item("Alice")]));
    backend.push_status(generating_snapshot(vec![ok_item("Alice"), ok_item("Bob")]));
    backend.set_start(
        StartOutcome {
            completed: true,
            results: vec![ok_item("Alice"), ok_item("Bob"), ok_item("Carol")],
            new_results: vec![ok_item("Bob"), ok_item("Carol")],
        },
        Duration::from_millis(800),
    );

    let (session, mut events) = JobSession::new(backend.clone());
    session.resume_on_load().await.unwrap();

    let outcome = session.generate().await.unwrap();
    assert!(outcome.completed);

    let all = drain(&mut events);
    // Each name exactly once, in the order its source first introduced it.
    // Carol was missed by polling and reconciled from the final response.
    assert_eq!(rendered_names(&all), ["Alice", "Bob", "Carol"]);
    assert_eq!(session.state(), SessionState::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_resume_fidelity() {
    let backend = FakeBackend::new();
    backend.push_status(generating_snapshot(vec![
        ok_item("Alice"),
        ok_item("Bob"),
        ok_item("Carol"),
    ]));

    let (session, mut events) = JobSession::new(backend.clone());
    let state = session.resume_on_load().await.unwrap();

    // Running(3) and the full ledger before any poll tick is processed.
    assert_eq!(state, SessionState::Running { processed: 3 });
    assert_eq!(rendered_names(&drain(&mut events)), ["Alice", "Bob", "Carol"]);

    // Let the freshly spawned poller register its first interval sleep before
    // the clock advances, so the tick actually fires under paused time.
    settle().await;
    // The first tick replays the same snapshot; nothing renders twice.
    tokio::time::advance(Duration::from_millis(600)).await;
    settle().await;
    assert!(rendered_names(&drain(&mut events)).is_empty());
    assert!(backend.status_calls() >= 2);

    session.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_settles_on_ready_to_resume() {
    let backend = FakeBackend::new();
    backend.push_status(generating_snapshot(vec![ok_item("Alice")]));

    let (session, _events) = JobSession::new(backend.clone());
    session.resume_on_load().await.unwrap();
    assert!(session.state().is_running());

    session.cancel().await.unwrap();
    assert_eq!(backend.cancel_calls(), 1);

    // Cancellation is advisory: the session stays Running until a tick
    // reports the job stopped, and a stopped-but-unfinished job settles
    // on ReadyToResume, never Completed.
    backend.push_status(resumable_snapshot(vec![ok_item("Alice")]));
    // Prime the poller's first interval sleep before advancing the clock.
    settle().await;
    tokio::time::advance(Duration::from_millis(500)).await;
    settle().await;
    assert_eq!(
        session.state(),
        SessionState::ReadyToResume {
            processed: 1,
            source_available: true,
        }
    );

    // The poller terminated itself on the terminal tick.
    let calls = backend.status_calls();
    tokio::time::advance(Duration::from_millis(1500)).await;
    settle().await;
    assert_eq!(backend.status_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_reset_is_total() {
    let backend = FakeBackend::new();
    backend.push_status(completed_snapshot(vec![ok_item("Alice"), ok_item("Bob")]));

    let (session, mut events) = JobSession::new(backend.clone());
    session.resume_on_load().await.unwrap();
    assert_eq!(session.state(), SessionState::Completed);
    assert_eq!(rendered_names(&drain(&mut events)).len(), 2);

    session.reset().await.unwrap();
    assert_eq!(backend.reset_calls(), 1);
    assert_eq!(session.state(), SessionState::NoJob);

    // A subsequent no-progress snapshot keeps the session at NoJob and
    // renders nothing.
    backend.push_status(empty_snapshot());
    let state = session.resume_on_load().await.unwrap();
    assert_eq!(state, SessionState::NoJob);
    assert!(rendered_names(&drain(&mut events)).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_precondition_gate_issues_no_network_calls() {
    let backend = FakeBackend::new();
    let (session, _events) = JobSession::new(backend.clone());

    let err = session.generate().await.unwrap_err();
    assert!(matches!(err, ClientError::Precondition(_)));
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reset_rejected_while_running() {
    let backend = FakeBackend::new();
    backend.push_status(generating_snapshot(vec![]));

    let (session, _events) = JobSession::new(backend.clone());
    session.resume_on_load().await.unwrap();
    assert!(session.state().is_running());

    let err = session.reset().await.unwrap_err();
    assert!(matches!(err, ClientError::Precondition(_)));
    assert_eq!(backend.reset_calls(), 0);

    session.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_transient_poll_failure_does_not_stop_polling() {
    let backend = FakeBackend::new();
    backend.push_status(generating_snapshot(vec![]));
    backend.push_status_failure();
    backend.push_status(generating_snapshot(vec![ok_item("Alice")]));
    backend.push_status(completed_snapshot(vec![ok_item("Alice")]));

    let (session, mut events) = JobSession::new(backend.clone());
    session.resume_on_load().await.unwrap();

    // Prime the poller's first interval sleep before advancing the clock.
    settle().await;
    for _ in 0..3 {
        tokio::time::advance(Duration::from_millis(500)).await;
        settle().await;
    }

    // The failed tick was skipped, the next one delivered Alice, and the
    // terminal tick completed the session.
    assert_eq!(rendered_names(&drain(&mut events)), ["Alice"]);
    assert_eq!(session.state(), SessionState::Completed);
    assert_eq!(backend.status_calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_generate_failure_transitions_to_error_and_retries() {
    let backend = FakeBackend::new();
    let (session, mut events) = JobSession::new(backend.clone());

    session
        .upload_source("names.csv", b"name\nAlice\n".to_vec())
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::ReadyToStart);

    // No start outcome scripted: the run fails and the session surfaces it.
    let err = session.generate().await.unwrap_err();
    assert!(matches!(err, ClientError::Job(_)));
    assert_eq!(
        session.state(),
        SessionState::Error {
            message: "generation failed".to_string(),
        }
    );

    // Manual retry succeeds from the error state.
    backend.set_start(
        StartOutcome {
            completed: true,
            results: vec![ok_item("Alice")],
            new_results: vec![ok_item("Alice")],
        },
        Duration::ZERO,
    );
    session.generate().await.unwrap();
    assert_eq!(session.state(), SessionState::Completed);
    assert_eq!(rendered_names(&drain(&mut events)), ["Alice"]);
}

#[tokio::test(start_paused = true)]
async fn test_upload_transitions() {
    let backend = FakeBackend::new();
    backend.push_status(resumable_snapshot(vec![ok_item("Alice"), ok_item("Bob")]));

    let (session, _events) = JobSession::new(backend.clone());
    session.resume_on_load().await.unwrap();

    // Re-uploading the matching roster keeps the resumable progress.
    session
        .upload_source("names.csv", b"name\nAlice\nBob\nCarol\n".to_vec())
        .await
        .unwrap();
    assert_eq!(
        session.state(),
        SessionState::ReadyToResume {
            processed: 2,
            source_available: true,
        }
    );

    // A different roster means a fresh start.
    backend.set_upload(UploadOutcome {
        is_new_source: true,
        previous_progress_count: 2,
        message: "New roster uploaded".to_string(),
    });
    session
        .upload_source("other.csv", b"name\nDave\n".to_vec())
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::ReadyToStart);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_polling() {
    let backend = FakeBackend::new();
    backend.push_status(generating_snapshot(vec![]));

    let (session, _events) = JobSession::new(backend.clone());
    session.resume_on_load().await.unwrap();
    assert_eq!(backend.status_calls(), 1);

    session.shutdown();
    tokio::time::advance(Duration::from_millis(2000)).await;
    settle().await;
    assert_eq!(backend.status_calls(), 1);
}
