use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::api::JobBackend;
use crate::events::SessionEvent;
use crate::resume;
use crate::session::SessionContext;
use crate::types::{JobSnapshot, SessionState};

/// How often the running job is polled for new results.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Handle to a spawned progress poll loop.
///
/// The loop terminates on its own when a tick reports the job is no longer
/// generating; `stop()` ends it early. Stopping is cooperative: an
/// in-flight status request is allowed to complete, but its snapshot is
/// discarded.
#[derive(Debug)]
pub struct PollerHandle {
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Request the loop to stop before its next tick.
    pub fn stop(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether the loop has fully exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn the poll loop as a background tokio task.
pub(crate) fn spawn<B>(
    backend: Arc<B>,
    ctx: Arc<Mutex<SessionContext>>,
    events: UnboundedSender<SessionEvent>,
    interval: Duration,
) -> PollerHandle
where
    B: JobBackend + 'static,
{
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);
    let task = tokio::spawn(async move {
        run_loop(backend, ctx, events, interval, flag).await;
    });
    PollerHandle { cancelled, task }
}

async fn run_loop<B>(
    backend: Arc<B>,
    ctx: Arc<Mutex<SessionContext>>,
    events: UnboundedSender<SessionEvent>,
    interval: Duration,
    cancelled: Arc<AtomicBool>,
) where
    B: JobBackend,
{
    loop {
        tokio::time::sleep(interval).await;

        // Checked before issuing the call and again before applying its
        // result, so a stop() during the request discards the snapshot.
        if cancelled.load(Ordering::Relaxed) {
            return;
        }

        let snapshot = match backend.status().await {
            Ok(s) => s,
            Err(e) => {
                // A single failed tick is transient; wait for the next one.
                eprintln!("[certgen-client] Progress poll failed: {}", e);
                continue;
            }
        };

        if cancelled.load(Ordering::Relaxed) {
            return;
        }

        if apply_tick(&ctx, &events, &snapshot) {
            return;
        }
    }
}

/// Apply one snapshot to the session context. Returns true on a terminal
/// tick (the job stopped generating), after installing the terminal state.
///
/// Items are marked in the ledger and emitted strictly in response order,
/// all under one context lock, so a re-delivery of the same snapshot can
/// never render an item twice.
pub(crate) fn apply_tick(
    ctx: &Mutex<SessionContext>,
    events: &UnboundedSender<SessionEvent>,
    snapshot: &JobSnapshot,
) -> bool {
    let Ok(mut guard) = ctx.lock() else {
        eprintln!("[certgen-client] Session context mutex poisoned, stopping poll loop");
        return true;
    };

    let mut newly: usize = 0;
    for item in &snapshot.results {
        if !guard.ledger.has_displayed(&item.name) {
            guard.ledger.mark_displayed(&item.name);
            let _ = events.send(SessionEvent::ItemRendered { item: item.clone() });
            newly += 1;
        }
    }

    if newly > 0 {
        if let SessionState::Running { processed } = guard.state {
            guard.set_state(SessionState::Running {
                processed: processed + newly,
            });
            let _ = events.send(SessionEvent::StateChanged {
                state: guard.state.clone(),
            });
        }
    }

    if !snapshot.is_generating {
        let terminal = resume::reconcile(snapshot);
        if guard.set_state(terminal) {
            let _ = events.send(SessionEvent::StateChanged {
                state: guard.state.clone(),
            });
        }
        return true;
    }

    false
}
