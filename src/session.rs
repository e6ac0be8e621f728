use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::api::JobBackend;
use crate::error::{ClientError, Result};
use crate::events::SessionEvent;
use crate::ledger::DisplayLedger;
use crate::poller::{self, PollerHandle, DEFAULT_POLL_INTERVAL};
use crate::resume;
use crate::types::{SessionState, StartOutcome, UploadOutcome};

/// Mutable state of one page session: the authoritative phase, the dedup
/// display ledger, and whether the service holds a usable source roster.
///
/// Constructed once per session and shared between the controller and the
/// poll loop behind a single mutex. Mutations never cross an await, so a
/// tick's ledger writes and renders are atomic with respect to everything
/// else in the session.
#[derive(Debug)]
pub struct SessionContext {
    pub(crate) state: SessionState,
    pub(crate) ledger: DisplayLedger,
    pub(crate) source_uploaded: bool,
}

impl SessionContext {
    pub(crate) fn new() -> Self {
        Self {
            state: SessionState::NoJob,
            ledger: DisplayLedger::new(),
            source_uploaded: false,
        }
    }

    /// Install `next` as the current phase. Returns false when the phase
    /// is already `next`, so callers can skip a duplicate notification.
    pub(crate) fn set_state(&mut self, next: SessionState) -> bool {
        if self.state == next {
            return false;
        }
        self.state = next;
        true
    }
}

/// The job session controller.
///
/// Owns the lifecycle of one server-side generation job: resume-on-load
/// reconciliation, source upload, generate/continue, advisory cancel, and
/// total reset. Progress reaches the embedding application as
/// [`SessionEvent`]s on the channel returned by [`JobSession::new`];
/// the dedup ledger guarantees each result item is delivered exactly once
/// per session lifetime no matter how many sources report it.
///
/// # Example
///
/// ```ignore
/// let (session, mut events) = JobSession::new(CertClient::new("http://127.0.0.1:5000"));
/// session.resume_on_load().await?;
/// tokio::spawn(async move {
///     while let Some(ev) = events.recv().await {
///         println!("{:?}", ev);
///     }
/// });
/// session.generate().await?;
/// ```
pub struct JobSession<B>
where
    B: JobBackend + 'static,
{
    backend: Arc<B>,
    ctx: Arc<Mutex<SessionContext>>,
    events: UnboundedSender<SessionEvent>,
    poller: Mutex<Option<PollerHandle>>,
    poll_interval: Duration,
}

impl<B> JobSession<B>
where
    B: JobBackend + 'static,
{
    /// Create a session around a backend. Returns the session and the
    /// receiving end of its event channel.
    pub fn new(backend: B) -> (Self, UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                backend: Arc::new(backend),
                ctx: Arc::new(Mutex::new(SessionContext::new())),
                events: tx,
                poller: Mutex::new(None),
                poll_interval: DEFAULT_POLL_INTERVAL,
            },
            rx,
        )
    }

    /// Override the progress poll interval (default 500 ms).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The current session phase.
    pub fn state(&self) -> SessionState {
        self.ctx
            .lock()
            .map(|guard| guard.state.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().state.clone())
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn lock_ctx(&self) -> Result<std::sync::MutexGuard<'_, SessionContext>> {
        self.ctx
            .lock()
            .map_err(|e| ClientError::Other(e.to_string()))
    }

    /// Reconstruct the session from the server-side job state.
    ///
    /// Run once at session start, before any user action. Pre-populates
    /// the ledger with every name in the snapshot, renders the snapshot's
    /// results exactly once, installs the reconciled phase, and resumes
    /// polling immediately when the job is still generating.
    pub async fn resume_on_load(&self) -> Result<SessionState> {
        let snapshot = self.backend.status().await?;
        let state = resume::reconcile(&snapshot);

        {
            let mut guard = self.lock_ctx()?;
            guard.ledger.reset();
            // Ledger first, render second: anything that arrives later can
            // only append.
            for item in &snapshot.results {
                guard.ledger.mark_displayed(&item.name);
            }
            guard.source_uploaded = snapshot.has_source_file;
            for item in &snapshot.results {
                self.emit(SessionEvent::ItemRendered { item: item.clone() });
            }
            if guard.set_state(state.clone()) {
                self.emit(SessionEvent::StateChanged {
                    state: guard.state.clone(),
                });
            }
        }

        if state.is_running() {
            self.start_poller();
        }
        Ok(state)
    }

    /// Upload a source roster for the next run.
    ///
    /// A roster matching the active job keeps its resumable progress; a
    /// new roster moves the session to `ReadyToStart` without touching
    /// what is already rendered.
    pub async fn upload_source(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadOutcome> {
        let outcome = self.backend.upload_source(file_name, bytes).await?;

        let mut guard = self.lock_ctx()?;
        guard.source_uploaded = true;
        let next = if outcome.is_new_source {
            SessionState::ReadyToStart
        } else {
            match guard.state.clone() {
                SessionState::ReadyToResume { processed, .. } => SessionState::ReadyToResume {
                    processed,
                    source_available: true,
                },
                running @ SessionState::Running { .. } => running,
                _ => SessionState::ReadyToStart,
            }
        };
        if guard.set_state(next) {
            self.emit(SessionEvent::StateChanged {
                state: guard.state.clone(),
            });
        }
        Ok(outcome)
    }

    /// Start or continue generation.
    ///
    /// Rejects without a network call when there is nothing to generate
    /// from. Otherwise: snapshots current progress to pre-populate the
    /// ledger (already-generated items must not re-render as new), issues
    /// the start request, polls concurrently while it runs, and when the
    /// run stops reconciles any results the polling missed before
    /// settling on `Completed` or `ReadyToResume`.
    ///
    /// Dropping the returned future cancels the in-flight start request,
    /// so abandoning the session mid-run does not leak it.
    pub async fn generate(&self) -> Result<StartOutcome> {
        {
            let guard = self.lock_ctx()?;
            if guard.state.is_running() {
                return Err(ClientError::Precondition(
                    "A generation job is already running".into(),
                ));
            }
            if !guard.source_uploaded {
                return Err(ClientError::Precondition(
                    "Upload a source roster first; there is no resumable job".into(),
                ));
            }
        }

        let initial = self.backend.status().await?;

        {
            let mut guard = self.lock_ctx()?;
            for item in &initial.results {
                guard.ledger.mark_displayed(&item.name);
            }
            let processed = if initial.has_progress {
                initial.processed_count
            } else {
                0
            };
            if guard.set_state(SessionState::Running { processed }) {
                self.emit(SessionEvent::StateChanged {
                    state: guard.state.clone(),
                });
            }
        }

        self.start_poller();

        let outcome = match self.backend.start_job().await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.stop_poller();
                let mut guard = self.lock_ctx()?;
                if guard.set_state(SessionState::Error {
                    message: e.to_string(),
                }) {
                    self.emit(SessionEvent::StateChanged {
                        state: guard.state.clone(),
                    });
                }
                return Err(e);
            }
        };

        self.stop_poller();

        {
            let mut guard = self.lock_ctx()?;
            // The job can finish between the last poll tick and this
            // response; whatever polling missed is rendered here.
            for item in &outcome.results {
                if !guard.ledger.has_displayed(&item.name) {
                    guard.ledger.mark_displayed(&item.name);
                    self.emit(SessionEvent::ItemRendered { item: item.clone() });
                }
            }
            let next = if outcome.completed {
                SessionState::Completed
            } else {
                SessionState::ReadyToResume {
                    processed: outcome.results.len(),
                    source_available: true,
                }
            };
            if guard.set_state(next) {
                self.emit(SessionEvent::StateChanged {
                    state: guard.state.clone(),
                });
            }
        }

        Ok(outcome)
    }

    /// Ask the service to stop the running job.
    ///
    /// Advisory only: polling keeps running either way, and the session
    /// settles when a tick reports the job stopped.
    pub async fn cancel(&self) -> Result<()> {
        {
            let guard = self.lock_ctx()?;
            if !guard.state.is_running() {
                return Err(ClientError::Precondition("No running job to cancel".into()));
            }
        }
        self.backend.cancel_job().await
    }

    /// Discard the job and everything rendered for it.
    ///
    /// Destructive; callers are expected to confirm with the user first.
    /// Rejected while a job is running.
    pub async fn reset(&self) -> Result<()> {
        {
            let guard = self.lock_ctx()?;
            if guard.state.is_running() {
                return Err(ClientError::Precondition(
                    "Cannot reset while a job is running".into(),
                ));
            }
        }

        self.backend.reset_job().await?;

        let mut guard = self.lock_ctx()?;
        guard.ledger.reset();
        guard.source_uploaded = false;
        if guard.set_state(SessionState::NoJob) {
            self.emit(SessionEvent::StateChanged {
                state: guard.state.clone(),
            });
        }
        Ok(())
    }

    /// Stop background polling. Equivalent to what dropping the session
    /// does; provided for explicit page-unload handling.
    pub fn shutdown(&self) {
        self.stop_poller();
    }

    fn start_poller(&self) {
        let Ok(mut slot) = self.poller.lock() else {
            return;
        };
        if let Some(handle) = slot.as_ref() {
            if !handle.is_finished() {
                return;
            }
        }
        *slot = Some(poller::spawn(
            Arc::clone(&self.backend),
            Arc::clone(&self.ctx),
            self.events.clone(),
            self.poll_interval,
        ));
    }

    fn stop_poller(&self) {
        if let Ok(mut slot) = self.poller.lock() {
            if let Some(handle) = slot.take() {
                handle.stop();
            }
        }
    }
}

impl<B> Drop for JobSession<B>
where
    B: JobBackend + 'static,
{
    fn drop(&mut self) {
        self.stop_poller();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{JobSnapshot, PreviewImage, RenderSettings};

    #[test]
    fn test_set_state_reports_changes() {
        let mut ctx = SessionContext::new();
        assert!(!ctx.set_state(SessionState::NoJob));
        assert!(ctx.set_state(SessionState::ReadyToStart));
        assert!(!ctx.set_state(SessionState::ReadyToStart));
        assert!(ctx.set_state(SessionState::Running { processed: 0 }));
    }

    /// Backend that fails every call; proves precondition gates fire
    /// before any request is issued.
    struct UnreachableBackend;

    impl JobBackend for UnreachableBackend {
        async fn upload_source(&self, _: &str, _: Vec<u8>) -> Result<UploadOutcome> {
            panic!("backend was contacted");
        }
        async fn status(&self) -> Result<JobSnapshot> {
            panic!("backend was contacted");
        }
        async fn start_job(&self) -> Result<StartOutcome> {
            panic!("backend was contacted");
        }
        async fn cancel_job(&self) -> Result<()> {
            panic!("backend was contacted");
        }
        async fn reset_job(&self) -> Result<()> {
            panic!("backend was contacted");
        }
        async fn render_preview(&self, _: RenderSettings, _: String) -> Result<PreviewImage> {
            panic!("backend was contacted");
        }
    }

    #[tokio::test]
    async fn test_generate_gate_without_source() {
        let (session, _events) = JobSession::new(UnreachableBackend);
        let err = session.generate().await.unwrap_err();
        assert!(matches!(err, ClientError::Precondition(_)));
        assert_eq!(session.state(), SessionState::NoJob);
    }

    #[tokio::test]
    async fn test_cancel_gate_outside_running() {
        let (session, _events) = JobSession::new(UnreachableBackend);
        let err = session.cancel().await.unwrap_err();
        assert!(matches!(err, ClientError::Precondition(_)));
    }

    #[tokio::test]
    async fn test_new_session_starts_at_no_job() {
        let (session, _events) = JobSession::new(UnreachableBackend);
        assert_eq!(session.state(), SessionState::NoJob);
    }
}
