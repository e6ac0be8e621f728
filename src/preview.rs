use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::api::JobBackend;
use crate::events::PreviewUpdate;
use crate::types::{Bounds, PositionState, RenderSettings};

/// Quiet period before a settings change commits to a preview request.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

/// Drag-based editor for the normalized text position.
///
/// Position updates are synchronous and local so dragging feels
/// immediate; nothing here talks to the network. When a drag ends the
/// caller commits the result through [`PreviewDebouncer::trigger`].
#[derive(Debug, Default)]
pub struct CoordinateEditor {
    position: PositionState,
    dragging: bool,
}

impl CoordinateEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current committed or in-drag position.
    pub fn position(&self) -> PositionState {
        self.position
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Mark a drag gesture as active.
    pub fn begin(&mut self) {
        self.dragging = true;
    }

    /// Move the pointer. Converts to a fraction of `bounds` and clamps
    /// into `[0.05, 0.95]` on both axes. Returns the new position, or
    /// `None` when no drag is active or the bounds are degenerate.
    pub fn move_to(
        &mut self,
        pointer_x: f64,
        pointer_y: f64,
        bounds: Bounds,
    ) -> Option<PositionState> {
        if !self.dragging {
            return None;
        }
        if !(bounds.width > 0.0 && bounds.height > 0.0) {
            return None;
        }
        let fx = (pointer_x - bounds.x) / bounds.width;
        let fy = (pointer_y - bounds.y) / bounds.height;
        self.position = PositionState::clamped(fx, fy);
        Some(self.position)
    }

    /// End the gesture. Returns true when a drag was active, in which
    /// case the caller should enqueue exactly one debounced commit.
    pub fn end(&mut self) -> bool {
        let was_dragging = self.dragging;
        self.dragging = false;
        was_dragging
    }
}

/// Rate-limits preview regeneration behind a single shared timer.
///
/// Every settings change (slider, color, font, drag end) restarts the
/// window; only the last change within it issues a request. Requests are
/// not queued: a newer commit may race an in-flight one, and each
/// response carries its trigger's sequence number so a response older
/// than the last applied one is dropped instead of flickering backwards.
pub struct PreviewDebouncer<B>
where
    B: JobBackend + 'static,
{
    backend: Arc<B>,
    window: Duration,
    generation: Arc<AtomicU64>,
    applied: Arc<AtomicU64>,
    updates: UnboundedSender<PreviewUpdate>,
}

impl<B> PreviewDebouncer<B>
where
    B: JobBackend + 'static,
{
    /// Create a debouncer around a backend. Returns the debouncer and the
    /// receiving end of its update channel.
    pub fn new(backend: B) -> (Self, UnboundedReceiver<PreviewUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                backend: Arc::new(backend),
                window: DEFAULT_DEBOUNCE_WINDOW,
                generation: Arc::new(AtomicU64::new(0)),
                applied: Arc::new(AtomicU64::new(0)),
                updates: tx,
            },
            rx,
        )
    }

    /// Override the debounce window (default 300 ms).
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Record a settings change and restart the shared timer.
    ///
    /// If no newer change arrives within the window, a preview request is
    /// issued with exactly these values.
    pub fn trigger(&self, settings: RenderSettings, sample_name: impl Into<String>) {
        let seq = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let backend = Arc::clone(&self.backend);
        let generation = Arc::clone(&self.generation);
        let applied = Arc::clone(&self.applied);
        let updates = self.updates.clone();
        let window = self.window;
        let sample = sample_name.into();

        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            // A newer change restarted the window; this one never fires.
            if generation.load(Ordering::SeqCst) != seq {
                return;
            }

            let result = backend.render_preview(settings, sample).await;

            // Monotonic apply guard: a response that lost the race to a
            // newer one is dropped.
            if applied.fetch_max(seq, Ordering::SeqCst) > seq {
                return;
            }

            let _ = updates.send(match result {
                Ok(image) => PreviewUpdate::Ready { image },
                Err(e) => PreviewUpdate::Failed {
                    message: e.to_string(),
                },
            });
        });
    }
}
