//! # certgen-client
//!
//! Async Rust client for a remote certificate generation service: tracks a
//! long-running, resumable batch job across restarts and network
//! interruptions, polls it for incremental progress, renders each result
//! exactly once, and drives a debounced live-preview editor.
//!
//! The heavy lifting (CSV parsing, image rendering, storage) happens on
//! the service; this crate owns the client-side coordination:
//!
//! - [`DisplayLedger`] gates rendering so overlapping progress sources
//!   (resume snapshot, poll ticks, final response) deliver each item
//!   at most once
//! - [`JobSession`] runs the job lifecycle state machine
//!   (upload, generate/continue, cancel, reset) and emits [`SessionEvent`]s
//! - a background poll loop streams new results while a run is active
//!   and settles the session when the job stops
//! - [`CoordinateEditor`] and [`PreviewDebouncer`] drive the drag-based
//!   placement editor with rate-limited preview regeneration
//!
//! ## Quick Start
//!
//! ```no_run
//! use certgen_client::{CertClient, JobSession, SessionEvent};
//!
//! # async fn example() -> certgen_client::Result<()> {
//! let client = CertClient::new("http://127.0.0.1:5000");
//! let (session, mut events) = JobSession::new(client);
//!
//! // Reconstruct whatever job the service already knows about.
//! let state = session.resume_on_load().await?;
//! println!("resumed in {:?}", state);
//!
//! tokio::spawn(async move {
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             SessionEvent::ItemRendered { item } => println!("  {}", item.name),
//!             SessionEvent::StateChanged { state } => println!("-> {:?}", state),
//!         }
//!     }
//! });
//!
//! session.upload_source("names.csv", b"name\nAlice\nBob\n".to_vec()).await?;
//! session.generate().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod events;
pub mod ledger;
pub mod poller;
pub mod preview;
pub mod resume;
pub mod session;
pub mod types;

pub use api::JobBackend;
pub use client::CertClient;
pub use error::{ClientError, Result};
pub use events::{PreviewUpdate, SessionEvent};
pub use ledger::DisplayLedger;
pub use poller::{PollerHandle, DEFAULT_POLL_INTERVAL};
pub use preview::{CoordinateEditor, PreviewDebouncer, DEFAULT_DEBOUNCE_WINDOW};
pub use session::{JobSession, SessionContext};
pub use types::{
    Bounds, JobSnapshot, PositionState, PreviewImage, RenderSettings, ResultItem, ResultStatus,
    SessionState, StartOutcome, UploadOutcome,
};
