use std::future::Future;

use crate::error::Result;
use crate::types::{JobSnapshot, PreviewImage, RenderSettings, StartOutcome, UploadOutcome};

/// The collaborator contract the session machinery runs against.
///
/// [`CertClient`](crate::CertClient) implements it over HTTP; tests drive
/// the session, poller, and debouncer with an in-memory implementation.
///
/// # Example
///
/// ```ignore
/// struct FakeBackend { /* scripted snapshots */ }
///
/// impl JobBackend for FakeBackend {
///     async fn status(&self) -> Result<JobSnapshot> {
///         Ok(self.next_snapshot())
///     }
///     // ...
/// }
/// ```
pub trait JobBackend: Send + Sync {
    /// Upload a source roster for the next job.
    fn upload_source(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = Result<UploadOutcome>> + Send;

    /// Read the current job snapshot.
    fn status(&self) -> impl Future<Output = Result<JobSnapshot>> + Send;

    /// Start (or continue) the job. Returns when the run stops, which can
    /// take as long as the job itself.
    fn start_job(&self) -> impl Future<Output = Result<StartOutcome>> + Send;

    /// Ask the service to stop the running job. Advisory: the job keeps
    /// reporting as generating until the service actually stops it.
    fn cancel_job(&self) -> impl Future<Output = Result<()>> + Send;

    /// Discard the job and all generated output on the service.
    fn reset_job(&self) -> impl Future<Output = Result<()>> + Send;

    /// Render a one-off preview certificate with the given settings.
    fn render_preview(
        &self,
        settings: RenderSettings,
        sample_name: String,
    ) -> impl Future<Output = Result<PreviewImage>> + Send;
}
