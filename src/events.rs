use serde::{Deserialize, Serialize};

use crate::types::{PreviewImage, ResultItem, SessionState};

/// Notifications delivered to the embedding application over the session's
/// event channel. Receiving `ItemRendered` IS the render: the ledger
/// guarantees each name is delivered at most once per page lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SessionEvent {
    /// A result item crossed the dedup gate for the first time.
    ItemRendered { item: ResultItem },
    /// The session moved to a new phase.
    StateChanged { state: SessionState },
}

/// Notifications from the debounced preview pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum PreviewUpdate {
    /// A preview render finished and is newer than anything shown so far.
    Ready { image: PreviewImage },
    /// The preview request failed; the last shown image stays up.
    Failed { message: String },
}
