use crate::types::{JobSnapshot, SessionState};

/// Derive the session phase from a status snapshot.
///
/// Evaluated top to bottom, first match wins:
///
/// | has_progress | is_generating | is_complete | has_source | matches | phase |
/// |---|---|---|---|---|---|
/// | false | -     | -     | -     | -     | `NoJob` |
/// | true  | true  | -     | -     | -     | `Running(processed)` |
/// | true  | false | true  | -     | -     | `Completed` |
/// | true  | false | false | true  | true  | `ReadyToResume(processed)` |
/// | true  | false | false | true  | false | `ReadyToStart` (stale roster) |
/// | true  | false | false | false | -     | `ReadyToResume`, resume disabled |
pub fn reconcile(snapshot: &JobSnapshot) -> SessionState {
    if !snapshot.has_progress {
        return SessionState::NoJob;
    }
    if snapshot.is_generating {
        return SessionState::Running {
            processed: snapshot.processed_count,
        };
    }
    if snapshot.is_complete {
        return SessionState::Completed;
    }
    if snapshot.has_source_file {
        if snapshot.source_file_matches {
            SessionState::ReadyToResume {
                processed: snapshot.processed_count,
                source_available: true,
            }
        } else {
            SessionState::ReadyToStart
        }
    } else {
        SessionState::ReadyToResume {
            processed: snapshot.processed_count,
            source_available: false,
        }
    }
}
