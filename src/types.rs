use serde::{Deserialize, Serialize};

/// Outcome of one rendered certificate within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Error,
}

/// A single unit of work reported by the service.
///
/// Identity is `name`: the service guarantees names are unique within one
/// job, and the display ledger dedups on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultItem {
    pub name: String,
    pub status: ResultStatus,
    /// Hosted certificate URL. Present when `status` is `Success`; the
    /// service sends an empty string on error rows.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ResultItem {
    pub fn is_ok(&self) -> bool {
        self.status == ResultStatus::Success
    }
}

/// Point-in-time job status read from the service's progress endpoint.
///
/// Never mutated locally; only read and diffed against the display ledger.
/// `processed_count` equals `results.len()` whenever results are present,
/// and `is_complete` implies `!is_generating`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub has_progress: bool,
    #[serde(default)]
    pub processed_count: usize,
    #[serde(default)]
    pub results: Vec<ResultItem>,
    /// Whether the service still holds an uploaded source roster.
    #[serde(rename = "has_csv", default)]
    pub has_source_file: bool,
    /// Whether that roster is the one the active job was started from.
    #[serde(rename = "csv_matches", default)]
    pub source_file_matches: bool,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub is_generating: bool,
}

/// Result of uploading a source roster.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// The uploaded roster differs from the one behind the active job.
    pub is_new_source: bool,
    /// Certificates already generated for the previous roster.
    pub previous_progress_count: usize,
    pub message: String,
}

/// Final response of a generation run, returned when the run stops.
#[derive(Debug, Clone)]
pub struct StartOutcome {
    /// True when every roster entry has been processed.
    pub completed: bool,
    /// All results the job has produced so far, in processing order.
    pub results: Vec<ResultItem>,
    /// The subset produced by this run.
    pub new_results: Vec<ResultItem>,
}

/// The authoritative client-side phase of the job session.
///
/// Created by the resume-on-load reconciler, transitioned by
/// upload/generate/cancel/reset actions and by poll results, discarded
/// with the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum SessionState {
    NoJob,
    ReadyToStart,
    ReadyToResume {
        processed: usize,
        /// False when the service no longer holds a roster to resume from;
        /// the resume action should be shown disabled.
        source_available: bool,
    },
    Running {
        processed: usize,
    },
    Completed,
    Error {
        message: String,
    },
}

impl SessionState {
    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running { .. })
    }
}

/// Lower clamp bound for normalized text placement.
pub const POSITION_MIN: f64 = 0.05;
/// Upper clamp bound for normalized text placement.
pub const POSITION_MAX: f64 = 0.95;

/// Normalized fractional position of the name text on the template.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    pub x: f64,
    pub y: f64,
}

impl PositionState {
    /// Build a position clamped into `[POSITION_MIN, POSITION_MAX]` on
    /// both axes. Clamped, not wrapped.
    pub fn clamped(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(POSITION_MIN, POSITION_MAX),
            y: y.clamp(POSITION_MIN, POSITION_MAX),
        }
    }
}

impl Default for PositionState {
    fn default() -> Self {
        Self { x: 0.5, y: 0.44 }
    }
}

/// Reference rectangle the drag editor converts pointer coordinates
/// against, in the same units as the pointer (pixels, typically).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Visual settings for certificate rendering, carried by the preview
/// request and the settings endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    pub template: String,
    pub font: String,
    pub font_size: u32,
    /// Hex color string, e.g. `"#7b5ed2"`.
    pub text_color: String,
    pub stroke_width: u32,
    pub image_quality: u8,
    pub position: PositionState,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            template: "certificate.png".to_string(),
            font: "AlexBrush-Regular.ttf".to_string(),
            font_size: 120,
            text_color: "#7b5ed2".to_string(),
            stroke_width: 2,
            image_quality: 95,
            position: PositionState::default(),
        }
    }
}

/// Rendered preview payload from the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewImage {
    /// Base64-encoded image data.
    pub data: String,
}
