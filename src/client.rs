use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::api::JobBackend;
use crate::error::{ClientError, Result};
use crate::types::*;

fn normalize(endpoint: String) -> String {
    endpoint.trim_end_matches('/').to_string()
}

// Wire envelopes. Every mutating endpoint answers with `success` and an
// optional `error` message alongside its payload fields.

#[derive(Debug, Deserialize)]
struct Ack {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(rename = "is_new_csv", default)]
    is_new_source: bool,
    #[serde(rename = "previous_progress", default)]
    previous_progress: usize,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct StartResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    results: Vec<ResultItem>,
    #[serde(default)]
    new_results: Vec<ResultItem>,
}

#[derive(Debug, Deserialize)]
struct PreviewResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    preview_image_data: Option<String>,
}

fn job_error(error: Option<String>) -> ClientError {
    ClientError::Job(error.unwrap_or_else(|| "Unknown error".to_string()))
}

/// HTTP client for a certificate generation service instance.
///
/// Implements the [`JobBackend`] contract the session machinery consumes
/// (status, start, cancel, reset, source upload, preview), plus the
/// surrounding plumbing endpoints: settings CRUD, template and font
/// management, and the results-manifest download.
///
/// # Example
/// ```no_run
/// use certgen_client::{CertClient, JobBackend};
///
/// # async fn example() -> certgen_client::Result<()> {
/// let client = CertClient::new("http://127.0.0.1:5000");
/// let snapshot = client.status().await?;
/// println!("processed so far: {}", snapshot.processed_count);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CertClient {
    http: Client,
    endpoint: String,
}

impl CertClient {
    /// Create a new client pointing at the given service endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: normalize(endpoint.into()),
        }
    }

    /// Use a custom `reqwest::Client` (for connection pooling, timeouts, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Returns the configured endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post_ack(&self, path: &str, context: &str, timeout: Duration) -> Result<()> {
        let url = format!("{}{}", self.endpoint, path);
        let resp = self
            .http
            .post(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ClientError::Network {
                context: context.to_string(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Http { status, body });
        }

        let ack: Ack = resp.json().await.map_err(|e| ClientError::Network {
            context: format!("Failed to parse {} response", path),
            source: e,
        })?;

        if !ack.success {
            return Err(job_error(ack.error));
        }
        Ok(())
    }

    async fn upload_file(&self, path: &str, file_name: &str, bytes: Vec<u8>) -> Result<Ack> {
        let url = format!("{}{}", self.endpoint, path);
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new().part("file", part);

        let resp = self
            .http
            .post(&url)
            .timeout(Duration::from_secs(30))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::Network {
                context: format!("Failed to upload {} to the certificate service", file_name),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Http { status, body });
        }

        resp.json().await.map_err(|e| ClientError::Network {
            context: format!("Failed to parse {} response", path),
            source: e,
        })
    }

    // ── Settings ────────────────────────────────────────────────────

    /// Fetch the current render settings.
    pub async fn settings(&self) -> Result<RenderSettings> {
        let url = format!("{}/settings", self.endpoint);
        let resp = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| ClientError::Network {
                context: "Failed to fetch render settings".into(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Http { status, body });
        }

        resp.json().await.map_err(|e| ClientError::Network {
            context: "Failed to parse render settings".into(),
            source: e,
        })
    }

    /// Persist render settings on the service.
    pub async fn put_settings(&self, settings: &RenderSettings) -> Result<()> {
        let url = format!("{}/settings", self.endpoint);
        let resp = self
            .http
            .put(&url)
            .timeout(Duration::from_secs(10))
            .json(settings)
            .send()
            .await
            .map_err(|e| ClientError::Network {
                context: "Failed to save render settings".into(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Http { status, body });
        }

        let ack: Ack = resp.json().await.map_err(|e| ClientError::Network {
            context: "Failed to parse settings response".into(),
            source: e,
        })?;
        if !ack.success {
            return Err(job_error(ack.error));
        }
        Ok(())
    }

    // ── Templates & fonts ───────────────────────────────────────────

    /// List template image names available on the service.
    pub async fn templates(&self) -> Result<Vec<String>> {
        self.name_list("/templates", "templates").await
    }

    /// List font names available on the service.
    pub async fn fonts(&self) -> Result<Vec<String>> {
        self.name_list("/fonts", "fonts").await
    }

    async fn name_list(&self, path: &str, key: &str) -> Result<Vec<String>> {
        let url = format!("{}{}", self.endpoint, path);
        let resp = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| ClientError::Network {
                context: format!("Failed to fetch {}", key),
                source: e,
            })?;

        if !resp.status().is_success() {
            return Ok(Vec::new());
        }

        let json: Value = resp.json().await.map_err(|e| ClientError::Network {
            context: format!("Failed to parse {} response", path),
            source: e,
        })?;

        Ok(json
            .get(key)
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Upload a template image for certificate backgrounds.
    pub async fn upload_template(&self, file_name: &str, bytes: Vec<u8>) -> Result<()> {
        let ack = self.upload_file("/upload-template", file_name, bytes).await?;
        if !ack.success {
            return Err(job_error(ack.error));
        }
        Ok(())
    }

    /// Upload a font for name rendering.
    pub async fn upload_font(&self, file_name: &str, bytes: Vec<u8>) -> Result<()> {
        let ack = self.upload_file("/upload-font", file_name, bytes).await?;
        if !ack.success {
            return Err(job_error(ack.error));
        }
        Ok(())
    }

    // ── Manifest ────────────────────────────────────────────────────

    /// Download the generated-results manifest as CSV bytes.
    pub async fn download_manifest(&self) -> Result<Vec<u8>> {
        let url = format!("{}/download-csv", self.endpoint);
        let resp = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| ClientError::Network {
                context: "Failed to download results manifest".into(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Http { status, body });
        }

        let bytes = resp.bytes().await.map_err(|e| ClientError::Network {
            context: "Failed to read manifest bytes".into(),
            source: e,
        })?;
        Ok(bytes.to_vec())
    }
}

impl JobBackend for CertClient {
    async fn upload_source(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadOutcome> {
        let url = format!("{}/upload-csv", self.endpoint);
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new().part("file", part);

        let resp = self
            .http
            .post(&url)
            .timeout(Duration::from_secs(30))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::Network {
                context: format!(
                    "Cannot reach the certificate service at {} for upload",
                    self.endpoint
                ),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Http { status, body });
        }

        let parsed: UploadResponse = resp.json().await.map_err(|e| ClientError::Network {
            context: "Failed to parse upload response".into(),
            source: e,
        })?;

        if !parsed.success {
            return Err(job_error(parsed.error));
        }

        Ok(UploadOutcome {
            is_new_source: parsed.is_new_source,
            previous_progress_count: parsed.previous_progress,
            message: parsed.message,
        })
    }

    async fn status(&self) -> Result<JobSnapshot> {
        let url = format!("{}/check-progress", self.endpoint);
        let resp = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| ClientError::Network {
                context: format!(
                    "Cannot reach the certificate service at {} for a status read",
                    self.endpoint
                ),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Http { status, body });
        }

        resp.json().await.map_err(|e| ClientError::Network {
            context: "Failed to parse job snapshot".into(),
            source: e,
        })
    }

    // No request timeout: the call returns when the run stops, which can
    // take as long as the job itself.
    async fn start_job(&self) -> Result<StartOutcome> {
        let url = format!("{}/generate", self.endpoint);
        let resp = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| ClientError::Network {
                context: format!(
                    "Cannot reach the certificate service at {} to start the job",
                    self.endpoint
                ),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Http { status, body });
        }

        let parsed: StartResponse = resp.json().await.map_err(|e| ClientError::Network {
            context: "Failed to parse generation response".into(),
            source: e,
        })?;

        if !parsed.success {
            return Err(job_error(parsed.error));
        }

        Ok(StartOutcome {
            completed: parsed.completed,
            results: parsed.results,
            new_results: parsed.new_results,
        })
    }

    async fn cancel_job(&self) -> Result<()> {
        self.post_ack("/cancel", "Failed to send cancel request", Duration::from_secs(5))
            .await
    }

    async fn reset_job(&self) -> Result<()> {
        self.post_ack(
            "/reset-progress",
            "Failed to send reset request",
            Duration::from_secs(10),
        )
        .await
    }

    async fn render_preview(
        &self,
        settings: RenderSettings,
        sample_name: String,
    ) -> Result<PreviewImage> {
        let url = format!("{}/preview", self.endpoint);
        let body = serde_json::json!({
            "settings": settings,
            "sample_name": sample_name,
        });

        let resp = self
            .http
            .post(&url)
            .timeout(Duration::from_secs(30))
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Network {
                context: "Failed to request a preview render".into(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body_text = resp.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                status,
                body: body_text,
            });
        }

        let parsed: PreviewResponse = resp.json().await.map_err(|e| ClientError::Network {
            context: "Failed to parse preview response".into(),
            source: e,
        })?;

        if !parsed.success {
            return Err(job_error(parsed.error));
        }

        parsed
            .preview_image_data
            .map(|data| PreviewImage { data })
            .ok_or_else(|| {
                ClientError::InvalidResponse("Preview response missing image data".into())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize("http://localhost:5000/".into()), "http://localhost:5000");
        assert_eq!(normalize("http://localhost:5000".into()), "http://localhost:5000");
        assert_eq!(normalize("http://host:5000///".into()), "http://host:5000");
    }

    #[test]
    fn test_client_builder() {
        let client = CertClient::new("http://127.0.0.1:5000/");
        assert_eq!(client.endpoint(), "http://127.0.0.1:5000");
    }

    #[test]
    fn test_parse_upload_response() {
        let parsed: UploadResponse = serde_json::from_str(
            r#"{
            "success": true,
            "is_new_csv": true,
            "previous_progress": 7,
            "message": "Uploaded 30 names"
        }"#,
        )
        .unwrap();

        assert!(parsed.success);
        assert!(parsed.is_new_source);
        assert_eq!(parsed.previous_progress, 7);
        assert_eq!(parsed.message, "Uploaded 30 names");
    }

    #[test]
    fn test_parse_upload_failure() {
        let parsed: UploadResponse =
            serde_json::from_str(r#"{"success": false, "error": "missing name column"}"#).unwrap();
        assert!(!parsed.success);
        assert_eq!(job_error(parsed.error).to_string(), "missing name column");
    }

    #[test]
    fn test_parse_start_response() {
        let parsed: StartResponse = serde_json::from_str(
            r#"{
            "success": true,
            "completed": true,
            "results": [
                {"name": "Alice", "url": "https://cdn.example/alice.pdf", "status": "success"},
                {"name": "Bob", "url": "https://cdn.example/bob.pdf", "status": "success"}
            ],
            "new_results": [
                {"name": "Bob", "url": "https://cdn.example/bob.pdf", "status": "success"}
            ]
        }"#,
        )
        .unwrap();

        assert!(parsed.completed);
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.new_results.len(), 1);
        assert_eq!(parsed.new_results[0].name, "Bob");
    }

    #[test]
    fn test_parse_preview_response() {
        let parsed: PreviewResponse = serde_json::from_str(
            r#"{"success": true, "preview_image_data": "aGVsbG8="}"#,
        )
        .unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.preview_image_data.as_deref(), Some("aGVsbG8="));
    }

    #[test]
    fn test_parse_ack_failure() {
        let ack: Ack = serde_json::from_str(r#"{"success": false, "error": "job running"}"#).unwrap();
        assert!(!ack.success);
        match job_error(ack.error) {
            ClientError::Job(msg) => assert_eq!(msg, "job running"),
            other => panic!("Expected Job error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_name_list() {
        let json: Value =
            serde_json::from_str(r#"{"templates": ["classic.png", "modern.png"]}"#).unwrap();
        let names: Vec<String> = json
            .get("templates")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        assert_eq!(names, vec!["classic.png", "modern.png"]);
    }
}
