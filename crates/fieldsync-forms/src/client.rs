//! Reqwest client for the upstream mobile-forms API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument, warn};

use fieldsync_core::{defaults, Error, FormsApi, RawSubmission, Result};

/// Configuration for the forms API client.
#[derive(Debug, Clone)]
pub struct FormsConfig {
    /// Base URL of the REST API.
    pub base_url: String,
    /// API token sent as a bearer credential.
    pub token: String,
    /// Timeout for metadata calls (fetch, mark-read, list get/put).
    pub metadata_timeout: Duration,
    /// Timeout for media downloads.
    pub media_timeout: Duration,
    /// Timeout for generated-report downloads.
    pub report_timeout: Duration,
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::FORMS_BASE_URL.to_string(),
            token: String::new(),
            metadata_timeout: Duration::from_secs(defaults::METADATA_TIMEOUT_SECS),
            media_timeout: Duration::from_secs(defaults::MEDIA_TIMEOUT_SECS),
            report_timeout: Duration::from_secs(defaults::REPORT_TIMEOUT_SECS),
        }
    }
}

impl FormsConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `FORMS_BASE_URL` | built-in | API base URL |
    /// | `FORMS_API_TOKEN` | — (required) | Bearer token |
    /// | `FORMS_METADATA_TIMEOUT_SECS` | `15` | Metadata call budget |
    /// | `FORMS_MEDIA_TIMEOUT_SECS` | `60` | Media download budget |
    /// | `FORMS_REPORT_TIMEOUT_SECS` | `180` | Report download budget |
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("FORMS_API_TOKEN")
            .map_err(|_| Error::Config("FORMS_API_TOKEN is not set".into()))?;

        let secs = |var: &str, default: u64| {
            std::env::var(var)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default)
        };

        Ok(Self {
            base_url: std::env::var("FORMS_BASE_URL")
                .unwrap_or_else(|_| defaults::FORMS_BASE_URL.to_string()),
            token,
            metadata_timeout: Duration::from_secs(secs(
                "FORMS_METADATA_TIMEOUT_SECS",
                defaults::METADATA_TIMEOUT_SECS,
            )),
            media_timeout: Duration::from_secs(secs(
                "FORMS_MEDIA_TIMEOUT_SECS",
                defaults::MEDIA_TIMEOUT_SECS,
            )),
            report_timeout: Duration::from_secs(secs(
                "FORMS_REPORT_TIMEOUT_SECS",
                defaults::REPORT_TIMEOUT_SECS,
            )),
        })
    }
}

/// HTTP client for the upstream forms API.
///
/// Three inner clients carry the three timeout budgets; everything else is
/// shared.
pub struct FormsClient {
    metadata: Client,
    media: Client,
    report: Client,
    base_url: String,
    token: String,
}

impl FormsClient {
    /// Create a new client from configuration.
    pub fn new(config: FormsConfig) -> Result<Self> {
        let build = |timeout: Duration| {
            Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))
        };

        info!(
            subsystem = "forms",
            component = "client",
            base_url = %config.base_url,
            metadata_timeout_secs = config.metadata_timeout.as_secs(),
            media_timeout_secs = config.media_timeout.as_secs(),
            report_timeout_secs = config.report_timeout.as_secs(),
            "Initializing forms API client"
        );

        Ok(Self {
            metadata: build(config.metadata_timeout)?,
            media: build(config.media_timeout)?,
            report: build(config.report_timeout)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::Upstream(format!("HTTP {status}: {body}")))
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .metadata
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(Self::check(response).await?.json::<T>().await?)
    }

    async fn download(&self, client: &Client, path: &str) -> Result<Vec<u8>> {
        let start = Instant::now();
        let response = client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let bytes = Self::check(response).await?.bytes().await?;
        debug!(
            subsystem = "forms",
            component = "client",
            path,
            bytes = bytes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Downloaded artifact"
        );
        Ok(bytes.to_vec())
    }
}

// ─── Wire shapes ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SubmissionPayload {
    #[serde(alias = "_id")]
    id: JsonValue,
    #[serde(default)]
    fields: JsonValue,
}

#[derive(Debug, Deserialize)]
struct UnreadResponse {
    #[serde(default)]
    data: Vec<SubmissionPayload>,
}

#[derive(Debug, Deserialize)]
struct SubmissionResponse {
    data: SubmissionPayload,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    list: ListBody,
}

#[derive(Debug, Deserialize)]
struct ListBody {
    #[serde(default)]
    items: Vec<String>,
}

#[derive(Debug, Serialize)]
struct MarkRequest<'a> {
    data_ids: &'a [String],
}

#[derive(Debug, Serialize)]
struct ReplaceListRequest<'a> {
    items: &'a [String],
}

/// Submission ids arrive as strings or bare numbers depending on the API
/// revision.
fn id_to_string(id: &JsonValue) -> Result<String> {
    match id {
        JsonValue::String(s) => Ok(s.clone()),
        JsonValue::Number(n) => Ok(n.to_string()),
        other => Err(Error::Upstream(format!("unusable submission id: {other}"))),
    }
}

fn into_raw(form_id: &str, payload: SubmissionPayload) -> Result<RawSubmission> {
    Ok(RawSubmission {
        form_id: form_id.to_string(),
        submission_id: id_to_string(&payload.id)?,
        fields: payload.fields,
    })
}

#[async_trait]
impl FormsApi for FormsClient {
    #[instrument(skip(self))]
    async fn fetch_unread(&self, form_id: &str, limit: u32) -> Result<Vec<RawSubmission>> {
        let response: UnreadResponse = self
            .get_json(&format!("forms/{form_id}/data/unread/ingest/{limit}"))
            .await?;

        let mut submissions = Vec::with_capacity(response.data.len());
        for payload in response.data {
            match into_raw(form_id, payload) {
                Ok(raw) => submissions.push(raw),
                // One malformed envelope must not sink the batch.
                Err(e) => warn!(
                    subsystem = "forms",
                    component = "client",
                    form_id,
                    error = %e,
                    "Skipping submission with unusable envelope"
                ),
            }
        }
        Ok(submissions)
    }

    async fn fetch_submission(&self, form_id: &str, submission_id: &str) -> Result<RawSubmission> {
        let response: SubmissionResponse = self
            .get_json(&format!("forms/{form_id}/data/{submission_id}"))
            .await?;
        into_raw(form_id, response.data)
    }

    async fn mark_read(&self, form_id: &str, submission_ids: &[String]) -> Result<()> {
        let response = self
            .metadata
            .post(self.url(&format!("forms/{form_id}/markasreadbyaction/ingest")))
            .bearer_auth(&self.token)
            .json(&MarkRequest {
                data_ids: submission_ids,
            })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn mark_unread(&self, form_id: &str, submission_ids: &[String]) -> Result<()> {
        let response = self
            .metadata
            .post(self.url(&format!("forms/{form_id}/markasunreadbyaction/ingest")))
            .bearer_auth(&self.token)
            .json(&MarkRequest {
                data_ids: submission_ids,
            })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn download_media(
        &self,
        form_id: &str,
        submission_id: &str,
        media_name: &str,
    ) -> Result<Vec<u8>> {
        self.download(
            &self.media,
            &format!("forms/{form_id}/data/{submission_id}/medias/{media_name}"),
        )
        .await
    }

    async fn download_report(&self, form_id: &str, submission_id: &str) -> Result<Vec<u8>> {
        self.download(
            &self.report,
            &format!("forms/{form_id}/data/{submission_id}/pdf"),
        )
        .await
    }

    async fn get_list(&self, list_id: &str) -> Result<Vec<String>> {
        let response: ListResponse = self.get_json(&format!("lists/{list_id}")).await?;
        Ok(response.list.items)
    }

    async fn replace_list(&self, list_id: &str, entries: &[String]) -> Result<()> {
        let response = self
            .metadata
            .put(self.url(&format!("lists/{list_id}")))
            .bearer_auth(&self.token)
            .json(&ReplaceListRequest { items: entries })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
