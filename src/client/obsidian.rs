//! Local REST API client.

use super::VaultBackend;
use crate::config::ApiConfig;
use crate::models::{FileEntry, JsonSearchHit, SearchHit};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Content type for JsonLogic search bodies.
const JSONLOGIC_CONTENT_TYPE: &str = "application/vnd.olrapi.jsonlogic+json";
/// Content type for note bodies.
const MARKDOWN_CONTENT_TYPE: &str = "text/markdown";

/// Error body returned by the REST API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    error_code: Option<i64>,
    message: Option<String>,
}

/// Directory listing body.
#[derive(Debug, Deserialize)]
struct ListingBody {
    #[serde(default)]
    files: Vec<String>,
}

/// HTTP client for the Obsidian Local REST API plugin.
pub struct ObsidianClient {
    client: Client,
    base_url: Url,
    api_key: SecretString,
    request_timeout: Duration,
    max_content_length: usize,
    max_body_length: usize,
}

impl ObsidianClient {
    /// Creates a client from API configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is malformed or the HTTP client
    /// cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url())
            .map_err(|e| Error::InvalidInput(format!("invalid backend URL: {e}")))?;

        let mut builder = Client::builder().timeout(config.request_timeout);
        if !config.verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder
            .build()
            .map_err(|e| Error::operation("build_http_client", e))?;

        tracing::debug!(base_url = %base_url, verify_ssl = config.verify_ssl, "Created backend client");

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            request_timeout: config.request_timeout,
            max_content_length: config.max_content_length,
            max_body_length: config.max_body_length,
        })
    }

    /// Returns the backend base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds `/{root}/{segments...}`, percent-encoding each segment.
    fn url(&self, root: &str, path: &str, trailing_slash: bool) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::InvalidInput("backend URL cannot carry a path".into()))?;
            segments.clear().push(root);
            for part in path.split('/').filter(|p| !p.is_empty()) {
                segments.push(part);
            }
            if trailing_slash {
                segments.push("");
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(self.api_key.expose_secret())
    }

    fn check_body_length(&self, body: &str) -> Result<()> {
        if body.len() > self.max_body_length {
            return Err(Error::InvalidInput(format!(
                "request body is {} bytes, limit is {}",
                body.len(),
                self.max_body_length
            )));
        }
        Ok(())
    }

    /// Sends a request and returns the successful response.
    ///
    /// Error statuses are converted into [`Error::Backend`].
    async fn send(&self, operation: &'static str, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(|e| {
            metrics::counter!(
                "backend_requests_total",
                "operation" => operation,
                "status" => "transport_error"
            )
            .increment(1);
            if e.is_timeout() {
                Error::Timeout {
                    operation: operation.to_string(),
                    timeout: self.request_timeout,
                }
            } else {
                Error::operation(operation, e)
            }
        })?;

        let status = response.status();
        metrics::counter!(
            "backend_requests_total",
            "operation" => operation,
            "status" => status.as_u16().to_string()
        )
        .increment(1);

        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ApiErrorBody>(&text) {
            Ok(body) => (
                body.error_code,
                body.message.unwrap_or_else(|| status_text(status)),
            ),
            Err(_) if text.trim().is_empty() => (None, status_text(status)),
            Err(_) => (None, text),
        };
        tracing::debug!(operation, status = status.as_u16(), %message, "Backend request failed");

        Err(Error::Backend {
            status: status.as_u16(),
            code,
            message,
        })
    }

    /// Reads a successful response body, enforcing the content limit.
    ///
    /// A 204 maps to [`Error::NoContent`].
    async fn read_body(&self, operation: &'static str, response: reqwest::Response) -> Result<String> {
        if response.status() == StatusCode::NO_CONTENT {
            return Err(Error::NoContent);
        }
        if let Some(len) = response.content_length() {
            self.check_content_length(len)?;
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::operation(operation, e))?;
        self.check_content_length(bytes.len() as u64)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::operation(operation, e))
    }

    fn check_content_length(&self, len: u64) -> Result<()> {
        if len > self.max_content_length as u64 {
            return Err(Error::OperationFailed {
                operation: "read_response".to_string(),
                cause: format!(
                    "response is {len} bytes, limit is {}",
                    self.max_content_length
                ),
            });
        }
        Ok(())
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<T> {
        let text = self.read_body(operation, response).await?;
        serde_json::from_str(&text).map_err(|e| Error::operation(operation, e))
    }

    async fn list(&self, operation: &'static str, dirpath: &str) -> Result<Vec<FileEntry>> {
        let url = self.url("vault", dirpath, true)?;
        let response = self.send(operation, self.request(Method::GET, url)).await?;
        let body: ListingBody = self.read_json(operation, response).await?;
        Ok(body
            .files
            .iter()
            .map(|name| FileEntry::from_listing(dirpath, name))
            .collect())
    }

    async fn write(&self, operation: &'static str, method: Method, filepath: &str, content: &str) -> Result<()> {
        self.check_body_length(content)?;
        let url = self.url("vault", filepath, false)?;
        let request = self
            .request(method, url)
            .header(CONTENT_TYPE, HeaderValue::from_static(MARKDOWN_CONTENT_TYPE))
            .body(content.to_string());
        self.send(operation, request).await?;
        Ok(())
    }
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string)
}

#[async_trait]
impl VaultBackend for ObsidianClient {
    async fn list_files_in_vault(&self) -> Result<Vec<FileEntry>> {
        self.list("list_files_in_vault", "").await
    }

    async fn list_files_in_dir(&self, dirpath: &str) -> Result<Vec<FileEntry>> {
        self.list("list_files_in_dir", dirpath).await
    }

    async fn get_file_contents(&self, filepath: &str) -> Result<String> {
        let url = self.url("vault", filepath, false)?;
        let response = self
            .send("get_file_contents", self.request(Method::GET, url))
            .await?;
        self.read_body("get_file_contents", response).await
    }

    async fn search(&self, query: &str, context_length: u32) -> Result<Vec<SearchHit>> {
        let mut url = self.url("search", "simple", true)?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("contextLength", &context_length.to_string());
        let response = self.send("search", self.request(Method::POST, url)).await?;
        self.read_json("search", response).await
    }

    async fn append_content(&self, filepath: &str, content: &str) -> Result<()> {
        self.write("append_content", Method::POST, filepath, content)
            .await
    }

    async fn update_content(&self, filepath: &str, content: &str) -> Result<()> {
        self.write("update_content", Method::PUT, filepath, content)
            .await
    }

    async fn search_json(&self, query: &Value) -> Result<Vec<JsonSearchHit>> {
        let body = serde_json::to_string(query).map_err(|e| Error::operation("search_json", e))?;
        self.check_body_length(&body)?;
        let url = self.url("search", "", true)?;
        let request = self
            .request(Method::POST, url)
            .header(CONTENT_TYPE, HeaderValue::from_static(JSONLOGIC_CONTENT_TYPE))
            .body(body);
        let response = self.send("search_json", request).await?;
        self.read_json("search_json", response).await
    }
}
