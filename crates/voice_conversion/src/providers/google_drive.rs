//! Google Drive model downloader
//!
//! Fetches publicly shared files by id through the `uc?export=download`
//! endpoint. Files too large for Drive's virus scan come back as an HTML
//! confirmation page; the confirmation token is extracted and the request
//! retried once.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use crate::error::VoiceCloneError;
use crate::ports::ModelDownloader;

/// Downloader for publicly shared Google Drive files
#[derive(Debug, Clone)]
pub struct GoogleDriveDownloader {
    client: Client,
    base_url: String,
}

impl GoogleDriveDownloader {
    /// Create a downloader against `base_url` (normally `https://drive.google.com`)
    ///
    /// # Errors
    ///
    /// Returns `VoiceCloneError::Configuration` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, VoiceCloneError> {
        let client = Client::builder()
            .user_agent(concat!("voiceclone/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VoiceCloneError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn download_url(&self) -> String {
        format!("{}/uc", self.base_url)
    }

    async fn request(
        &self,
        file_id: &str,
        confirmation: Option<&Confirmation>,
    ) -> Result<Response, VoiceCloneError> {
        let mut query = vec![("export", "download"), ("id", file_id)];
        if let Some(c) = confirmation {
            query.push(("confirm", c.token.as_str()));
            if let Some(uuid) = &c.uuid {
                query.push(("uuid", uuid.as_str()));
            }
        }

        let response = self
            .client
            .get(self.download_url())
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(VoiceCloneError::DownloadFailed(format!(
                "File {file_id} returned HTTP {status}"
            )));
        }
        Ok(response)
    }

    /// Stream the body to `<destination>.part`, then rename into place
    ///
    /// The part file is removed on every failure.
    async fn save(response: Response, destination: &Path) -> Result<u64, VoiceCloneError> {
        let part_path = part_path(destination);
        let result = match Self::write_part(response, &part_path).await {
            Ok(0) => Err(VoiceCloneError::DownloadFailed(
                "Remote file is empty".to_string(),
            )),
            Ok(written) => tokio::fs::rename(&part_path, destination)
                .await
                .map(|()| written)
                .map_err(VoiceCloneError::from),
            Err(e) => Err(e),
        };

        if result.is_err() {
            let _ = tokio::fs::remove_file(&part_path).await;
        }
        result
    }

    async fn write_part(response: Response, part_path: &Path) -> Result<u64, VoiceCloneError> {
        let mut file = tokio::fs::File::create(part_path).await?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_lowercase().starts_with("text/html"))
}

/// Token set required to get past the large-file warning page
#[derive(Debug, Clone, PartialEq, Eq)]
struct Confirmation {
    token: String,
    uuid: Option<String>,
}

impl Confirmation {
    /// Extract the confirmation from a warning page, defaulting to `confirm=t`
    fn from_page(html: &str) -> Self {
        let token = hidden_input(html, "confirm")
            .or_else(|| query_value(html, "confirm"))
            .unwrap_or_else(|| "t".to_string());
        let uuid = hidden_input(html, "uuid").or_else(|| query_value(html, "uuid"));
        Self { token, uuid }
    }
}

/// Value of `<input ... name="{name}" value="...">`
fn hidden_input(html: &str, name: &str) -> Option<String> {
    let marker = format!("name=\"{name}\"");
    let start = html.find(&marker)?;
    let tag_end = html[start..].find('>').map_or(html.len(), |i| start + i);
    let tag = &html[start..tag_end];
    let value_start = tag.find("value=\"")? + "value=\"".len();
    let value_len = tag[value_start..].find('"')?;
    Some(tag[value_start..value_start + value_len].to_string())
}

/// Value of a `{key}=...` pair inside a link on the page
fn query_value(html: &str, key: &str) -> Option<String> {
    let marker = format!("{key}=");
    html.match_indices(&marker).find_map(|(i, _)| {
        // Skip matches that are the tail of a longer parameter name
        let preceded_ok = html[..i]
            .chars()
            .next_back()
            .is_none_or(|c| matches!(c, '?' | '&' | ';'));
        if !preceded_ok {
            return None;
        }
        let rest = &html[i + marker.len()..];
        let value: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
            .collect();
        (!value.is_empty()).then_some(value)
    })
}

#[async_trait]
impl ModelDownloader for GoogleDriveDownloader {
    #[instrument(skip(self))]
    async fn download(&self, file_id: &str, destination: &Path) -> Result<(), VoiceCloneError> {
        let mut response = self.request(file_id, None).await?;

        if is_html(&response) {
            let page = response.text().await?;
            let confirmation = Confirmation::from_page(&page);
            debug!(token = %confirmation.token, "Drive returned confirmation page, retrying");

            response = self.request(file_id, Some(&confirmation)).await?;
            if is_html(&response) {
                warn!(file_id, "Drive refused to serve file");
                return Err(VoiceCloneError::DownloadFailed(format!(
                    "File {file_id} is not publicly downloadable"
                )));
            }
        }

        let bytes = Self::save(response, destination).await?;
        debug!(bytes, path = %destination.display(), "Download finished");
        Ok(())
    }
}
