//! Dashboard HTTP Client

use anyhow::{anyhow, Context, Result};
use dockhand_common::{ContainerSummary, DirectoryListing, EntryKind, NavAction};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// Session as returned by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub container_id: String,
    pub working_dir: String,
    pub current_path: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenedSession {
    pub session: SessionInfo,
    pub listing: Option<DirectoryListing>,
    #[serde(default)]
    pub listing_error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Navigated {
    pub current_path: String,
    pub listing: DirectoryListing,
}

#[derive(Debug, Deserialize)]
pub struct Uploaded {
    pub path: String,
    pub size_bytes: u64,
}

#[derive(Debug, Deserialize)]
pub struct Health {
    pub status: String,
    pub version: String,
    pub sessions: usize,
}

#[derive(Debug, Deserialize)]
pub struct RuntimeStatus {
    pub reachable: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Removed {
    removed: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    kind: String,
}

/// Client for the Dockhand web API
pub struct WebClient {
    http: reqwest::Client,
    base: String,
}

impl WebClient {
    pub fn new(server: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("dockhand-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base: server.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn session_url(&self, id: &str, path: &str) -> String {
        self.url(&format!("/api/sessions/{}{}", id, path))
    }

    pub async fn health(&self) -> Result<Health> {
        let resp = self.http.get(self.url("/api/health")).send().await?;
        Ok(check(resp).await?.json().await?)
    }

    /// Runtime reachability; a 503 still carries a status body
    pub async fn runtime(&self) -> Result<RuntimeStatus> {
        let resp = self.http.get(self.url("/api/runtime")).send().await?;
        if resp.status() == StatusCode::SERVICE_UNAVAILABLE {
            return Ok(resp.json().await?);
        }
        Ok(check(resp).await?.json().await?)
    }

    pub async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        let resp = self
            .http
            .get(self.url("/api/containers"))
            .query(&[("all", all)])
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn open_session(&self, container: &str) -> Result<OpenedSession> {
        let resp = self
            .http
            .post(self.url("/api/sessions"))
            .json(&json!({ "container": container }))
            .send()
            .await?;
        let opened: OpenedSession = check(resp).await?.json().await?;
        debug!(session = %opened.session.id, path = %opened.session.current_path, "session opened");
        Ok(opened)
    }

    pub async fn close_session(&self, id: &str) -> Result<()> {
        let resp = self.http.delete(self.session_url(id, "")).send().await?;
        check(resp).await?;
        Ok(())
    }

    pub async fn navigate(&self, id: &str, action: &NavAction) -> Result<Navigated> {
        let resp = self
            .http
            .post(self.session_url(id, "/navigate"))
            .json(action)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn upload(&self, id: &str, filename: &str, bytes: Vec<u8>) -> Result<Uploaded> {
        let resp = self
            .http
            .post(self.session_url(id, "/upload"))
            .query(&[("filename", filename)])
            .body(bytes)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn download(&self, id: &str, name: &str) -> Result<Vec<u8>> {
        let resp = self
            .http
            .get(self.session_url(id, "/download"))
            .query(&[("name", name)])
            .send()
            .await?;
        Ok(check(resp).await?.bytes().await?.to_vec())
    }

    /// Current directory as a tar archive, with the server-suggested file name
    pub async fn archive(&self, id: &str) -> Result<(Option<String>, Vec<u8>)> {
        let resp = check(self.http.get(self.session_url(id, "/archive")).send().await?).await?;
        let filename = resp
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_filename);
        Ok((filename, resp.bytes().await?.to_vec()))
    }

    pub async fn request_delete(&self, id: &str, name: &str, kind: EntryKind) -> Result<()> {
        let resp = self
            .http
            .post(self.session_url(id, "/delete"))
            .json(&json!({ "name": name, "kind": kind }))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    /// Returns the full path that was removed
    pub async fn confirm_delete(&self, id: &str) -> Result<String> {
        let resp = self
            .http
            .post(self.session_url(id, "/delete/confirm"))
            .send()
            .await?;
        let removed: Removed = check(resp).await?.json().await?;
        Ok(removed.removed)
    }

    pub async fn cancel_delete(&self, id: &str) -> Result<()> {
        let resp = self
            .http
            .post(self.session_url(id, "/delete/cancel"))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

/// Turn an error response into an error carrying the server's message
async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.context("reading error response")?;
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => Err(anyhow!("{} ({}, HTTP {})", body.error, body.kind, status.as_u16())),
        Err(_) if text.trim().is_empty() => Err(anyhow!("request failed: HTTP {}", status)),
        Err(_) => Err(anyhow!("request failed: HTTP {}: {}", status, text.trim())),
    }
}

fn disposition_filename(value: &str) -> Option<String> {
    let start = value.find("filename=\"")? + "filename=\"".len();
    let end = value.rfind('"')?;
    if end <= start {
        return None;
    }
    Some(value[start..end].replace("\\\"", "\"").replace("\\\\", "\\"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_filename() {
        assert_eq!(
            disposition_filename("attachment; filename=\"logs.tar\""),
            Some("logs.tar".to_string())
        );
        assert_eq!(
            disposition_filename("attachment; filename=\"a\\\"b.txt\""),
            Some("a\"b.txt".to_string())
        );
        assert_eq!(disposition_filename("attachment"), None);
    }

    #[test]
    fn test_urls_strip_trailing_slash() {
        let client = WebClient::new("http://127.0.0.1:8080/").unwrap();
        assert_eq!(client.url("/api/health"), "http://127.0.0.1:8080/api/health");
        assert_eq!(
            client.session_url("abc", "/entries"),
            "http://127.0.0.1:8080/api/sessions/abc/entries"
        );
    }
}
