//! HTTP side of Agent Core: document upload, contact form, newsletter.

use crate::error::{ClientError, Result};
use curavyom_common::forms::{ContactForm, SubscribeRequest};
use curavyom_config::Endpoints;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, instrument, warn};

/// A file picked by the user for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = mime_guess::from_path(&name).first_or_octet_stream().to_string();
        Self { name, bytes, content_type }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(name, bytes))
    }
}

/// Body returned by the upload endpoint. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub analysis: Option<Value>,
}

impl UploadResponse {
    /// Analysis text, if the server sent a non-null one.
    pub fn analysis_text(&self) -> Option<String> {
        match self.analysis.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl ApiClient {
    pub fn new(endpoints: Endpoints) -> Self {
        Self::with_client(reqwest::Client::new(), endpoints)
    }

    pub fn with_client(http: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// POST the file as multipart field `file`. Success requires a 2xx
    /// status and a JSON body.
    #[instrument(skip(self, file), fields(file = %file.name, size = file.bytes.len()))]
    pub async fn upload(&self, file: UploadFile) -> Result<UploadResponse> {
        let part = Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(&file.content_type)?;
        let form = Form::new().part("file", part);

        let response = self.http.post(&self.endpoints.upload).multipart(form).send().await?;
        Self::handle_response(response).await
    }

    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn contact(&self, form: &ContactForm) -> Result<()> {
        let response = self.http.post(&self.endpoints.contact).json(form).send().await?;
        Self::ensure_success(response).await
    }

    #[instrument(skip(self))]
    pub async fn subscribe(&self, email: &str) -> Result<()> {
        let body = SubscribeRequest { email: email.to_string() };
        let response = self.http.post(&self.endpoints.subscribe).json(&body).send().await?;
        Self::ensure_success(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await?;
            debug!(status = status.as_u16(), bytes = body.len(), "response received");
            Ok(serde_json::from_slice(&body)?)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn ensure_success(response: reqwest::Response) -> Result<()> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn api_error(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_else(|_| "Unknown error".into());
        warn!(status, "Agent Core rejected request");
        ClientError::Api { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_content_type_guessed_from_name() {
        assert_eq!(UploadFile::new("report.pdf", vec![]).content_type, "application/pdf");
        assert_eq!(UploadFile::new("notes.txt", vec![]).content_type, "text/plain");
        assert_eq!(
            UploadFile::new("blob", vec![]).content_type,
            "application/octet-stream"
        );
    }

    #[test]
    fn test_analysis_text_variants() {
        let parse = |v: Value| serde_json::from_value::<UploadResponse>(v).unwrap().analysis_text();
        assert_eq!(parse(json!({"analysis": "x"})), Some("x".into()));
        assert_eq!(parse(json!({"analysis": null})), None);
        assert_eq!(parse(json!({"status": "ok"})), None);
        assert_eq!(parse(json!({"analysis": {"genes": 3}})), Some(r#"{"genes":3}"#.into()));
    }

    #[tokio::test]
    async fn test_from_path_reads_name_and_bytes() {
        let path = std::env::temp_dir().join(format!("curavyom-upload-{}.csv", std::process::id()));
        tokio::fs::write(&path, b"drug,target\nmetformin,AMPK\n").await.unwrap();

        let file = UploadFile::from_path(&path).await.unwrap();
        assert!(file.name.ends_with(".csv"));
        assert_eq!(file.content_type, "text/csv");
        assert_eq!(file.bytes.len(), 27);

        tokio::fs::remove_file(&path).await.ok();
    }
}
