//! Artifact upload
//!
//! The file is streamed from disk into a single multipart part, so there is
//! no client-side size limit and the artifact is never held in memory.

use crate::core::error::PipelineError;
use crate::distribution::artifact::Artifact;
use crate::distribution::endpoints::build_upload_url;
use crate::distribution::failure_details;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

const ARTIFACT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    name: Option<String>,
}

/// Uploads artifacts to the "create release" endpoint
pub struct Uploader {
    client: reqwest::Client,
    base_url: String,
}

impl Uploader {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Upload `artifact` and return the release name from the response
    pub async fn upload(
        &self,
        project_id: &str,
        app_id: &str,
        artifact: &Artifact,
        token: &SecretString,
    ) -> Result<String, PipelineError> {
        let url = build_upload_url(&self.base_url, project_id, app_id)?;

        let file = tokio::fs::File::open(&artifact.path)
            .await
            .map_err(|e| upload_error(None, format!("failed to open {}: {}", artifact.path.display(), e)))?;

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, artifact.size)
            .file_name(artifact.file_name.clone())
            .mime_str(ARTIFACT_CONTENT_TYPE)
            .map_err(|e| upload_error(None, e.to_string()))?;
        let form = Form::new().part("file", part);

        tracing::info!(
            file = %artifact.file_name,
            bytes = artifact.size,
            app_id,
            "uploading artifact"
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(token.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| upload_error(None, e.without_url().to_string()))?;

        if !response.status().is_success() {
            let (status, message) = failure_details(response).await;
            tracing::warn!(status, "upload rejected");
            return Err(upload_error(Some(status), message));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| upload_error(None, format!("invalid upload response: {}", e)))?;

        match parsed.name {
            Some(name) if !name.trim().is_empty() => {
                tracing::info!(release = %name, "release created");
                Ok(name)
            }
            _ => Err(upload_error(None, "missing release id in upload response")),
        }
    }
}

fn upload_error(status: Option<u16>, message: impl Into<String>) -> PipelineError {
    PipelineError::Upload {
        status,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use tempfile::TempDir;

    const UPLOAD_PATH: &str = "/upload/v1/projects/demo-project/apps/app-1/releases:upload";

    fn artifact_in(dir: &TempDir, contents: &[u8]) -> Artifact {
        std::fs::write(dir.path().join("app-release.apk"), contents).unwrap();
        Artifact::resolve("app-release.apk", dir.path()).unwrap()
    }

    fn token() -> SecretString {
        SecretString::from("ya29.upload-token")
    }

    #[tokio::test]
    async fn test_upload_streams_multipart_file() {
        let dir = TempDir::new().unwrap();
        let artifact = artifact_in(&dir, b"fake-apk-bytes");

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", UPLOAD_PATH)
            .match_header("authorization", "Bearer ya29.upload-token")
            .match_header("content-type", Matcher::Regex("^multipart/form-data; boundary=".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="file"; filename="app-release.apk""#.into()),
                Matcher::Regex("application/octet-stream".into()),
                Matcher::Regex("fake-apk-bytes".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"releases/release-id","done":true}"#)
            .create_async()
            .await;

        let uploader = Uploader::new(reqwest::Client::new(), server.url());
        let release = uploader
            .upload("demo-project", "app-1", &artifact, &token())
            .await
            .unwrap();

        assert_eq!(release, "releases/release-id");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_keeps_upstream_status() {
        let dir = TempDir::new().unwrap();
        let artifact = artifact_in(&dir, b"x");

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", UPLOAD_PATH)
            .with_status(404)
            .with_body(r#"{"error":{"code":404,"message":"App not found"}}"#)
            .create_async()
            .await;

        let uploader = Uploader::new(reqwest::Client::new(), server.url());
        let err = uploader
            .upload("demo-project", "app-1", &artifact, &token())
            .await
            .unwrap_err();

        assert_eq!(err.code(), "UPLOAD_FAILED");
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("App not found"));
        assert!(!err.to_string().contains("ya29.upload-token"));
    }

    #[tokio::test]
    async fn test_missing_release_name_is_an_error() {
        let dir = TempDir::new().unwrap();
        let artifact = artifact_in(&dir, b"x");

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", UPLOAD_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"done":false}"#)
            .create_async()
            .await;

        let uploader = Uploader::new(reqwest::Client::new(), server.url());
        let err = uploader
            .upload("demo-project", "app-1", &artifact, &token())
            .await
            .unwrap_err();

        assert_eq!(err.code(), "UPLOAD_FAILED");
        assert!(err.to_string().contains("missing release id"));
    }

    #[tokio::test]
    async fn test_non_json_response_is_an_error() {
        let dir = TempDir::new().unwrap();
        let artifact = artifact_in(&dir, b"x");

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", UPLOAD_PATH)
            .with_status(200)
            .with_body("<html>proxy page</html>")
            .create_async()
            .await;

        let uploader = Uploader::new(reqwest::Client::new(), server.url());
        let err = uploader
            .upload("demo-project", "app-1", &artifact, &token())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("invalid upload response"));
    }

    #[tokio::test]
    async fn test_transport_failure_has_no_status() {
        let dir = TempDir::new().unwrap();
        let artifact = artifact_in(&dir, b"x");

        // Nothing listens on port 9 of the loopback interface.
        let uploader = Uploader::new(reqwest::Client::new(), "http://127.0.0.1:9");
        let err = uploader
            .upload("demo-project", "app-1", &artifact, &token())
            .await
            .unwrap_err();

        assert_eq!(err.code(), "UPLOAD_FAILED");
        assert_eq!(err.status(), None);
    }
}
