//! Distribution API endpoint addresses

use crate::core::error::PipelineError;
use reqwest::Url;

/// `POST` target that creates a release from an uploaded artifact
pub fn build_upload_url(base: &str, project_id: &str, app_id: &str) -> Result<Url, PipelineError> {
    check_segment("project id", project_id)?;
    check_segment("app id", app_id)?;

    parse(format!(
        "{}/upload/v1/projects/{}/apps/{}/releases:upload",
        base.trim_end_matches('/'),
        project_id,
        app_id
    ))
}

/// `POST` target that distributes an existing release to testers
pub fn build_distribute_url(
    base: &str,
    project_id: &str,
    app_id: &str,
    release_name: &str,
) -> Result<Url, PipelineError> {
    check_segment("project id", project_id)?;
    check_segment("app id", app_id)?;
    if release_name.trim().is_empty() || release_name.chars().any(char::is_whitespace) {
        return Err(PipelineError::config(format!(
            "invalid release name {:?}",
            release_name
        )));
    }

    parse(format!(
        "{}/v1/projects/{}/apps/{}/releases/{}:distribute",
        base.trim_end_matches('/'),
        project_id,
        app_id,
        release_name.trim_start_matches('/')
    ))
}

/// Ids are interpolated as single path segments
fn check_segment(what: &str, value: &str) -> Result<(), PipelineError> {
    let invalid = value.is_empty()
        || value
            .chars()
            .any(|c| c == '/' || c == '?' || c == '#' || c.is_whitespace());

    if invalid {
        return Err(PipelineError::config(format!("invalid {} {:?}", what, value)));
    }
    Ok(())
}

fn parse(address: String) -> Result<Url, PipelineError> {
    let url = Url::parse(&address)
        .map_err(|e| PipelineError::config(format!("invalid API address {}: {}", address, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(PipelineError::config(format!(
            "unsupported API scheme {:?}",
            scheme
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://firebaseappdistribution.googleapis.com";

    #[test]
    fn test_upload_url() {
        let url = build_upload_url(BASE, "demo-project", "1:1234567890:android:0a1b2c").unwrap();
        assert_eq!(
            url.as_str(),
            "https://firebaseappdistribution.googleapis.com/upload/v1/projects/demo-project/apps/1:1234567890:android:0a1b2c/releases:upload"
        );
    }

    #[test]
    fn test_distribute_url() {
        let url = build_distribute_url(BASE, "demo-project", "app-1", "releases/release-id").unwrap();
        assert_eq!(
            url.path(),
            "/v1/projects/demo-project/apps/app-1/releases/releases/release-id:distribute"
        );
    }

    #[test]
    fn test_trailing_slash_in_base() {
        let url = build_upload_url("http://127.0.0.1:8080/", "p", "a").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/upload/v1/projects/p/apps/a/releases:upload");
    }

    #[test]
    fn test_rejects_bad_segments() {
        assert!(build_upload_url(BASE, "", "a").is_err());
        assert!(build_upload_url(BASE, "p", "a/b").is_err());
        assert!(build_upload_url(BASE, "p q", "a").is_err());
        assert!(build_distribute_url(BASE, "p", "a", "").is_err());
        assert!(build_distribute_url(BASE, "p", "a", "rel ease").is_err());
    }

    #[test]
    fn test_rejects_bad_base() {
        assert!(build_upload_url("not a url", "p", "a").is_err());
        assert!(build_upload_url("ftp://example.com", "p", "a").is_err());
    }
}
