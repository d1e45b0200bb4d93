pub mod artifact;
pub mod distributor;
pub mod endpoints;
pub mod uploader;

pub use artifact::Artifact;
pub use distributor::Distributor;
pub use endpoints::{build_distribute_url, build_upload_url};
pub use uploader::Uploader;

use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the HTTP client shared by every step of a run
///
/// `timeout` bounds each whole request, including the artifact upload.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(timeout)
        .build()
}

/// Split a failed response into its status and body text
pub(crate) async fn failure_details(response: reqwest::Response) -> (u16, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body
    };

    (status.as_u16(), message)
}
