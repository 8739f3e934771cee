use anyhow::Result;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!("dotgit/", env!("CARGO_PKG_VERSION"));

/// Build the blocking HTTP client shared by every fetch of a run.
///
/// Redirects follow reqwest's default policy. `timeout` applies per request.
pub fn http_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(USER_AGENT, HeaderValue::from_str(user_agent)?);
    let client = Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()?;
    Ok(client)
}
