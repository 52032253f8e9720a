//! Write-key verification
//!
//! Synchronous side utility, separate from the delivery pipeline: asks
//! the API who a write key belongs to, so misconfigured credentials can
//! fail fast at startup instead of silently producing rejected batches.

use serde::Deserialize;

use crate::config::{Config, DEFAULT_API_HOST};
use crate::error::{Error, Result};
use crate::transmission::http;

#[derive(Debug, Deserialize)]
struct TeamSlug {
    team_slug: String,
}

/// Verify the configured write key against `GET /1/team_slug`.
///
/// Returns the team slug the key belongs to.
///
/// # Errors
///
/// - [`Error::MissingWriteKey`] if no write key is configured
/// - [`Error::InvalidWriteKey`] if the server rejects the key (HTTP 401)
/// - [`Error::Verify`] for any other non-2xx status
/// - [`Error::Transport`] / [`Error::Parse`] for network and body problems
pub async fn verify_write_key(config: &Config) -> Result<String> {
    if config.write_key.is_empty() {
        return Err(Error::MissingWriteKey);
    }

    let api_host = if config.api_host.is_empty() {
        DEFAULT_API_HOST
    } else {
        &config.api_host
    };

    let mut url =
        reqwest::Url::parse(api_host).map_err(|err| Error::InvalidUrl(err.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| Error::InvalidUrl("api host cannot be a base url".into()))?
        .pop_if_empty()
        .extend(["1", "team_slug"]);

    let client = config
        .http_client
        .clone()
        .unwrap_or_else(http::default_client);

    let response = client
        .get(url)
        .header("X-Honeycomb-Team", config.write_key.as_str())
        .header(
            reqwest::header::USER_AGENT,
            http::build_user_agent(&config.user_agent_addition),
        )
        .send()
        .await
        .map_err(|err| Error::Transport(err.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| Error::Transport(err.to_string()))?;

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::InvalidWriteKey);
    }
    if !status.is_success() {
        return Err(Error::Verify {
            status: status.as_u16(),
            body,
        });
    }

    let parsed: TeamSlug =
        serde_json::from_str(&body).map_err(|err| Error::Parse(err.to_string()))?;

    tracing::debug!(team_slug = %parsed.team_slug, "write key verified");
    Ok(parsed.team_slug)
}
