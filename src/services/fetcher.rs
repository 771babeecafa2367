// src/services/fetcher.rs

//! Page fetching with retry, backoff, and header fallback.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Certificate, Client, Proxy, StatusCode};

use crate::error::{AppError, Result};
use crate::models::{Config, FetchConfig};

/// Statuses treated as transient and retried with backoff.
const RETRY_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Maximum retries per request after the initial attempt.
const MAX_RETRIES: u32 = 3;

/// Base backoff delay, doubled per retry.
const BACKOFF_BASE_MS: u64 = 500;

/// Source of the target page's markup.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the raw markup of the target page.
    async fn fetch(&self) -> Result<String>;
}

/// HTTP fetcher for the watched page.
pub struct PageFetcher {
    client: Client,
    target_url: String,
    retry_on_403: bool,
    fallback_headers: HeaderMap,
}

impl PageFetcher {
    /// Build a fetcher with the configured session headers, proxies, and
    /// TLS verification mode.
    pub fn new(config: &Config) -> Result<Self> {
        let fetch = &config.fetch;

        let mut builder = Client::builder()
            .default_headers(session_headers(fetch)?)
            .timeout(Duration::from_secs(fetch.timeout_secs));

        // A custom CA bundle takes precedence over the verify on/off flag.
        if let Some(path) = &fetch.ca_bundle_path {
            let pem = std::fs::read(path)?;
            builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
        } else if !fetch.verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(proxy) = &fetch.http_proxy {
            builder = builder.proxy(Proxy::http(proxy)?);
        }
        if let Some(proxy) = &fetch.https_proxy {
            builder = builder.proxy(Proxy::https(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            target_url: config.target_url.clone(),
            retry_on_403: fetch.retry_on_403,
            fallback_headers: fallback_headers(fetch)?,
        })
    }

    /// GET the target with bounded retry and exponential backoff on
    /// transport errors and transient statuses. At exhaustion the last
    /// response (or error) is returned as-is for the caller to judge.
    async fn get_with_backoff(&self, headers: Option<&HeaderMap>) -> Result<reqwest::Response> {
        let mut attempt: u32 = 0;
        loop {
            let mut request = self.client.get(&self.target_url);
            if let Some(headers) = headers {
                request = request.headers(headers.clone());
            }

            let result = request.send().await;
            let transient = match &result {
                Ok(response) => RETRY_STATUSES.contains(&response.status()),
                Err(_) => true,
            };

            if !transient || attempt == MAX_RETRIES {
                return result.map_err(AppError::from);
            }

            match &result {
                Ok(response) => log::warn!(
                    "Transient status {} from {}, retry {}/{}",
                    response.status(),
                    self.target_url,
                    attempt + 1,
                    MAX_RETRIES
                ),
                Err(error) => log::warn!(
                    "Request to {} failed ({}), retry {}/{}",
                    self.target_url,
                    error,
                    attempt + 1,
                    MAX_RETRIES
                ),
            }

            attempt += 1;
            let backoff = Duration::from_millis(BACKOFF_BASE_MS * (1u64 << (attempt - 1)));
            tokio::time::sleep(backoff).await;
        }
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    async fn fetch(&self) -> Result<String> {
        let mut response = self.get_with_backoff(None).await?;

        if response.status() == StatusCode::FORBIDDEN && self.retry_on_403 {
            log::warn!("Received 403, retrying with fallback headers");
            response = self.get_with_backoff(Some(&self.fallback_headers)).await?;
        }

        if !response.status().is_success() {
            return Err(AppError::fetch(
                &self.target_url,
                response.status().as_u16(),
            ));
        }

        Ok(response.text().await?)
    }
}

/// Browser-like header set applied to every request.
fn session_headers(fetch: &FetchConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, header_value(&fetch.user_agent)?);
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header_value(&fetch.accept_language)?,
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    if let Some(referer) = &fetch.referer {
        headers.insert(header::REFERER, header_value(referer)?);
    }
    if let Some(cookie) = &fetch.cookie {
        headers.insert(header::COOKIE, header_value(cookie)?);
    }
    Ok(headers)
}

/// Alternate header set tried once when the default set draws a 403.
fn fallback_headers(fetch: &FetchConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, header_value(&fetch.user_agent)?);
    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header_value(&fetch.accept_language)?,
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::config(format!("invalid header value '{value}': {e}")))
}
