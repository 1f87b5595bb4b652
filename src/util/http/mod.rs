use std::{
    fmt,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::{Lazy, OnceCell};
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::{config::SETTINGS, logging::Logger, util};

pub mod element;
pub mod user_agent;

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

/// An asynchronous trait that provides a method to force convert a reqwest::Response body
/// from Big5 encoding to UTF-8 encoding.
#[async_trait]
pub trait TextForceBig5 {
    async fn text_force_big5(self) -> Result<String>;
}

#[async_trait]
impl TextForceBig5 for Response {
    async fn text_force_big5(self) -> Result<String> {
        util::text::big5_2_utf8(self.bytes().await?.as_ref())
    }
}

/// Returns the reqwest client singleton instance or creates one if it doesn't exist.
fn get_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            // ===== 壓縮 =====
            .brotli(true)
            .gzip(true)
            .zstd(true)
            // ===== 超時設置 =====
            .connect_timeout(Duration::from_secs(8))
            .timeout(Duration::from_secs(20))
            .tcp_nodelay(true)
            .pool_max_idle_per_host(4)
            // ===== Cookie 和重定向 =====
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .referer(true)
            .user_agent(user_agent::gen_random_ua())
            .build()
            .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))
    })
}

/// Performs an HTTP GET request and deserializes the JSON response into the specified type.
pub async fn get_json<RES: DeserializeOwned>(
    url: &str,
    headers: Option<header::HeaderMap>,
) -> Result<RES> {
    let body = get(url, headers).await?;

    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        anyhow!("Error parsing response JSON from {}: {:?} body: {}", url, e, preview)
    })
}

pub async fn get_response(url: &str, headers: Option<header::HeaderMap>) -> Result<Response> {
    send(Method::GET, url, headers, None::<fn(RequestBuilder) -> RequestBuilder>).await
}

/// Performs an HTTP GET request and returns the response as text.
pub async fn get(url: &str, headers: Option<header::HeaderMap>) -> Result<String> {
    get_response(url, headers)
        .await?
        .text()
        .await
        .map_err(|e| anyhow!("Error parsing response text: {:?}", e))
}

/// Performs an HTTP POST request with form data and returns the raw response.
pub async fn post_form(
    url: &str,
    headers: Option<header::HeaderMap>,
    params: &[(&str, String)],
) -> Result<Response> {
    send(
        Method::POST,
        url,
        headers,
        Some(|rb: RequestBuilder| rb.form(params)),
    )
    .await
}

/// Sends an HTTP request once.
///
/// 失敗不重試：交易所的封鎖通常持續數小時，重試只會延長封鎖。
/// 每次請求後固定等待 `SETTINGS.http.request_interval_ms` 毫秒。
async fn send(
    method: Method,
    url: &str,
    headers: Option<header::HeaderMap>,
    body: Option<impl FnOnce(RequestBuilder) -> RequestBuilder>,
) -> Result<Response> {
    let visit_log = format!("{method}:{url}");
    let client = get_client()?;
    let mut rb = client.request(method, url);

    if let Some(h) = headers {
        rb = rb.headers(h);
    }

    if let Some(body_fn) = body {
        rb = body_fn(rb);
    }

    let start = Instant::now();
    let res = rb.send().await;
    let elapsed = start.elapsed().as_millis();

    // 請求延遲，避免被目標網站封禁
    tokio::time::sleep(Duration::from_millis(SETTINGS.http.request_interval_ms)).await;

    let response = match res {
        Ok(response) => response,
        Err(why) => {
            LOGGER.error(format!("{} failed because {:?}. {} ms", visit_log, why, elapsed));
            return Err(anyhow!("Failed to send request to {}: {}", url, why));
        }
    };

    let status = response.status();
    LOGGER.info(format!("{} {} {} ms", visit_log, status, elapsed));

    check_status(url, status)?;

    Ok(response)
}

/// 來源網站因請求過於頻繁而拒絕服務，通常持續數小時
#[derive(Debug)]
pub struct LockedOut {
    pub url: String,
    pub status: StatusCode,
}

impl fmt::Display for LockedOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} refused the request with {} (the provider may have locked out this address)",
            self.url, self.status
        )
    }
}

impl std::error::Error for LockedOut {}

/// 判斷錯誤是否為來源網站的封鎖
pub fn is_locked_out(err: &anyhow::Error) -> bool {
    err.downcast_ref::<LockedOut>().is_some()
}

/// 403/429 視為被來源網站封鎖，其餘非 2xx 一律當作失敗
fn check_status(url: &str, status: StatusCode) -> Result<()> {
    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(LockedOut {
            url: url.to_string(),
            status,
        }
        .into());
    }

    if !status.is_success() {
        return Err(anyhow!("{} responded with {}", url, status));
    }

    Ok(())
}
