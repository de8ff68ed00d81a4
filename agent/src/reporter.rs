use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use hostview_shared::{log_agent, IngestPayload, IngestResponse};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

/// 送信タイムアウト
pub const SEND_TIMEOUT: Duration = Duration::from_secs(20);

/// エラー表示時に含めるレスポンス本文の最大文字数
const BODY_PREVIEW_CHARS: usize = 200;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// 送信結果
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub status: u16,
    pub body_preview: String,
    /// 2xx で JSON として読めた場合のみ
    pub response: Option<IngestResponse>,
}

/// スナップショットをバックエンドへ送るクライアント
pub struct IngestClient {
    http: reqwest::Client,
    endpoint: String,
}

impl IngestClient {
    pub fn new(endpoint: impl Into<String>, api_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if !api_key.is_empty() {
            let value = HeaderValue::from_str(api_key).context("API key is not a valid header value")?;
            headers.insert(API_KEY_HEADER, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(SEND_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint: endpoint.into().trim().to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 1回分を送信。2xx 以外はエラー
    pub async fn send(&self, payload: &IngestPayload) -> Result<SendOutcome> {
        log_agent!(
            debug,
            "POST {} ({} processes)",
            self.endpoint,
            payload.processes.len()
        );

        let response = self
            .http
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.endpoint))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let body_preview: String = body.chars().take(BODY_PREVIEW_CHARS).collect();

        if !status.is_success() {
            return Err(anyhow!("Ingest rejected: HTTP {} {}", status.as_u16(), body_preview));
        }

        Ok(SendOutcome {
            status: status.as_u16(),
            response: serde_json::from_str(&body).ok(),
            body_preview,
        })
    }
}
