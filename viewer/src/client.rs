use async_trait::async_trait;
use hostview_shared::{log_http, Host, HostList, LatestSnapshot};
use serde::de::DeserializeOwned;

use crate::error::{FetchError, FetchResult};

/// スナップショットストアの読み取り口
///
/// ベースURLは呼び出しごとに渡す（UI上の現在値をそのまま使う）。
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// 監視対象ホスト一覧を取得
    async fn list_hosts(&self, base_url: &str) -> FetchResult<Vec<Host>>;

    /// 指定ホストの最新スナップショットを取得
    async fn latest_snapshot(&self, base_url: &str, hostname: &str)
        -> FetchResult<LatestSnapshot>;
}

/// reqwest による HTTP 実装。キャッシュもリトライもしない
#[derive(Debug, Clone, Default)]
pub struct SnapshotClient {
    http: reqwest::Client,
}

impl SnapshotClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> FetchResult<T> {
        log_http!(debug, "GET {url} {query:?}");

        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            log_http!(debug, "GET {url} -> {status}");
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SnapshotSource for SnapshotClient {
    async fn list_hosts(&self, base_url: &str) -> FetchResult<Vec<Host>> {
        let url = endpoint(base_url, "/api/hosts/");
        let list: HostList = self.get_json(&url, &[]).await?;
        Ok(list.hosts)
    }

    async fn latest_snapshot(
        &self,
        base_url: &str,
        hostname: &str,
    ) -> FetchResult<LatestSnapshot> {
        if hostname.is_empty() {
            return Err(FetchError::missing_hostname());
        }

        let url = endpoint(base_url, "/api/latest");
        self.get_json(&url, &[("hostname", hostname)]).await
    }
}

/// ベースURLとパスを連結（前後の空白と末尾の / は落とす）
pub fn endpoint(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    format!("{base}{path}")
}
