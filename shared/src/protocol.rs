use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// プロセスID（バックエンドの IntegerField に合わせて i64）
pub type Pid = i64;

/// 監視対象ホスト
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub hostname: String,
}

/// `GET /api/hosts/` のレスポンス
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostList {
    #[serde(default)]
    pub hosts: Vec<Host>,
}

/// スナップショット内の1プロセス
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub pid: Pid,
    /// 0 または None は「親不明」
    #[serde(default)]
    pub ppid: Option<Pid>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub memory_mb: Option<f64>,
    #[serde(default)]
    pub cpu_percent: Option<f64>,
}

impl Process {
    pub fn new(pid: Pid, ppid: Option<Pid>, name: impl Into<String>) -> Self {
        Self {
            pid,
            ppid,
            name: name.into(),
            memory_mb: None,
            cpu_percent: None,
        }
    }

    /// 親として解決を試みるべき ppid（0 と自分自身は除外）
    ///
    /// `ppid == pid` は自分の子として消えるのではなく、意図的にルートとして扱う。
    pub fn parent_pid(&self) -> Option<Pid> {
        match self.ppid {
            Some(ppid) if ppid != 0 && ppid != self.pid => Some(ppid),
            _ => None,
        }
    }
}

/// ホストのハードウェア/リソース情報（表示専用）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub processor: Option<String>,
    #[serde(default)]
    pub cores: Option<u32>,
    #[serde(default)]
    pub threads: Option<u32>,
    #[serde(default)]
    pub ram_gb: Option<f64>,
    #[serde(default)]
    pub used_ram_gb: Option<f64>,
    #[serde(default)]
    pub available_ram_gb: Option<f64>,
    #[serde(default)]
    pub storage_free_gb: Option<f64>,
    #[serde(default)]
    pub storage_total_gb: Option<f64>,
    #[serde(default)]
    pub storage_used_gb: Option<f64>,
}

/// タイムスタンプ文字列を読む
///
/// RFC 3339 を優先し、オフセット無しの ISO-8601 は UTC とみなす。読めなければ None。
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .into_iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

/// 表示専用の時刻。形式が崩れていてもレスポンス全体は捨てない
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(serde_json::Value::as_str).and_then(parse_timestamp))
}

/// ある時点のプロセス一覧
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processes: Vec<Process>,
}

/// `GET /api/latest?hostname=...` のレスポンス
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestSnapshot {
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub system_info: Option<SystemInfo>,
    pub snapshot: Snapshot,
}

/// agent → backend (`POST /api/ingest/`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestPayload {
    pub hostname: String,
    pub reported_at: DateTime<Utc>,
    pub system_info: Option<SystemInfo>,
    pub processes: Vec<Process>,
}

/// backend → agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub status: String,
    pub snapshot_id: i64,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}
