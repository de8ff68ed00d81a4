pub mod collector;
pub mod reporter;

use chrono::Utc;
use hostview_shared::IngestPayload;

/// ホスト名を決める（設定値 → OSのホスト名 → "unknown"）
pub fn resolve_hostname(configured: Option<&str>) -> String {
    configured
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(sysinfo::System::host_name)
        .unwrap_or_else(|| "unknown".to_string())
}

/// 1回分のスナップショットを収集
pub async fn build_payload(hostname: &str) -> IngestPayload {
    let system_info = collector::collect_system_info();
    let processes = collector::collect_processes().await;

    IngestPayload {
        hostname: hostname.to_string(),
        reported_at: Utc::now(),
        system_info: Some(system_info),
        processes,
    }
}
