// テストフィクスチャとダミーデータ生成
// 統合テストごとに別クレートとしてコンパイルされるため dead_code 警告を抑制。

#![allow(dead_code)]

use hostview_shared::Process;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// init → sh → cat の3段チェーン
pub fn chain_processes() -> Vec<Process> {
    vec![
        Process::new(1, Some(0), "init"),
        Process::new(2, Some(1), "sh"),
        Process::new(3, Some(2), "cat"),
    ]
}

/// `GET /api/hosts/` のボディ
pub fn hosts_body(hostnames: &[&str]) -> Value {
    let hosts: Vec<Value> = hostnames
        .iter()
        .enumerate()
        .map(|(index, hostname)| json!({"id": index + 1, "hostname": hostname}))
        .collect();
    json!({ "hosts": hosts })
}

/// `GET /api/latest` のボディ
pub fn latest_body(hostname: &str, processes: &[Process]) -> Value {
    json!({
        "hostname": hostname,
        "system_info": {
            "name": hostname,
            "os": "Linux 6.8.0 #1 SMP",
            "processor": "x86_64",
            "cores": 4,
            "threads": 8,
            "ram_gb": 16,
            "used_ram_gb": 6,
            "available_ram_gb": 10,
            "storage_free_gb": 120,
            "storage_total_gb": 256,
            "storage_used_gb": 136
        },
        "snapshot": {
            "id": 12,
            "created_at": "2025-03-01T10:15:30.123456Z",
            "processes": processes
        }
    })
}

/// ホスト一覧のモックを登録
pub async fn mount_hosts(server: &MockServer, status: u16, body: Value) {
    Mock::given(method("GET"))
        .and(path("/api/hosts/"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// 1回だけ応答するホスト一覧モックを登録
pub async fn mount_hosts_once(server: &MockServer, status: u16, body: Value) {
    Mock::given(method("GET"))
        .and(path("/api/hosts/"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

/// 最新スナップショットのモックを登録
pub async fn mount_latest(server: &MockServer, hostname: &str, processes: &[Process]) {
    Mock::given(method("GET"))
        .and(path("/api/latest"))
        .and(query_param("hostname", hostname))
        .respond_with(ResponseTemplate::new(200).set_body_json(latest_body(hostname, processes)))
        .mount(server)
        .await;
}

/// 受け取った `GET /api/latest` の回数
pub async fn latest_request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == "/api/latest")
        .count()
}
