// ホスト選択 → 取得 → ツリー構築 → 描画 の一連の流れ

mod common;

use common::{
    chain_processes, hosts_body, latest_body, latest_request_count, mount_hosts, mount_hosts_once,
    mount_latest,
};
use hostview_shared::Process;
use hostview_viewer::client::SnapshotClient;
use hostview_viewer::live_ui::{Command, LiveUI};
use hostview_viewer::render::ViewMode;
use hostview_viewer::session::ViewerSession;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn live_ui(server: &MockServer, mode: ViewMode) -> LiveUI<SnapshotClient> {
    let session = ViewerSession::new(SnapshotClient::new(), server.uri(), mode);
    LiveUI::new(session, false)
}

#[tokio::test]
async fn test_chain_scenario_table_and_tree() {
    let server = MockServer::start().await;
    mount_hosts(&server, 200, hosts_body(&["web-01"])).await;
    mount_latest(&server, "web-01", &chain_processes()).await;

    let mut ui = live_ui(&server, ViewMode::Table);
    ui.load_hosts().await;
    assert_eq!(ui.notice(), None);

    // テーブル：3行、入力順
    let table = ui.session().render();
    let rows: Vec<String> = table.texts()[2..]
        .iter()
        .map(|line| line.split('|').nth(1).unwrap().trim().to_string())
        .collect();
    assert_eq!(rows, vec!["init", "sh", "cat"]);

    // ツリー：init ▸ sh ▸ cat
    let _ = ui.execute(Command::View(ViewMode::Tree)).await;
    let forest = &ui.session().current().unwrap().forest;
    assert_eq!(forest.roots().len(), 1);
    let init = forest.node(forest.roots()[0]);
    assert_eq!(init.process.name, "init");
    let sh = forest.node(init.children[0]);
    assert_eq!(sh.process.name, "sh");
    assert_eq!(forest.node(sh.children[0]).process.name, "cat");

    let tree = ui.session().render();
    assert_eq!(tree.texts().len(), 3);
    assert!(tree.texts()[0].starts_with("▼ init"));

    // テーブルに戻すと同じ出力
    let _ = ui.execute(Command::View(ViewMode::Table)).await;
    assert_eq!(ui.session().render(), table);
}

#[tokio::test]
async fn test_hosts_error_preserves_previous_hosts() {
    let server = MockServer::start().await;
    mount_hosts_once(&server, 200, hosts_body(&["db-01", "web-01"])).await;
    mount_hosts(&server, 500, serde_json::json!({"detail": "boom"})).await;
    mount_latest(&server, "db-01", &chain_processes()).await;

    let mut ui = live_ui(&server, ViewMode::Tree);
    ui.load_hosts().await;
    assert_eq!(ui.session().hosts().len(), 2);

    let _ = ui.execute(Command::LoadHosts).await;
    assert_eq!(ui.notice(), Some("Error loading hosts: HTTP 500"));

    // 以前の一覧・選択・スナップショットはそのまま
    assert_eq!(ui.session().hosts().len(), 2);
    assert_eq!(ui.session().selected_host(), Some("db-01"));
    assert!(ui.session().current().is_some());

    let screen = ui.render_screen();
    assert!(screen.contains("[db-01], web-01"));
    assert!(screen.contains("Error loading hosts: HTTP 500"));
}

#[tokio::test]
async fn test_hosts_error_on_first_load_leaves_dropdown_empty() {
    let server = MockServer::start().await;
    mount_hosts(&server, 500, serde_json::json!({})).await;

    let mut ui = live_ui(&server, ViewMode::Table);
    ui.load_hosts().await;

    assert!(ui.session().hosts().is_empty());
    assert_eq!(ui.session().selected_host(), None);
    assert!(ui.render_screen().contains("Hosts: (none)"));

    // 未選択のまま再取得すると検証エラー
    let _ = ui.execute(Command::Refresh).await;
    assert_eq!(ui.notice(), Some("Select hostname"));
}

#[tokio::test]
async fn test_toggle_through_commands() {
    let server = MockServer::start().await;
    let mut processes = chain_processes();
    processes.push(Process::new(4, Some(1), "sshd"));
    mount_hosts(&server, 200, hosts_body(&["web-01"])).await;
    mount_latest(&server, "web-01", &processes).await;

    let mut ui = live_ui(&server, ViewMode::Tree);
    ui.load_hosts().await;
    assert_eq!(ui.session().render().lines.len(), 4);

    let _ = ui.handle_line("toggle 2").await;
    let texts: Vec<String> = ui
        .session()
        .render()
        .texts()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(texts.len(), 3);
    assert!(texts[1].contains("▶ sh"));
    assert!(texts[2].contains("sshd"));

    // 再取得で全展開に戻る
    let _ = ui.handle_line("refresh").await;
    assert_eq!(ui.session().render().lines.len(), 4);

    let _ = ui.handle_line("toggle 3").await;
    assert_eq!(ui.notice(), Some("Process 3 has no children"));
}

#[tokio::test]
async fn test_select_other_host_replaces_snapshot() {
    let server = MockServer::start().await;
    mount_hosts(&server, 200, hosts_body(&["web-01", "db-01"])).await;
    mount_latest(&server, "web-01", &chain_processes()).await;
    mount_latest(&server, "db-01", &[Process::new(5, Some(99), "orphan")]).await;

    let mut ui = live_ui(&server, ViewMode::Tree);
    ui.load_hosts().await;
    assert_eq!(ui.session().current().unwrap().forest.len(), 3);

    let _ = ui.handle_line("select db-01").await;
    let current = ui.session().current().unwrap();
    assert_eq!(current.hostname, "db-01");
    assert_eq!(current.forest.len(), 1);
    assert_eq!(current.forest.roots().len(), 1);
    assert!(ui.render_screen().contains("orphan (PID: 5)"));
}

#[tokio::test]
async fn test_quit_command() {
    let server = MockServer::start().await;
    let mut ui = live_ui(&server, ViewMode::Table);
    assert!(ui.handle_line("quit").await.is_break());
    assert!(ui.handle_line("help").await.is_continue());
    assert!(ui.notice().unwrap().starts_with("Commands:"));
}

#[tokio::test]
async fn test_preferred_host_is_fetched_once() {
    let server = MockServer::start().await;
    mount_hosts(&server, 200, hosts_body(&["web-01", "db-01"])).await;
    mount_latest(&server, "web-01", &chain_processes()).await;
    mount_latest(&server, "db-01", &[Process::new(10, None, "postgres")]).await;

    let mut ui = live_ui(&server, ViewMode::Table);
    ui.load_hosts_preferring(Some("db-01")).await;

    assert_eq!(ui.notice(), None);
    assert_eq!(ui.session().selected_host(), Some("db-01"));
    assert_eq!(ui.session().current().unwrap().hostname, "db-01");
    assert_eq!(latest_request_count(&server).await, 1);
}

#[tokio::test]
async fn test_preferred_host_keeps_hosts_error() {
    let server = MockServer::start().await;
    mount_hosts(&server, 500, serde_json::json!({"detail": "boom"})).await;

    let mut ui = live_ui(&server, ViewMode::Table);
    ui.load_hosts_preferring(Some("web-01")).await;

    // 一覧取得の失敗がそのまま見える
    assert_eq!(ui.notice(), Some("Error loading hosts: HTTP 500"));
    assert!(ui.session().current().is_none());
    assert_eq!(latest_request_count(&server).await, 0);
}

#[tokio::test]
async fn test_unlisted_preferred_host_falls_back_to_first() {
    let server = MockServer::start().await;
    mount_hosts(&server, 200, hosts_body(&["web-01"])).await;
    mount_latest(&server, "web-01", &chain_processes()).await;

    let mut ui = live_ui(&server, ViewMode::Table);
    ui.load_hosts_preferring(Some("gone-01")).await;

    assert_eq!(ui.session().selected_host(), Some("web-01"));
    assert!(ui.session().current().is_some());
    assert_eq!(ui.notice(), Some("Unknown host: gone-01"));
}

#[tokio::test]
async fn test_timestamp_without_offset_still_shows_processes() {
    let server = MockServer::start().await;
    mount_hosts(&server, 200, hosts_body(&["web-01"])).await;
    let mut body = latest_body("web-01", &chain_processes());
    body["snapshot"]["created_at"] = serde_json::json!("2025-03-01T10:15:30.123456");
    Mock::given(method("GET"))
        .and(path("/api/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let mut ui = live_ui(&server, ViewMode::Table);
    ui.load_hosts().await;

    assert_eq!(ui.notice(), None);
    let current = ui.session().current().unwrap();
    assert_eq!(current.forest.len(), 3);
    assert!(current.updated_at_label().is_some());
}

#[tokio::test]
async fn test_control_characters_never_reach_the_screen() {
    let server = MockServer::start().await;
    mount_hosts(&server, 200, hosts_body(&["web\u{1b}[2J-01"])).await;
    mount_latest(
        &server,
        "web\u{1b}[2J-01",
        &[Process::new(1, None, "evil\u{1b}[2J\u{1b}]0;pwned\u{7}")],
    )
    .await;

    let mut ui = live_ui(&server, ViewMode::Tree);
    ui.load_hosts().await;
    assert!(ui.session().current().is_some());

    for tab in ["processes", "table", "system"] {
        let _ = ui.handle_line(tab).await;
        let screen = ui.render_screen();
        assert!(!screen.contains('\u{1b}'), "{tab}: {screen:?}");
        assert!(!screen.contains('\u{7}'));
    }
}
