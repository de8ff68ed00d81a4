use chrono::{DateTime, Local, Utc};
use hostview_shared::logging::LogCategory;
use hostview_shared::{log_debug, log_display, log_warn, Host, LatestSnapshot, Pid, SystemInfo};

use crate::client::SnapshotSource;
use crate::error::{FetchError, FetchResult};
use crate::process_tree::ProcessForest;
use crate::render::{
    render_processes, render_system_info, ExpandState, RenderedLine, RenderedView, ViewMode,
};

/// 表示中のタブ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    System,
    #[default]
    Processes,
}

/// 表示中のスナップショット（取得成功のたびに丸ごと置き換える）
#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    pub hostname: String,
    pub system_info: Option<SystemInfo>,
    pub created_at: Option<DateTime<Utc>>,
    pub forest: ProcessForest,
}

impl LoadedSnapshot {
    pub fn from_latest(hostname: &str, latest: LatestSnapshot) -> Self {
        Self {
            hostname: latest.hostname.unwrap_or_else(|| hostname.to_string()),
            system_info: latest.system_info,
            created_at: latest.snapshot.created_at,
            forest: ProcessForest::build(latest.snapshot.processes),
        }
    }

    /// "Updated at ..." 表示（ローカル時刻）
    pub fn updated_at_label(&self) -> Option<String> {
        self.created_at.map(|created_at| {
            let local = created_at.with_timezone(&Local);
            format!("Updated at {}", local.format("%Y-%m-%d %H:%M:%S"))
        })
    }
}

/// ビューアの状態管理
///
/// ホスト一覧・選択中ホスト・スナップショット・表示モード・展開状態を明示的に保持する。
pub struct ViewerSession<S: SnapshotSource> {
    source: S,
    base_url: String,
    hosts: Vec<Host>,
    selected_host: Option<String>,
    current: Option<LoadedSnapshot>,
    view_mode: ViewMode,
    tab: Tab,
    expand_state: ExpandState,
}

impl<S: SnapshotSource> ViewerSession<S> {
    pub fn new(source: S, base_url: impl Into<String>, view_mode: ViewMode) -> Self {
        Self {
            source,
            base_url: base_url.into(),
            hosts: Vec::new(),
            selected_host: None,
            current: None,
            view_mode,
            tab: Tab::default(),
            expand_state: ExpandState::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn selected_host(&self) -> Option<&str> {
        self.selected_host.as_deref()
    }

    pub fn current(&self) -> Option<&LoadedSnapshot> {
        self.current.as_ref()
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn expand_state(&self) -> &ExpandState {
        &self.expand_state
    }

    /// 以降のリクエストで使うベースURLを変更
    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into().trim().to_string();
    }

    /// ホスト一覧を取得し、`preferred` が一覧にあればそれを、無ければ先頭ホストを選択する
    ///
    /// 失敗時はホスト一覧も選択も変更しない。
    pub async fn load_hosts(&mut self, preferred: Option<&str>) -> FetchResult<usize> {
        let hosts = self.source.list_hosts(&self.base_url).await?;

        self.selected_host = preferred
            .and_then(|name| hosts.iter().find(|host| host.hostname == name))
            .or_else(|| hosts.first())
            .map(|host| host.hostname.clone());
        self.hosts = hosts;

        log_display!(debug, "Loaded {} hosts", self.hosts.len());
        Ok(self.hosts.len())
    }

    /// 一覧にあるホストを選択
    pub fn select_host(&mut self, hostname: &str) -> Result<(), String> {
        if self.hosts.iter().any(|host| host.hostname == hostname) {
            self.selected_host = Some(hostname.to_string());
            Ok(())
        } else {
            Err(format!("Unknown host: {hostname}"))
        }
    }

    /// 選択中ホストの最新スナップショットを取得して表示を作り直す
    pub async fn load_latest(&mut self) -> FetchResult<&LoadedSnapshot> {
        let hostname = match self.selected_host.as_deref() {
            Some(hostname) if !hostname.is_empty() => hostname.to_string(),
            _ => return Err(FetchError::missing_hostname()),
        };

        let latest = self.source.latest_snapshot(&self.base_url, &hostname).await?;
        let loaded = LoadedSnapshot::from_latest(&hostname, latest);

        log_debug!(
            LogCategory::Snapshot,
            "Snapshot for {hostname}: {} processes, {} roots",
            loaded.forest.len(),
            loaded.forest.roots().len()
        );
        let detached = loaded.forest.detached().len();
        if detached > 0 {
            log_warn!(
                LogCategory::Tree,
                "{detached} processes of {hostname} sit in a parent cycle"
            );
        }

        self.expand_state.reset();
        let loaded: &LoadedSnapshot = self.current.insert(loaded);
        Ok(loaded)
    }

    /// 表示モード切替（展開状態は全展開に戻る）
    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
        self.tab = Tab::Processes;
        self.expand_state.reset();
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    /// ツリー上のノードの展開/折りたたみを反転。反転後に展開されていれば true
    pub fn toggle_pid(&mut self, pid: Pid) -> Result<bool, String> {
        if self.view_mode != ViewMode::Tree {
            return Err("Switch to the tree view to expand or collapse processes".to_string());
        }

        let current = self
            .current
            .as_ref()
            .ok_or_else(|| "No snapshot loaded".to_string())?;

        let id = current
            .forest
            .node_for_pid(pid)
            .ok_or_else(|| format!("No process with PID {pid}"))?;

        if !current.forest.node(id).has_children() {
            return Err(format!("Process {pid} has no children"));
        }

        Ok(self.expand_state.toggle(id))
    }

    /// 現在のタブを描画
    pub fn render(&self) -> RenderedView {
        let Some(current) = self.current.as_ref() else {
            return RenderedView {
                lines: vec![RenderedLine {
                    text: "No snapshot loaded".to_string(),
                    toggle: None,
                }],
            };
        };

        match self.tab {
            Tab::System => render_system_info(current.system_info.as_ref()),
            Tab::Processes => render_processes(&current.forest, self.view_mode, &self.expand_state),
        }
    }
}
