use std::io::Write;
use std::ops::ControlFlow;

use hostview_shared::{log_display, Pid};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::client::SnapshotSource;
use crate::error::FetchError;
use crate::render::ViewMode;
use crate::session::{Tab, ViewerSession};
use crate::unicode_utils::{sanitize_display, truncate_str};

/// ターミナル幅を取得（デフォルト80）
fn get_terminal_width() -> usize {
    if let Some((width, _)) = term_size::dimensions() {
        width.max(40) // 最低40文字は確保
    } else {
        80 // デフォルト幅
    }
}

const HELP_TEXT: &str = "hosts | select <host> | refresh | table | tree | toggle <pid> | system | processes | url <base> | help | quit";

/// ユーザー入力コマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    LoadHosts,
    Select(String),
    Refresh,
    View(ViewMode),
    Toggle(Pid),
    Tab(Tab),
    SetBaseUrl(String),
    Help,
    Quit,
}

/// 1行の入力をコマンドに変換
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_lowercase().as_str() {
        "hosts" | "h" => Command::LoadHosts,
        "refresh" | "r" => Command::Refresh,
        "table" => Command::View(ViewMode::Table),
        "tree" => Command::View(ViewMode::Tree),
        "system" | "sys" => Command::Tab(Tab::System),
        "processes" | "ps" => Command::Tab(Tab::Processes),
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        "select" | "s" => {
            if rest.is_empty() {
                return Err("Usage: select <hostname>".to_string());
            }
            Command::Select(rest.to_string())
        }
        "toggle" | "t" => {
            let pid = rest
                .parse::<Pid>()
                .map_err(|_| "Usage: toggle <pid>".to_string())?;
            Command::Toggle(pid)
        }
        "url" => {
            if rest.is_empty() {
                return Err("Usage: url <base-url>".to_string());
            }
            Command::SetBaseUrl(rest.to_string())
        }
        "" => return Err("Type a command (help for the list)".to_string()),
        other => return Err(format!("Unknown command: {other}")),
    };

    Ok(command)
}

/// ライブUI管理
///
/// コマンドごとに画面を丸ごと描き直す。自動更新はしない。
pub struct LiveUI<S: SnapshotSource> {
    session: ViewerSession<S>,
    notice: Option<String>,
    verbose: bool,
}

impl<S: SnapshotSource> LiveUI<S> {
    pub fn new(session: ViewerSession<S>, verbose: bool) -> Self {
        Self {
            session,
            notice: None,
            verbose,
        }
    }

    pub fn session(&self) -> &ViewerSession<S> {
        &self.session
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// ホスト一覧 → 先頭ホストのスナップショット
    pub async fn load_hosts(&mut self) {
        self.load_hosts_preferring(None).await;
    }

    /// ホスト一覧 → `preferred`（一覧に無ければ先頭）のスナップショットを1回だけ取得
    pub async fn load_hosts_preferring(&mut self, preferred: Option<&str>) {
        match self.session.load_hosts(preferred).await {
            Ok(0) => self.notice = Some("No hosts registered".to_string()),
            Ok(_) => {
                self.load_latest().await;
                if let Some(name) = preferred {
                    if self.notice.is_none() && self.session.selected_host() != Some(name) {
                        self.notice = Some(format!("Unknown host: {name}"));
                    }
                }
            }
            Err(e) => self.notice = Some(format!("Error loading hosts: {e}")),
        }
    }

    /// 選択中ホストのスナップショット再取得
    pub async fn load_latest(&mut self) {
        if let Err(e) = self.session.load_latest().await {
            self.notice = Some(match e {
                FetchError::Validation(message) => message,
                other => format!("Error loading snapshot: {other}"),
            });
        }
    }

    /// コマンド実行
    pub async fn execute(&mut self, command: Command) -> ControlFlow<()> {
        self.notice = None;

        match command {
            Command::LoadHosts => self.load_hosts().await,
            Command::Select(hostname) => match self.session.select_host(&hostname) {
                Ok(()) => self.load_latest().await,
                Err(e) => self.notice = Some(e),
            },
            Command::Refresh => self.load_latest().await,
            Command::View(mode) => self.session.set_view_mode(mode),
            Command::Toggle(pid) => {
                if let Err(e) = self.session.toggle_pid(pid) {
                    self.notice = Some(e);
                }
            }
            Command::Tab(tab) => self.session.set_tab(tab),
            Command::SetBaseUrl(base_url) => {
                self.session.set_base_url(base_url);
                self.load_hosts().await;
            }
            Command::Help => self.notice = Some(format!("Commands: {HELP_TEXT}")),
            Command::Quit => return ControlFlow::Break(()),
        }

        ControlFlow::Continue(())
    }

    /// 入力行を処理
    pub async fn handle_line(&mut self, line: &str) -> ControlFlow<()> {
        match parse_command(line) {
            Ok(command) => {
                log_display!(debug, "Command: {command:?}");
                self.execute(command).await
            }
            Err(e) => {
                self.notice = Some(e);
                ControlFlow::Continue(())
            }
        }
    }

    /// 画面全体の文字列を生成
    pub fn render_screen(&self) -> String {
        let terminal_width = get_terminal_width();
        let mut out = String::new();

        out.push_str("🖥  hostview\n");
        out.push_str(&format!(
            "🌐 Backend: {}\n",
            sanitize_display(self.session.base_url())
        ));

        // ホスト一覧（選択中は [] で囲む）
        let hosts = self.session.hosts();
        if hosts.is_empty() {
            out.push_str("📡 Hosts: (none)\n");
        } else {
            let selected = self.session.selected_host();
            let names: Vec<String> = hosts
                .iter()
                .map(|host| {
                    let name = sanitize_display(&host.hostname);
                    if Some(host.hostname.as_str()) == selected {
                        format!("[{name}]")
                    } else {
                        name.into_owned()
                    }
                })
                .collect();
            let line = format!("📡 Hosts: {}", names.join(", "));
            out.push_str(&truncate_str(&line, terminal_width));
            out.push('\n');
        }

        match self.session.current() {
            Some(current) => {
                let updated = current
                    .updated_at_label()
                    .map(|label| format!(" | {label}"))
                    .unwrap_or_default();
                let count = current.forest.len();
                out.push_str(&format!(
                    "🏷  Host: {}{updated} | {count} processes\n",
                    sanitize_display(&current.hostname)
                ));
            }
            None => out.push_str("🏷  Host: -\n"),
        }

        let tab_label = match self.session.tab() {
            Tab::System => "System".to_string(),
            Tab::Processes => format!("Processes ({})", self.session.view_mode()),
        };
        out.push_str(&format!("📋 {tab_label}\n"));
        out.push_str(&"═".repeat(terminal_width));
        out.push('\n');

        out.push_str(&self.session.render().to_string());

        out.push_str(&"═".repeat(terminal_width));
        out.push('\n');

        if let Some(ref notice) = self.notice {
            out.push_str(&format!("⚠️  {}\n", sanitize_display(notice)));
        }

        if self.verbose {
            let collapsed = self.session.expand_state().collapsed_count();
            out.push_str(&format!("🔍 Collapsed nodes: {collapsed}\n"));
        }

        out.push_str(&format!("⌨️  {HELP_TEXT}\n"));
        out
    }

    /// 画面描画（クリアしてから全体を出力）
    fn draw(&self) {
        print!("\x1b[2J\x1b[H"); // ANSI: 画面クリア + カーソルを左上に移動
        print!("{}", self.render_screen());
        print!("> ");
        let _ = std::io::stdout().flush();
    }

    /// 入力ループ
    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.draw();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break; // stdin closed
                    };
                    if self.handle_line(&line).await.is_break() {
                        break;
                    }
                    self.draw();
                }

                // Ctrl+C 終了
                _ = tokio::signal::ctrl_c() => {
                    break;
                }
            }
        }

        println!("\n👋 Bye");
        Ok(())
    }
}
