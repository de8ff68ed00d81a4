use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use hostview_shared::SystemInfo;

use crate::process_tree::{NodeId, ProcessForest};
use crate::unicode_utils::{display_width, pad_left, pad_right, sanitize_display, truncate_str};

/// 名前列の最大表示幅
const NAME_COLUMN_MAX_WIDTH: usize = 40;

pub const EXPANDED_GLYPH: &str = "▼";
pub const COLLAPSED_GLYPH: &str = "▶";

/// プロセス表示モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Table,
    Tree,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::Table => write!(f, "table"),
            ViewMode::Tree => write!(f, "tree"),
        }
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "table" => Ok(ViewMode::Table),
            "tree" => Ok(ViewMode::Tree),
            other => Err(format!("Unknown view mode: {other} (expected table or tree)")),
        }
    }
}

/// ツリー表示の展開状態（UIローカル）
///
/// 折りたたまれたノードだけを記録する。空なら全ノード展開。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandState {
    collapsed: HashSet<NodeId>,
}

impl ExpandState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        !self.collapsed.contains(&id)
    }

    /// 展開/折りたたみを反転し、反転後に展開されていれば true
    pub fn toggle(&mut self, id: NodeId) -> bool {
        if self.collapsed.remove(&id) {
            true
        } else {
            self.collapsed.insert(id);
            false
        }
    }

    /// 全ノードを展開状態に戻す
    pub fn reset(&mut self) {
        self.collapsed.clear();
    }

    pub fn collapsed_count(&self) -> usize {
        self.collapsed.len()
    }
}

/// 描画済みの1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub text: String,
    /// ツリー表示でトグル可能なノード
    pub toggle: Option<NodeId>,
}

impl RenderedLine {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            toggle: None,
        }
    }
}

/// 描画結果（毎回まるごと作り直す）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedView {
    pub lines: Vec<RenderedLine>,
}

impl RenderedView {
    pub fn texts(&self) -> Vec<&str> {
        self.lines.iter().map(|line| line.text.as_str()).collect()
    }
}

impl fmt::Display for RenderedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line.text)?;
        }
        Ok(())
    }
}

/// プロセス一覧を指定モードで描画
pub fn render_processes(
    forest: &ProcessForest,
    mode: ViewMode,
    expand_state: &ExpandState,
) -> RenderedView {
    match mode {
        ViewMode::Table => render_table(forest),
        ViewMode::Tree => render_tree(forest, expand_state),
    }
}

/// 欠損値は空文字
pub fn format_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn format_text(value: Option<&str>) -> String {
    value.map(|v| sanitize_display(v).into_owned()).unwrap_or_default()
}

fn format_optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// フラットなテーブル（スナップショット順、1始まりの連番）
pub fn render_table(forest: &ProcessForest) -> RenderedView {
    let headers = ["Sr. No", "Name", "Memory Usage (MB)", "CPU Usage (%)", "PPID"];

    let rows: Vec<[String; 5]> = forest
        .processes()
        .enumerate()
        .map(|(index, process)| {
            [
                (index + 1).to_string(),
                truncate_str(&sanitize_display(&process.name), NAME_COLUMN_MAX_WIDTH),
                format_number(process.memory_mb),
                format_number(process.cpu_percent),
                format_optional(process.ppid),
            ]
        })
        .collect();

    let mut widths = headers.map(display_width);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(display_width(cell));
        }
    }

    let format_row = |cells: [&str; 5]| -> String {
        let mut parts = Vec::with_capacity(5);
        for (column, cell) in cells.iter().enumerate() {
            // 名前以外は数値なので右寄せ
            let padded = if column == 1 {
                pad_right(cell, widths[column])
            } else {
                pad_left(cell, widths[column])
            };
            parts.push(padded);
        }
        parts.join(" | ").trim_end().to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(RenderedLine::plain(format_row(headers)));

    let separator_width: usize = widths.iter().sum::<usize>() + 3 * (widths.len() - 1);
    lines.push(RenderedLine::plain("-".repeat(separator_width)));

    for row in &rows {
        let cells = [
            row[0].as_str(),
            row[1].as_str(),
            row[2].as_str(),
            row[3].as_str(),
            row[4].as_str(),
        ];
        lines.push(RenderedLine::plain(format_row(cells)));
    }

    RenderedView { lines }
}

/// 親子ツリー（子を持つノードは展開状態に従う）
pub fn render_tree(forest: &ProcessForest, expand_state: &ExpandState) -> RenderedView {
    if forest.is_empty() {
        return RenderedView {
            lines: vec![RenderedLine::plain("(no processes)")],
        };
    }

    let visible = forest.walk(|id| expand_state.is_expanded(id));

    let mut lines: Vec<RenderedLine> = visible
        .into_iter()
        .map(|(id, depth)| {
            let node = forest.node(id);
            let process = &node.process;
            let glyph = match (node.has_children(), expand_state.is_expanded(id)) {
                (false, _) => " ",
                (true, true) => EXPANDED_GLYPH,
                (true, false) => COLLAPSED_GLYPH,
            };

            let text = format!(
                "{indent}{glyph} {name} (PID: {pid}) CPU: {cpu}% Mem: {mem} MB",
                indent = "  ".repeat(depth),
                name = sanitize_display(&process.name),
                pid = process.pid,
                cpu = format_number(process.cpu_percent),
                mem = format_number(process.memory_mb),
            );

            RenderedLine {
                text,
                toggle: node.has_children().then_some(id),
            }
        })
        .collect();

    let detached = forest.detached().len();
    if detached > 0 {
        lines.push(RenderedLine::plain(format!(
            "({detached} processes in a parent cycle are not shown)"
        )));
    }

    RenderedView { lines }
}

/// システム情報タブ
pub fn render_system_info(system_info: Option<&SystemInfo>) -> RenderedView {
    let default_info = SystemInfo::default();
    let sys = system_info.unwrap_or(&default_info);

    let rows = [
        ("Name", format_text(sys.name.as_deref())),
        ("Operating System", format_text(sys.os.as_deref())),
        ("Processor", format_text(sys.processor.as_deref())),
        ("Number of Cores", format_optional(sys.cores)),
        ("Number of Threads", format_optional(sys.threads)),
        ("RAM (GB)", format_number(sys.ram_gb)),
        ("Used RAM (GB)", format_number(sys.used_ram_gb)),
        ("Available RAM (GB)", format_number(sys.available_ram_gb)),
        ("Storage Free (GB)", format_number(sys.storage_free_gb)),
        ("Storage Total (GB)", format_number(sys.storage_total_gb)),
        ("Storage Used (GB)", format_number(sys.storage_used_gb)),
    ];

    let label_width = rows
        .iter()
        .map(|(label, _)| display_width(label))
        .max()
        .unwrap_or(0);

    let lines = rows
        .iter()
        .map(|(label, value)| {
            let line = format!("{} : {value}", pad_right(label, label_width));
            RenderedLine::plain(line.trim_end())
        })
        .collect();

    RenderedView { lines }
}
