use std::path::PathBuf;

use clap::Parser;
use hostview_shared::logging::{set_log_file, set_log_level};
use hostview_shared::{log_system, Config};

use hostview_viewer::client::SnapshotClient;
use hostview_viewer::live_ui::LiveUI;
use hostview_viewer::render::ViewMode;
use hostview_viewer::session::ViewerSession;

#[derive(Parser)]
#[command(name = "hostview")]
#[command(about = "Browse the latest process snapshot of monitored hosts")]
struct Cli {
    /// Snapshot store base URL (e.g. http://127.0.0.1:8000)
    #[arg(long)]
    base_url: Option<String>,

    /// Host to show first (defaults to the first registered host)
    #[arg(long)]
    host: Option<String>,

    /// Initial process view: table or tree
    #[arg(long)]
    view: Option<ViewMode>,

    /// Config file path (default: auto-detect ~/.hostview/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print a single snapshot and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut config, config_path) = Config::load(cli.config.as_deref())?;
    config.logging.verbose |= cli.verbose;
    let verbose = config.logging.verbose;

    set_log_level(config.logging.effective_level());
    if let Some(ref log_file) = config.logging.log_file {
        set_log_file(log_file)?;
    }
    if let Some(path) = config_path {
        log_system!(info, "Loaded config from {}", path.display());
    }

    let base_url = cli.base_url.unwrap_or(config.viewer.base_url);
    let view_mode = match cli.view {
        Some(mode) => mode,
        None => config.viewer.default_view.parse().unwrap_or_else(|e| {
            log_system!(warn, "{e}, falling back to table");
            ViewMode::Table
        }),
    };

    let session = ViewerSession::new(SnapshotClient::new(), base_url, view_mode);
    let mut live_ui = LiveUI::new(session, verbose);

    // 初期表示：ホスト一覧 → 指定ホスト（なければ先頭）
    live_ui.load_hosts_preferring(cli.host.as_deref()).await;

    if cli.once {
        print!("{}", live_ui.render_screen());
        return Ok(());
    }

    live_ui.run().await
}
