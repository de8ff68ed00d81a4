use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Arg, Command};

use hostview_agent::reporter::IngestClient;
use hostview_agent::{build_payload, resolve_hostname};
use hostview_shared::logging::{set_log_file, set_log_level, LogLevel};
use hostview_shared::{log_agent, log_system, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("hostview-agent")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Collect system info and running processes and post them to the hostview backend")
        .arg(
            Arg::new("endpoint")
                .long("endpoint")
                .help("Ingest URL (e.g. http://127.0.0.1:8000/api/ingest/)")
                .value_name("URL"),
        )
        .arg(
            Arg::new("api_key")
                .long("api-key")
                .help("Value sent in the X-API-Key header")
                .value_name("KEY"),
        )
        .arg(
            Arg::new("hostname")
                .long("hostname")
                .help("Hostname to report (defaults to the OS hostname)")
                .value_name("NAME"),
        )
        .arg(
            Arg::new("interval")
                .short('i')
                .long("interval")
                .help("Seconds between reports (0 sends once and exits)")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Config file path")
                .env("HOSTVIEW_CONFIG")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let explicit_config = matches.get_one::<String>("config").map(PathBuf::from);
    let (mut config, config_path) = Config::load(explicit_config.as_deref())?;

    // コマンドライン引数が最優先
    if let Some(endpoint) = matches.get_one::<String>("endpoint") {
        config.agent.endpoint = endpoint.clone();
    }
    if let Some(api_key) = matches.get_one::<String>("api_key") {
        config.agent.api_key = api_key.clone();
    }
    if let Some(hostname) = matches.get_one::<String>("hostname") {
        config.agent.hostname = Some(hostname.clone());
    }
    if let Some(interval) = matches.get_one::<u64>("interval") {
        config.agent.interval_seconds = *interval;
    }
    if matches.get_flag("verbose") {
        config.logging.verbose = true;
    }

    set_log_level(config.logging.effective_level());
    if let Some(ref log_file) = config.logging.log_file {
        if let Err(e) = set_log_file(log_file) {
            eprintln!("⚠️  {e:#}");
        }
    }

    // 初回起動時はデフォルト設定を書き出す
    match config_path {
        Some(path) => {
            log_system!(info, "Using config {}", path.display());
        }
        None => match Config::default_config_path() {
            Ok(path) => match Config::default().save_to_file(&path) {
                Ok(()) => {
                    log_system!(info, "Wrote default config to {}", path.display());
                }
                Err(e) => {
                    log_system!(warn, "Could not write default config: {e:#}");
                }
            },
            Err(e) => {
                log_system!(warn, "{e:#}");
            }
        },
    }

    let client = IngestClient::new(config.agent.endpoint.clone(), &config.agent.api_key)?;
    let hostname = resolve_hostname(config.agent.hostname.as_deref());
    let interval = config.agent.interval_seconds;

    if config.logging.effective_level() >= LogLevel::Debug {
        println!("🔧 hostview-agent starting...");
        println!("🏷  Hostname: {hostname}");
        println!("📤 Endpoint: {}", client.endpoint());
        println!("⏱  Interval: {interval}s");
    }

    if interval == 0 {
        return report_once(&client, &hostname).await;
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(interval));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // 送信失敗はログに残して次の周期へ
                if let Err(e) = report_once(&client, &hostname).await {
                    log_agent!(error, "{e:#}");
                }
            }

            _ = tokio::signal::ctrl_c() => {
                log_agent!(info, "Interrupted, stopping");
                break;
            }
        }
    }

    Ok(())
}

async fn report_once(client: &IngestClient, hostname: &str) -> Result<()> {
    let payload = build_payload(hostname).await;
    let outcome = client.send(&payload).await?;

    let count = payload.processes.len();
    if let Some(response) = outcome.response {
        log_agent!(
            info,
            "Sent {count} processes for {hostname}: snapshot {} ({})",
            response.snapshot_id,
            response.status
        );
    } else {
        log_agent!(
            info,
            "Sent {count} processes for {hostname}: HTTP {} {}",
            outcome.status,
            outcome.body_preview
        );
    }

    Ok(())
}
