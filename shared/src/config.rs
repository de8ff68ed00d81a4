use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::logging::LogCategory;

const CONFIG_DIR: &str = ".hostview";
const CONFIG_FILE: &str = "config.toml";

/// メインの設定構造体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// ビューア設定
    #[serde(default)]
    pub viewer: ViewerSettings,

    /// 収集エージェント設定
    #[serde(default)]
    pub agent: AgentSettings,

    /// ログ設定
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// ビューア関連の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerSettings {
    /// スナップショットストアのベースURL（起動時の初期値）
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// 初期表示モード ("table" または "tree")
    #[serde(default = "default_view")]
    pub default_view: String,
}

/// エージェント関連の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// ingest エンドポイント
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// X-API-Key ヘッダーの値
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// 送信間隔（秒）。0 なら1回だけ送信
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,

    /// ホスト名の上書き
    pub hostname: Option<String>,
}

/// ログ関連の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// 詳細ログを有効にするか（level を debug に引き上げる）
    #[serde(default)]
    pub verbose: bool,

    /// ログレベル ("error" / "warn" / "info" / "debug" / "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// ログファイルのパス（未指定なら stderr）
    pub log_file: Option<PathBuf>,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            default_view: default_view(),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: default_api_key(),
            interval_seconds: default_interval_seconds(),
            hostname: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            verbose: false,
            level: default_log_level(),
            log_file: None,
        }
    }
}

// デフォルト値関数
fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_view() -> String {
    "table".to_string()
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8000/api/ingest/".to_string()
}

fn default_api_key() -> String {
    "mysecretkey".to_string()
}

fn default_interval_seconds() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingSettings {
    /// verbose を考慮した実効ログレベル
    pub fn effective_level(&self) -> crate::logging::LogLevel {
        let level = crate::logging::LogLevel::from(self.level.as_str());
        if self.verbose {
            level.max(crate::logging::LogLevel::Debug)
        } else {
            level
        }
    }
}

impl Config {
    /// 設定ファイルから読み込み
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;

        toml::from_str(&text).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// 設定ファイルに保存（親ディレクトリも作る）
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = toml::to_string_pretty(self).context("Cannot serialize config")?;

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create {}", dir.display()))?;
        }

        std::fs::write(path, text).with_context(|| format!("Cannot write {}", path.display()))
    }

    /// 初回起動時に書き出す場所（~/.hostview/config.toml）
    pub fn default_config_path() -> Result<PathBuf> {
        let home = home::home_dir().context("Home directory is unknown")?;
        Ok(home.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// 設定ファイルの探索順
    ///
    /// カレントの `.hostview/`、ホームの `.hostview/`、XDG設定ディレクトリの順。
    pub fn config_path_candidates() -> Vec<PathBuf> {
        let home = home::home_dir();
        let xdg_dir = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| home.as_ref().map(|home| home.join(".config")));

        let mut candidates: Vec<PathBuf> = std::env::current_dir()
            .ok()
            .into_iter()
            .chain(home)
            .map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
            .collect();
        candidates.extend(xdg_dir.map(|dir| dir.join("hostview").join(CONFIG_FILE)));
        candidates
    }

    /// 最初に見つかった設定ファイルを読み込む
    pub fn load_auto() -> Result<Option<(Self, PathBuf)>> {
        Self::config_path_candidates()
            .into_iter()
            .find(|path| path.is_file())
            .map(|path| Self::from_file(&path).map(|config| (config, path)))
            .transpose()
    }

    /// 明示パスがあればそれを、なければ自動検出、どちらも無ければデフォルト
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let (mut config, path) = match explicit {
            Some(path) => (Self::from_file(path)?, Some(path.to_path_buf())),
            None => match Self::load_auto()? {
                Some((config, path)) => (config, Some(path)),
                None => (Self::default(), None),
            },
        };
        config.apply_env_overrides();
        Ok((config, path))
    }

    /// 環境変数で設定を上書き
    pub fn apply_env_overrides(&mut self) {
        // ビューア設定
        if let Ok(base_url) = std::env::var("HOSTVIEW_BASE_URL") {
            self.viewer.base_url = base_url;
        }

        if let Ok(view) = std::env::var("HOSTVIEW_VIEW") {
            self.viewer.default_view = view;
        }

        // エージェント設定
        if let Ok(endpoint) = std::env::var("HOSTVIEW_ENDPOINT") {
            self.agent.endpoint = endpoint;
        }

        if let Ok(api_key) = std::env::var("HOSTVIEW_API_KEY") {
            self.agent.api_key = api_key;
        }

        if let Ok(interval) = std::env::var("HOSTVIEW_INTERVAL") {
            match interval.trim().parse() {
                Ok(seconds) => self.agent.interval_seconds = seconds,
                Err(_) => {
                    crate::log_warn!(
                        LogCategory::Config,
                        "Ignoring HOSTVIEW_INTERVAL={interval:?}: not a number of seconds"
                    );
                }
            }
        }

        if let Ok(hostname) = std::env::var("HOSTVIEW_HOSTNAME") {
            self.agent.hostname = Some(hostname);
        }

        // ログ設定
        if let Ok(verbose) = std::env::var("HOSTVIEW_VERBOSE") {
            self.logging.verbose = verbose == "1" || verbose.to_lowercase() == "true";
        }

        if let Ok(level) = std::env::var("HOSTVIEW_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(log_file) = std::env::var("HOSTVIEW_LOG_FILE") {
            self.logging.log_file = Some(PathBuf::from(log_file));
        }
    }

    /// 設定のサンプルを生成
    pub fn sample() -> Self {
        let mut config = Self::default();

        config.viewer.base_url = "http://127.0.0.1:8000".to_string();
        config.viewer.default_view = "tree".to_string();

        config.agent.interval_seconds = 30;
        config.agent.hostname = Some("web-01".to_string());

        config.logging.level = "info".to_string();
        config.logging.log_file = Some(PathBuf::from("/tmp/hostview.log"));

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.viewer.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.viewer.default_view, "table");
        assert_eq!(config.agent.endpoint, "http://127.0.0.1:8000/api/ingest/");
        assert_eq!(config.agent.api_key, "mysecretkey");
        assert_eq!(config.agent.interval_seconds, 30);
        assert!(!config.logging.verbose);
        assert_eq!(config.logging.effective_level(), LogLevel::Info);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::sample();
        let toml_str = toml::to_string_pretty(&config).unwrap();

        assert!(toml_str.contains("[viewer]"));
        assert!(toml_str.contains("[agent]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
[viewer]
base_url = "http://monitor.internal:8080"

[agent]
interval_seconds = 0

[logging]
verbose = true
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.viewer.base_url, "http://monitor.internal:8080");
        // 省略されたキーはデフォルト
        assert_eq!(config.viewer.default_view, "table");
        assert_eq!(config.agent.interval_seconds, 0);
        assert_eq!(config.agent.api_key, "mysecretkey");
        assert_eq!(config.logging.effective_level(), LogLevel::Debug);
    }

    #[test]
    fn test_save_creates_parent_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let sample = Config::sample();
        sample.save_to_file(&path).unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.viewer.base_url, sample.viewer.base_url);
        assert_eq!(reloaded.viewer.default_view, "tree");
        assert_eq!(reloaded.agent.hostname.as_deref(), Some("web-01"));
        assert_eq!(reloaded.logging.log_file, sample.logging.log_file);

        // 明示パスの読み込みはパスも返す
        let (explicit, found) = Config::load(Some(&path)).unwrap();
        assert_eq!(found.as_deref(), Some(path.as_path()));
        assert_eq!(explicit.agent.interval_seconds, 30);
    }

    #[test]
    fn test_candidates_share_file_name() {
        let candidates = Config::config_path_candidates();
        assert!(!candidates.is_empty());
        assert!(candidates
            .iter()
            .all(|path| path.file_name() == Some(std::ffi::OsStr::new(CONFIG_FILE))));
    }

    #[test]
    fn test_invalid_config_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "[viewer\nbase_url = 1").unwrap();

        let err = Config::from_file(&config_path).unwrap_err();
        assert!(err.to_string().starts_with("Invalid config in"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();

        std::env::set_var("HOSTVIEW_BASE_URL", "http://10.0.0.5:8000");
        std::env::set_var("HOSTVIEW_INTERVAL", "not-a-number");
        std::env::set_var("HOSTVIEW_VERBOSE", "true");

        config.apply_env_overrides();

        assert_eq!(config.viewer.base_url, "http://10.0.0.5:8000");
        // 数値にならない値は無視
        assert_eq!(config.agent.interval_seconds, 30);
        assert!(config.logging.verbose);

        std::env::remove_var("HOSTVIEW_BASE_URL");
        std::env::remove_var("HOSTVIEW_INTERVAL");
        std::env::remove_var("HOSTVIEW_VERBOSE");
    }

    #[test]
    fn test_effective_level_keeps_trace() {
        let logging = LoggingSettings {
            verbose: true,
            level: "trace".to_string(),
            log_file: None,
        };
        assert_eq!(logging.effective_level(), LogLevel::Trace);
    }
}
