use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::store::{DEFAULT_MIME_TYPE, DEFAULT_NAMESPACE};
use crate::view::VISIBLE_ROWS;

/// 設定ファイルの内容
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub view: ViewConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// ストアファイルのパス（未指定ならデータディレクトリ）
    pub path: Option<PathBuf>,
    pub namespace: String,
    /// 合計サイズの上限（バイト）
    pub quota_bytes: Option<usize>,
    /// 保存中マーカーを書くかどうか
    pub intent_marker: bool,
    pub mime_type: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            // ブラウザの localStorage と同程度
            quota_bytes: Some(5 * 1024 * 1024),
            intent_marker: false,
            mime_type: DEFAULT_MIME_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    pub visible_rows: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            visible_rows: VISIBLE_ROWS,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// tracing の EnvFilter 書式
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// TOML文字列から読み込み
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// ストアファイルのパス
    pub fn store_path(&self) -> PathBuf {
        self.store
            .path
            .as_deref()
            .map(expand_tilde)
            .unwrap_or_else(|| data_dir().join("store.json"))
    }

    /// ログファイルのパス
    pub fn log_path(&self) -> PathBuf {
        self.log
            .file
            .as_deref()
            .map(expand_tilde)
            .unwrap_or_else(|| data_dir().join("hexvault.log"))
    }
}

/// 候補パスから最初に見つかった設定を読み込む（なければ既定値）
pub fn load_config() -> Result<Config> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    candidates.push(PathBuf::from("hexvault.toml"));
    candidates.push(PathBuf::from(".hexvault.toml"));
    if let Ok(home) = std::env::var("HOME") {
        candidates.push(PathBuf::from(home).join(".config/hexvault/config.toml"));
    }

    for path in candidates {
        if !path.exists() {
            continue;
        }
        return load_config_from(&path);
    }
    Ok(Config::default())
}

/// 指定パスの設定を読み込む
pub fn load_config_from(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    Config::from_toml(&content).with_context(|| format!("parsing config {}", path.display()))
}

/// チルダ展開
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

fn data_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".local/share/hexvault"),
        None => PathBuf::from("."),
    }
}
