//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;

use crate::domain::routing::normalize_prefix;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 上游音频服务
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// 缓存配置
    #[serde(default)]
    pub cache: CacheConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 部署根路径，音频/API 路径都在其下
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_path_prefix() -> String {
    "/".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path_prefix: default_path_prefix(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 上游配置
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// 上游服务基础 URL
    #[serde(default = "default_upstream_url")]
    pub url: String,

    /// 单个请求（含完整下载）的超时时间（秒）
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
}

fn default_upstream_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_upstream_timeout() -> u64 {
    300
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            timeout_secs: default_upstream_timeout(),
        }
    }
}

/// 缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Sled 数据库路径
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// 使用内存存储（重启后丢失）
    #[serde(default)]
    pub in_memory: bool,

    /// 并发下载数
    #[serde(default = "default_max_parallel_download")]
    pub max_parallel_download: usize,

    /// 预取窗口大小
    #[serde(default = "default_cache_ahead_files")]
    pub cache_ahead_files: usize,

    /// 音频缓存配额（字节）
    #[serde(default = "default_audio_cache_limit")]
    pub audio_cache_limit_bytes: u64,

    #[serde(default = "default_audio_namespace")]
    pub audio_namespace: String,

    #[serde(default = "default_api_namespace")]
    pub api_namespace: String,

    /// 静态资源命名空间前缀，完整名称为 `<static_prefix><static_version>`
    #[serde(default = "default_static_prefix")]
    pub static_prefix: String,

    #[serde(default = "default_static_version")]
    pub static_version: String,

    /// 启动时预缓存的静态资源，相对于 `server.path_prefix`
    #[serde(default = "default_static_resources")]
    pub static_resources: Vec<String>,
}

fn default_db_path() -> String {
    "data/cache.sled".to_string()
}

fn default_max_parallel_download() -> usize {
    1
}

fn default_cache_ahead_files() -> usize {
    3
}

fn default_audio_cache_limit() -> u64 {
    512 * 1024 * 1024 // 512 MB
}

fn default_audio_namespace() -> String {
    "audio".to_string()
}

fn default_api_namespace() -> String {
    "api".to_string()
}

fn default_static_prefix() -> String {
    "static-".to_string()
}

fn default_static_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_static_resources() -> Vec<String> {
    [
        "",
        "index.html",
        "global.css",
        "favicon.png",
        "bundle.css",
        "bundle.js",
        "app.webmanifest",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            in_memory: false,
            max_parallel_download: default_max_parallel_download(),
            cache_ahead_files: default_cache_ahead_files(),
            audio_cache_limit_bytes: default_audio_cache_limit(),
            audio_namespace: default_audio_namespace(),
            api_namespace: default_api_namespace(),
            static_prefix: default_static_prefix(),
            static_version: default_static_version(),
            static_resources: default_static_resources(),
        }
    }
}

impl CacheConfig {
    /// 静态资源的绝对路径
    pub fn static_paths(&self, path_prefix: &str) -> Vec<String> {
        let prefix = normalize_prefix(path_prefix);
        self.static_resources
            .iter()
            .map(|r| format!("{}{}", prefix, r.trim_start_matches('/')))
            .collect()
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.addr(), "0.0.0.0:8080");
        assert_eq!(config.cache.max_parallel_download, 1);
        assert_eq!(config.cache.cache_ahead_files, 3);
        assert_eq!(config.cache.audio_namespace, "audio");
    }

    #[test]
    fn test_static_paths_are_under_prefix() {
        let config = CacheConfig {
            static_resources: vec!["".to_string(), "index.html".to_string(), "/bundle.js".to_string()],
            ..Default::default()
        };
        assert_eq!(
            config.static_paths("audioserve"),
            vec!["/audioserve/", "/audioserve/index.html", "/audioserve/bundle.js"]
        );
        assert_eq!(config.static_paths("/")[1], "/index.html");
    }
}
