//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `SOUNDCACHE_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `SOUNDCACHE_SERVER__PORT=8080`
/// - `SOUNDCACHE_UPSTREAM__URL=http://audioserve:3000`
/// - `SOUNDCACHE_CACHE__AUDIO_CACHE_LIMIT_BYTES=1073741824`
/// - `SOUNDCACHE_CACHE__STATIC_RESOURCES=index.html,bundle.js`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）；static_resources 的默认列表由 serde 提供
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("server.path_prefix", "/")?
        .set_default("upstream.url", "http://localhost:3000")?
        .set_default("upstream.timeout_secs", 300)?
        .set_default("cache.db_path", "data/cache.sled")?
        .set_default("cache.in_memory", false)?
        .set_default("cache.max_parallel_download", 1)?
        .set_default("cache.cache_ahead_files", 3)?
        .set_default("cache.audio_cache_limit_bytes", 512_u64 * 1024 * 1024)?
        .set_default("cache.audio_namespace", "audio")?
        .set_default("cache.api_namespace", "api")?
        .set_default("cache.static_prefix", "static-")?
        .set_default("cache.static_version", env!("CARGO_PKG_VERSION"))?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 注意: 环境变量名会被转换为小写
    builder = builder.add_source(
        Environment::with_prefix("SOUNDCACHE")
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("cache.static_resources")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.upstream.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "Upstream URL cannot be empty".to_string(),
        ));
    }

    if url::Url::parse(&config.upstream.url).is_err() {
        return Err(ConfigError::ValidationError(format!(
            "Upstream URL is invalid: {}",
            config.upstream.url
        )));
    }

    if config.upstream.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Upstream timeout cannot be 0".to_string(),
        ));
    }

    if config.cache.max_parallel_download == 0 {
        return Err(ConfigError::ValidationError(
            "max_parallel_download must be at least 1".to_string(),
        ));
    }

    if config.cache.audio_cache_limit_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "Audio cache limit cannot be 0".to_string(),
        ));
    }

    if !config.cache.in_memory && config.cache.db_path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Cache db_path cannot be empty".to_string(),
        ));
    }

    let namespaces = [&config.cache.audio_namespace, &config.cache.api_namespace];
    if namespaces
        .iter()
        .any(|ns| ns.is_empty() || ns.starts_with(config.cache.static_prefix.as_str()))
    {
        return Err(ConfigError::ValidationError(
            "Audio/API namespaces must be non-empty and must not use the static prefix".to_string(),
        ));
    }

    if config.cache.audio_namespace == config.cache.api_namespace {
        return Err(ConfigError::ValidationError(
            "Audio and API namespaces must differ".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    tracing::info!("Path Prefix: {}", config.server.path_prefix);
    tracing::info!("Upstream: {}", config.upstream.url);
    tracing::info!("Upstream Timeout: {}s", config.upstream.timeout_secs);
    if config.cache.in_memory {
        tracing::info!("Cache Store: in-memory");
    } else {
        tracing::info!("Cache Store: {}", config.cache.db_path);
    }
    tracing::info!("Max Parallel Download: {}", config.cache.max_parallel_download);
    tracing::info!("Cache Ahead Files: {}", config.cache.cache_ahead_files);
    tracing::info!("Audio Cache Limit: {} bytes", config.cache.audio_cache_limit_bytes);
    tracing::info!(
        "Static Cache: {}{} ({} resources)",
        config.cache.static_prefix,
        config.cache.static_version,
        config.cache.static_resources.len()
    );
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_bad_upstream() {
        let mut config = AppConfig::default();
        config.upstream.url = String::new();
        assert!(validate_config(&config).is_err());

        config.upstream.url = "not a url".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_parallel() {
        let mut config = AppConfig::default();
        config.cache.max_parallel_download = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_namespace_clash() {
        let mut config = AppConfig::default();
        config.cache.api_namespace = "audio".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.cache.audio_namespace = "static-audio".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("soundcache.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9000
path_prefix = "/audioserve/"

[upstream]
url = "http://audioserve:3000"

[cache]
in_memory = true
max_parallel_download = 2
static_resources = ["index.html"]
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(&path)).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.upstream.url, "http://audioserve:3000");
        assert!(config.cache.in_memory);
        assert_eq!(config.cache.max_parallel_download, 2);
        assert_eq!(config.cache.cache_ahead_files, 3);
        assert_eq!(config.cache.static_resources, vec!["index.html"]);
    }
}
