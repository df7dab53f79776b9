//! SoundCache - 音频流客户端的离线缓存代理
//!
//! - Domain: cache/, routing, message, exchange
//! - Application: ports, services (audio engine, network-first, static assets, router)
//! - Infrastructure: http, events, persistence, memory, adapters

use std::sync::Arc;

use soundcache::application::{
    AudioCacheConfig, AudioCacheEngine, CacheStorePort, NetworkFirstCache, RequestRouter,
    StaticAssetCache,
};
use soundcache::config::{load_config, print_config, AppConfig};
use soundcache::infrastructure::adapters::{HttpUpstreamClient, HttpUpstreamConfig};
use soundcache::infrastructure::events::MessageBroker;
use soundcache::infrastructure::http::{AppState, HttpServer, ServerConfig};
use soundcache::infrastructure::memory::InMemoryCacheStore;
use soundcache::infrastructure::persistence::sled::{SledCacheConfig, SledCacheStore};
use tokio::sync::mpsc;

fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},soundcache={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);
    tracing::info!("SoundCache - offline cache proxy");
    print_config(&config);

    // 创建 Cache Store
    let sled_store = if config.cache.in_memory {
        None
    } else {
        if let Some(parent) = std::path::Path::new(&config.cache.db_path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let sled_config = SledCacheConfig {
            db_path: config.cache.db_path.clone(),
        };
        Some(SledCacheStore::new(&sled_config)?.arc())
    };
    let store: Arc<dyn CacheStorePort> = match &sled_store {
        Some(sled) => sled.clone() as Arc<dyn CacheStorePort>,
        None => InMemoryCacheStore::new().arc() as Arc<dyn CacheStorePort>,
    };

    // 创建上游客户端
    let upstream_config = HttpUpstreamConfig::new(&config.upstream.url)
        .with_timeout(config.upstream.timeout_secs);
    let upstream = Arc::new(HttpUpstreamClient::new(upstream_config)?);

    // 静态资源: 预缓存当前版本并清理旧版本
    let statics = Arc::new(StaticAssetCache::new(
        &config.cache.static_prefix,
        &config.cache.static_version,
        store.clone(),
        upstream.clone(),
    ));
    statics
        .install(&config.cache.static_paths(&config.server.path_prefix))
        .await;
    if let Err(e) = statics.activate().await {
        tracing::warn!(error = %e, "Failed to purge stale static caches");
    }

    // 创建音频缓存引擎并恢复已缓存条目
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let engine_config = AudioCacheConfig {
        namespace: config.cache.audio_namespace.clone(),
        max_parallel_download: config.cache.max_parallel_download,
        cache_ahead_files: config.cache.cache_ahead_files,
        limit_bytes: config.cache.audio_cache_limit_bytes,
    };
    let engine =
        AudioCacheEngine::new(engine_config, store.clone(), upstream.clone(), events_tx).arc();
    let restored = engine.restore().await?;
    tracing::info!(restored = restored, "Audio cache restored");

    // 启动 Message Broker
    let broker = MessageBroker::new(engine.clone()).arc();
    tokio::spawn(broker.clone().run(events_rx));

    // 创建请求路由
    let api = Arc::new(NetworkFirstCache::new(
        &config.cache.api_namespace,
        store.clone(),
        upstream.clone(),
    ));
    let router = RequestRouter::new(
        &config.server.path_prefix,
        engine.clone(),
        api,
        statics,
        upstream,
    )
    .arc();

    // 创建 HTTP 服务器
    let server_config = ServerConfig::new(&config.server.host, config.server.port);
    let state = Arc::new(AppState::new(engine, router, broker));
    let server = HttpServer::new(server_config, state);

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    if let Some(sled) = sled_store {
        sled.flush()?;
    }
    tracing::info!("Server shutdown complete");

    Ok(())
}
