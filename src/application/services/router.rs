//! Request Router - 请求分发
//!
//! 有序的 (谓词, 处理器) 列表，第一个匹配的谓词决定处理器；
//! 最后一项总是匹配，交给静态资源缓存

use std::sync::Arc;

use crate::application::error::CacheError;
use crate::application::ports::UpstreamPort;
use crate::application::services::{AudioCacheEngine, NetworkFirstCache, StaticAssetCache};
use crate::domain::routing::{is_api_path, is_audio_path, normalize_prefix};
use crate::domain::{ProxyRequest, ProxyResponse};

/// 请求的去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// 直接请求网络，不缓存
    Network,
    /// Audio Cache Engine
    Audio,
    /// Network-First Cache
    Api,
    /// Static Asset Cache
    Static,
}

impl Dispatch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dispatch::Network => "network",
            Dispatch::Audio => "audio",
            Dispatch::Api => "api",
            Dispatch::Static => "static",
        }
    }
}

type Predicate = Box<dyn Fn(&str, &ProxyRequest) -> bool + Send + Sync>;

/// 带 seek 参数或 Range 头的音频请求不走缓存
fn is_partial_audio(prefix: &str, request: &ProxyRequest) -> bool {
    if !is_audio_path(prefix, &request.path) {
        return false;
    }
    let seeking = request
        .query_param("seek")
        .map(|v| !v.is_empty())
        .unwrap_or(false);
    seeking || request.header("range").is_some()
}

pub struct RequestRouter {
    prefix: String,
    routes: Vec<(Predicate, Dispatch)>,
    audio: Arc<AudioCacheEngine>,
    api: Arc<NetworkFirstCache>,
    statics: Arc<StaticAssetCache>,
    upstream: Arc<dyn UpstreamPort>,
}

impl RequestRouter {
    pub fn new(
        path_prefix: &str,
        audio: Arc<AudioCacheEngine>,
        api: Arc<NetworkFirstCache>,
        statics: Arc<StaticAssetCache>,
        upstream: Arc<dyn UpstreamPort>,
    ) -> Self {
        let routes: Vec<(Predicate, Dispatch)> = vec![
            (Box::new(is_partial_audio), Dispatch::Network),
            (
                Box::new(|prefix: &str, req: &ProxyRequest| is_audio_path(prefix, &req.path)),
                Dispatch::Audio,
            ),
            (
                Box::new(|prefix: &str, req: &ProxyRequest| is_api_path(prefix, &req.path)),
                Dispatch::Api,
            ),
            (Box::new(|_: &str, _: &ProxyRequest| true), Dispatch::Static),
        ];

        Self {
            prefix: normalize_prefix(path_prefix),
            routes,
            audio,
            api,
            statics,
            upstream,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 按顺序求值谓词
    pub fn classify(&self, request: &ProxyRequest) -> Dispatch {
        self.routes
            .iter()
            .find(|(predicate, _)| predicate(&self.prefix, request))
            .map(|(_, dispatch)| *dispatch)
            .unwrap_or(Dispatch::Static)
    }

    pub async fn route(&self, request: &ProxyRequest) -> Result<ProxyResponse, CacheError> {
        let dispatch = self.classify(request);
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            dispatch = dispatch.as_str(),
            "Routing request"
        );

        match dispatch {
            Dispatch::Network => Ok(self.upstream.fetch(request).await?),
            Dispatch::Audio => self.audio.handle_request(request).await,
            Dispatch::Api => self.api.handle_request(request).await,
            Dispatch::Static => self.statics.handle_request(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::CacheStorePort;
    use crate::application::services::AudioCacheConfig;
    use crate::domain::CacheMessage;
    use crate::infrastructure::adapters::FakeUpstream;
    use crate::infrastructure::memory::InMemoryCacheStore;
    use tokio::sync::mpsc;

    struct Harness {
        router: RequestRouter,
        upstream: Arc<FakeUpstream>,
        store: Arc<InMemoryCacheStore>,
        engine: Arc<AudioCacheEngine>,
        _events: mpsc::UnboundedReceiver<CacheMessage>,
    }

    fn setup(prefix: &str) -> Harness {
        let upstream = Arc::new(FakeUpstream::new());
        let store = Arc::new(InMemoryCacheStore::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = AudioCacheEngine::new(
            AudioCacheConfig::default(),
            store.clone(),
            upstream.clone(),
            tx,
        )
        .arc();
        let api = Arc::new(NetworkFirstCache::new("api", store.clone(), upstream.clone()));
        let statics = Arc::new(StaticAssetCache::new(
            "static-",
            "v1",
            store.clone(),
            upstream.clone(),
        ));
        let router = RequestRouter::new(prefix, engine.clone(), api, statics, upstream.clone());
        Harness {
            router,
            upstream,
            store,
            engine,
            _events: rx,
        }
    }

    #[test]
    fn test_classify_in_order() {
        let h = setup("/");
        let classify = |p: &str| h.router.classify(&ProxyRequest::get(p));

        assert_eq!(classify("/1/audio/a/b.mp3"), Dispatch::Audio);
        assert_eq!(classify("/1/audio/a/b.mp3?trans=m"), Dispatch::Audio);
        assert_eq!(classify("/1/audio/a/b.mp3?seek=12.5"), Dispatch::Network);
        assert_eq!(classify("/1/audio/a/b.mp3?seek="), Dispatch::Audio);
        assert_eq!(classify("/folder/Author"), Dispatch::Api);
        assert_eq!(classify("/3/collections"), Dispatch::Api);
        assert_eq!(classify("/index.html"), Dispatch::Static);
    }

    #[test]
    fn test_range_request_bypasses_audio_cache() {
        let h = setup("/");
        let req = ProxyRequest::get("/1/audio/a.mp3").with_header("Range", "bytes=100-");
        assert_eq!(h.router.classify(&req), Dispatch::Network);
    }

    #[test]
    fn test_prefix_is_honored() {
        let h = setup("audioserve");
        assert_eq!(h.router.prefix(), "/audioserve/");
        assert_eq!(
            h.router.classify(&ProxyRequest::get("/audioserve/0/audio/x.mp3")),
            Dispatch::Audio
        );
        assert_eq!(
            h.router.classify(&ProxyRequest::get("/0/audio/x.mp3")),
            Dispatch::Static
        );
    }

    #[tokio::test]
    async fn test_seek_request_goes_to_network_without_caching() {
        let h = setup("/");
        h.upstream
            .respond_body("/7/audio/book/ch1.mp3?seek=30", b"partial".to_vec());

        let response = h
            .router
            .route(&ProxyRequest::get("/7/audio/book/ch1.mp3?seek=30"))
            .await
            .unwrap();
        assert_eq!(response.body, b"partial".to_vec());
        assert_eq!(h.engine.entry_state("/7/audio/book/ch1.mp3?seek=30"), None);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_api_request_dispatched_to_network_first() {
        let h = setup("/");
        h.upstream.respond_body("/folder/", b"listing".to_vec());

        h.router.route(&ProxyRequest::get("/folder/")).await.unwrap();
        assert!(h.store.get("api", "/folder/").await.unwrap().is_some());
    }
}
