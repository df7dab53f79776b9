//! Message Broker Implementation
//!
//! 引擎与前台客户端之间的控制通道：
//! - 每个 WebSocket 客户端注册一个有界 mpsc 通道
//! - 引擎通知走独立的无界通道，由 `run` 排空后广播
//! - 入站消息分发到 Audio Cache Engine

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::application::AudioCacheEngine;
use crate::domain::{CacheMessage, PongData};

/// 每个客户端的出站缓冲
const CLIENT_BUFFER: usize = 100;

pub struct MessageBroker {
    clients: DashMap<Uuid, mpsc::Sender<CacheMessage>>,
    engine: Arc<AudioCacheEngine>,
}

impl MessageBroker {
    pub fn new(engine: Arc<AudioCacheEngine>) -> Self {
        Self {
            clients: DashMap::new(),
            engine,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 注册客户端
    pub fn register(&self) -> (Uuid, mpsc::Receiver<CacheMessage>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        self.clients.insert(id, tx);
        tracing::info!(client_id = %id, clients = self.clients.len(), "Client registered");
        (id, rx)
    }

    pub fn unregister(&self, id: Uuid) {
        if self.clients.remove(&id).is_some() {
            tracing::info!(client_id = %id, "Client unregistered");
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// 发送给所有客户端，返回送达数量
    ///
    /// 已断开的客户端被移除；缓冲已满的客户端错过这条消息
    pub fn broadcast(&self, message: &CacheMessage) -> usize {
        let mut delivered = 0;
        let mut gone = Vec::new();

        for client in self.clients.iter() {
            match client.value().try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(client_id = %client.key(), kind = message.kind(), "Client lagging, message dropped");
                }
                Err(TrySendError::Closed(_)) => gone.push(*client.key()),
            }
        }

        for id in gone {
            tracing::debug!(client_id = %id, "Pruning disconnected client");
            self.clients.remove(&id);
        }
        delivered
    }

    /// 发送给单个客户端
    pub fn send_to(&self, id: Uuid, message: CacheMessage) -> bool {
        let Some(client) = self.clients.get(&id) else {
            return false;
        };
        match client.try_send(message) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(client_id = %id, error = %e, "Failed to send to client");
                false
            }
        }
    }

    /// 分发入站消息
    pub fn dispatch(&self, from: Uuid, message: CacheMessage) {
        match message {
            CacheMessage::Prefetch(request) => {
                let enqueued = self.engine.handle_prefetch(request);
                tracing::debug!(client_id = %from, enqueued = enqueued, "Prefetch dispatched");
            }
            CacheMessage::AbortLoads(abort) => {
                let aborted = self.engine.abort(&abort.path_prefix, abort.keep_direct);
                tracing::debug!(
                    client_id = %from,
                    path_prefix = %abort.path_prefix,
                    aborted = aborted,
                    "AbortLoads dispatched"
                );
            }
            CacheMessage::Ping => {
                let pong = CacheMessage::Pong(PongData {
                    pending_audio: self.engine.get_queue(),
                });
                self.send_to(from, pong);
            }
            other => {
                tracing::warn!(client_id = %from, kind = other.kind(), "Ignoring unexpected message");
            }
        }
    }

    /// 解析并分发文本消息，无法解析的消息被忽略
    pub fn dispatch_text(&self, from: Uuid, text: &str) {
        match serde_json::from_str::<CacheMessage>(text) {
            Ok(message) => self.dispatch(from, message),
            Err(e) => {
                tracing::warn!(client_id = %from, error = %e, "Ignoring unknown message");
            }
        }
    }

    /// 排空引擎通知并广播，直到通道关闭
    pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<CacheMessage>) {
        tracing::info!("MessageBroker started");
        while let Some(message) = events.recv().await {
            self.broadcast(&message);
        }
        tracing::info!("MessageBroker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::AudioCacheConfig;
    use crate::domain::cache::EntryState;
    use crate::domain::{PrefetchRequest, PrefetchTarget};
    use crate::infrastructure::adapters::FakeUpstream;
    use crate::infrastructure::memory::InMemoryCacheStore;
    use std::time::Duration;

    fn setup() -> (Arc<MessageBroker>, Arc<FakeUpstream>, mpsc::UnboundedReceiver<CacheMessage>) {
        let upstream = Arc::new(FakeUpstream::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let config = AudioCacheConfig {
            max_parallel_download: 1,
            cache_ahead_files: 5,
            ..Default::default()
        };
        let engine = AudioCacheEngine::new(
            config,
            Arc::new(InMemoryCacheStore::new()),
            upstream.clone(),
            tx,
        )
        .arc();
        (MessageBroker::new(engine).arc(), upstream, rx)
    }

    fn track(n: u32) -> String {
        format!("/4/audio/book/{:02}.mp3", n)
    }

    #[tokio::test]
    async fn test_ping_replies_with_queue_to_sender_only() {
        let (broker, upstream, _events) = setup();
        upstream.hold();

        let (alice, mut alice_rx) = broker.register();
        let (_bob, mut bob_rx) = broker.register();

        let items = (1..=3).map(|n| PrefetchTarget::new(track(n), n)).collect();
        broker.dispatch(alice, CacheMessage::Prefetch(PrefetchRequest { items, playing: None }));
        broker.dispatch_text(alice, r#"{"kind":"Ping"}"#);

        match alice_rx.recv().await {
            Some(CacheMessage::Pong(data)) => {
                let paths: Vec<_> = data.pending_audio.iter().map(|i| i.path.clone()).collect();
                assert_eq!(paths, vec![track(2), track(3)]);
            }
            other => panic!("expected Pong, got {:?}", other),
        }
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_skips_disconnected_clients() {
        let (broker, _, _events) = setup();
        let (_a, mut a_rx) = broker.register();
        let (_b, b_rx) = broker.register();
        let (_c, mut c_rx) = broker.register();
        drop(b_rx);

        let msg = CacheMessage::updated(track(1), EntryState::Cached);
        assert_eq!(broker.broadcast(&msg), 2);
        assert_eq!(broker.client_count(), 2);
        assert_eq!(a_rx.recv().await, Some(msg.clone()));
        assert_eq!(c_rx.recv().await, Some(msg));
    }

    #[tokio::test]
    async fn test_run_forwards_engine_events() {
        let (broker, upstream, events) = setup();
        upstream.respond_body(&track(1), vec![1; 4]);
        let (_id, mut rx) = broker.register();
        tokio::spawn(broker.clone().run(events));

        broker.dispatch_text(
            Uuid::new_v4(),
            &format!(r#"{{"kind":"Prefetch","data":{{"items":[{{"path":"{}","distance":1}}]}}}}"#, track(1)),
        );

        let cached = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(msg) = rx.recv().await {
                if msg == CacheMessage::updated(track(1), EntryState::Cached) {
                    return true;
                }
            }
            false
        })
        .await
        .expect("timed out waiting for broadcast");
        assert!(cached);
    }

    #[tokio::test]
    async fn test_unknown_messages_are_ignored() {
        let (broker, upstream, _events) = setup();
        let (id, mut rx) = broker.register();

        broker.dispatch_text(id, "not json");
        broker.dispatch_text(id, r#"{"kind":"Reboot","data":{}}"#);
        broker.dispatch(id, CacheMessage::CacheEvicted { path: track(1) });

        assert!(rx.try_recv().is_err());
        assert_eq!(upstream.call_count(), 0);
    }
}
