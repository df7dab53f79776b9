//! Audio Cache Engine - 音频预取/淘汰引擎
//!
//! - 按 (priority, enqueue_order) 排序的预取队列，priority 为距播放位置的距离
//! - 最多 `max_parallel_download` 个并发下载（Semaphore permit 即下载槽位）
//! - 在配额内写入缓存，必要时 LRU 淘汰（不淘汰正在播放、排队或下载中的资源）
//! - 支持按路径前缀取消
//! - 启动时从 Cache Store 恢复已缓存条目
//!
//! 所有队列/状态变更都在同一把锁内同步完成，只有网络请求和存储读写会挂起

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::application::error::CacheError;
use crate::application::ports::{CacheStorePort, UpstreamPort};
use crate::domain::cache::{
    plan_eviction, CacheEntry, EntryState, PrefetchQueue, PrefetchQueueItem, StoredResponse,
};
use crate::domain::{CacheMessage, PrefetchRequest, ProxyRequest, ProxyResponse};

/// 引擎配置
#[derive(Debug, Clone)]
pub struct AudioCacheConfig {
    /// Cache Store 命名空间
    pub namespace: String,
    /// 最大并发下载数
    pub max_parallel_download: usize,
    /// 预读窗口大小
    pub cache_ahead_files: usize,
    /// 缓存总字节上限
    pub limit_bytes: u64,
}

impl Default for AudioCacheConfig {
    fn default() -> Self {
        Self {
            namespace: "audio".to_string(),
            max_parallel_download: 1,
            cache_ahead_files: 3,
            limit_bytes: 512 * 1024 * 1024, // 512MB
        }
    }
}

/// 下载槽位
///
/// 持有 permit 直到下载结束（成功、失败或取消后任务退出）
pub struct DownloadSlot {
    path: String,
    _permit: OwnedSemaphorePermit,
}

impl DownloadSlot {
    fn new(path: String, permit: OwnedSemaphorePermit) -> Self {
        Self {
            path,
            _permit: permit,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// 引擎统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub cached_entries: usize,
    pub cached_bytes: u64,
    pub limit_bytes: u64,
    pub queued: usize,
    pub downloading: usize,
    pub failed: usize,
    pub aborted: usize,
    pub playing: Option<String>,
}

#[derive(Debug, Default)]
struct EngineState {
    entries: HashMap<String, CacheEntry>,
    queue: PrefetchQueue,
    /// 预取下载: path -> 取消令牌
    downloads: HashMap<String, CancellationToken>,
    /// 直接请求: id -> (path, 取消令牌)
    direct: HashMap<u64, (String, CancellationToken)>,
    playing: Option<String>,
    clock: u64,
    next_insert_order: u64,
    next_direct_id: u64,
    /// 正在提交中的写入所预留的字节
    reserved_bytes: u64,
}

impl EngineState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn is_busy(&self, path: &str) -> bool {
        self.queue.contains(path)
            || self.downloads.contains_key(path)
            || self.direct.values().any(|(p, _)| p == path)
    }

    fn is_protected(&self, path: &str) -> bool {
        self.playing.as_deref() == Some(path) || self.is_busy(path)
    }

    fn set_state(&mut self, path: &str, state: EntryState) {
        self.entries
            .entry(path.to_string())
            .or_insert_with(|| CacheEntry::queued(path))
            .state = state;
    }

    fn mark_cached(&mut self, path: &str, size_bytes: u64) {
        let tick = self.tick();
        let order = self.next_insert_order;
        self.next_insert_order += 1;
        self.entries
            .insert(path.to_string(), CacheEntry::cached(path, size_bytes, tick, order));
    }

    fn count(&self, state: EntryState) -> usize {
        self.entries.values().filter(|e| e.state == state).count()
    }
}

/// 音频缓存引擎
pub struct AudioCacheEngine {
    config: AudioCacheConfig,
    store: Arc<dyn CacheStorePort>,
    upstream: Arc<dyn UpstreamPort>,
    slots: Arc<Semaphore>,
    state: Mutex<EngineState>,
    events: mpsc::UnboundedSender<CacheMessage>,
}

impl AudioCacheEngine {
    pub fn new(
        config: AudioCacheConfig,
        store: Arc<dyn CacheStorePort>,
        upstream: Arc<dyn UpstreamPort>,
        events: mpsc::UnboundedSender<CacheMessage>,
    ) -> Self {
        let slots = Arc::new(Semaphore::new(config.max_parallel_download.max(1)));
        Self {
            config,
            store,
            upstream,
            slots,
            state: Mutex::new(EngineState::default()),
            events,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 从 Cache Store 恢复已缓存条目
    ///
    /// LRU 顺序按写入时间恢复；无法解析的条目会被删除
    pub async fn restore(&self) -> Result<usize, CacheError> {
        let namespace = &self.config.namespace;
        let infos = self.store.entries(namespace).await?;

        let mut restored = Vec::with_capacity(infos.len());
        for info in infos {
            match self.store.get(namespace, &info.key).await {
                Ok(Some(bytes)) => match StoredResponse::decode(&bytes) {
                    Ok(stored) => restored.push((stored.stored_at, info.key, stored.size_bytes())),
                    Err(e) => {
                        tracing::warn!(path = %info.key, error = %e, "Dropping corrupted cache entry");
                        let _ = self.store.delete(namespace, &info.key).await;
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %info.key, error = %e, "Failed to read cache entry during restore");
                }
            }
        }

        restored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        let mut state = self.state.lock();
        let count = restored.len();
        for (_, path, size) in restored {
            state.mark_cached(&path, size);
        }
        let cached_bytes: u64 = state.entries.values().map(|e| e.size_bytes).sum();

        tracing::info!(
            namespace = %namespace,
            entries = count,
            cached_bytes = cached_bytes,
            limit_bytes = self.config.limit_bytes,
            "Audio cache restored"
        );
        Ok(count)
    }

    /// 处理拦截到的音频请求
    ///
    /// 已缓存则直接从 Cache Store 返回（不访问网络）；
    /// 否则绕过队列直接请求网络，成功后尽量写入缓存
    pub async fn handle_request(&self, request: &ProxyRequest) -> Result<ProxyResponse, CacheError> {
        let key = request.cache_key();

        let hit = {
            let mut state = self.state.lock();
            state.playing = Some(key.clone());
            let tick = state.tick();
            match state.entries.get_mut(&key) {
                Some(entry) if entry.is_cached() => {
                    entry.last_access = tick;
                    true
                }
                _ => false,
            }
        };

        if hit && request.is_get() {
            match self.read_cached(&key).await {
                Ok(Some(response)) => {
                    tracing::debug!(path = %key, "Audio served from cache");
                    return Ok(response);
                }
                Ok(None) => {
                    tracing::warn!(path = %key, "Cached entry missing from store, refetching");
                    self.forget(&key);
                }
                Err(e) => {
                    tracing::warn!(path = %key, error = %e, "Failed to read cached audio, refetching");
                }
            }
        }

        let (direct_id, token) = {
            let mut state = self.state.lock();
            let id = state.next_direct_id;
            state.next_direct_id += 1;
            let token = CancellationToken::new();
            state.direct.insert(id, (key.clone(), token.clone()));
            (id, token)
        };

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(CacheError::Aborted(key.clone())),
            fetched = self.upstream.fetch(request) => fetched.map_err(CacheError::from),
        };
        self.state.lock().direct.remove(&direct_id);

        let response = result?;
        if request.is_get() && response.is_success() {
            self.store_direct(&key, &response).await;
        }
        Ok(response)
    }

    /// 处理 Prefetch 请求，立即返回入队数量
    ///
    /// 完成情况通过事件通道广播
    pub fn handle_prefetch(self: &Arc<Self>, request: PrefetchRequest) -> usize {
        let mut state = self.state.lock();
        if let Some(playing) = request.playing {
            state.playing = Some(playing);
        }

        let mut enqueued = 0usize;
        for target in request.items {
            // 播放位置移动后，已排队的预读项按新的距离重新排序
            if state
                .queue
                .refresh(&target.path, target.distance, target.explicit)
            {
                continue;
            }
            let current = state.entries.get(&target.path).map(|e| e.state);
            if current.is_some_and(|s| !s.is_revivable()) {
                tracing::trace!(path = %target.path, state = ?current, "Prefetch skipped");
                continue;
            }
            if state
                .queue
                .push(target.path.clone(), target.distance, target.explicit)
                .is_none()
            {
                continue;
            }
            state.set_state(&target.path, EntryState::Queued);
            self.emit(CacheMessage::updated(&target.path, EntryState::Queued));
            enqueued += 1;
        }

        self.pump(&mut state);

        let trimmed = state.queue.trim_urgent(self.config.cache_ahead_files);
        for item in &trimmed {
            state.set_state(&item.path, EntryState::Aborted);
            self.emit(CacheMessage::updated(&item.path, EntryState::Aborted));
        }

        tracing::info!(
            enqueued = enqueued,
            trimmed = trimmed.len(),
            queued = state.queue.len(),
            downloading = state.downloads.len(),
            "Prefetch handled"
        );
        enqueued
    }

    /// 取消路径以 `path_prefix` 开头的排队项和进行中的下载
    ///
    /// `keep_direct` 为 true 时保留当前播放的资源和直接请求。已缓存内容不受影响
    pub fn abort(&self, path_prefix: &str, keep_direct: bool) -> usize {
        let mut state = self.state.lock();
        let keep = if keep_direct { state.playing.clone() } else { None };
        let matches = |path: &str| path.starts_with(path_prefix) && keep.as_deref() != Some(path);

        let mut aborted: Vec<String> = state
            .queue
            .remove_matching(|item| matches(item.path.as_str()))
            .into_iter()
            .map(|item| item.path)
            .collect();

        let in_flight: Vec<String> = state
            .downloads
            .keys()
            .filter(|path| matches(path.as_str()))
            .cloned()
            .collect();
        for path in in_flight {
            if let Some(token) = state.downloads.remove(&path) {
                token.cancel();
            }
            aborted.push(path);
        }

        for path in &aborted {
            state.set_state(path, EntryState::Aborted);
            self.emit(CacheMessage::updated(path, EntryState::Aborted));
        }

        if !keep_direct {
            for (path, token) in state.direct.values() {
                if path.starts_with(path_prefix) {
                    token.cancel();
                }
            }
        }

        tracing::info!(
            path_prefix = %path_prefix,
            keep_direct = keep_direct,
            aborted = aborted.len(),
            "Loads aborted"
        );
        aborted.len()
    }

    /// 待下载队列快照（有序）
    pub fn get_queue(&self) -> Vec<PrefetchQueueItem> {
        self.state.lock().queue.snapshot()
    }

    pub fn entry_state(&self, path: &str) -> Option<EntryState> {
        self.state.lock().entries.get(path).map(|e| e.state)
    }

    pub fn stats(&self) -> EngineStats {
        let state = self.state.lock();
        let cached_bytes = state
            .entries
            .values()
            .filter(|e| e.is_cached())
            .map(|e| e.size_bytes)
            .sum();
        EngineStats {
            cached_entries: state.count(EntryState::Cached),
            cached_bytes,
            limit_bytes: self.config.limit_bytes,
            queued: state.queue.len(),
            downloading: state.count(EntryState::Downloading),
            failed: state.count(EntryState::Failed),
            aborted: state.count(EntryState::Aborted),
            playing: state.playing.clone(),
        }
    }

    /// 显式删除条目
    ///
    /// 排队或下载中的资源不能删除，返回 false
    pub async fn delete(&self, path: &str) -> Result<bool, CacheError> {
        let was_cached = {
            let mut state = self.state.lock();
            if state.is_busy(path) {
                return Ok(false);
            }
            match state.entries.remove(path) {
                Some(entry) => entry.is_cached(),
                None => return Ok(false),
            }
        };

        if was_cached {
            self.store.delete(&self.config.namespace, path).await?;
            self.emit(CacheMessage::CacheEvicted {
                path: path.to_string(),
            });
        }
        tracing::info!(path = %path, was_cached = was_cached, "Cache entry deleted");
        Ok(true)
    }

    // ------------------------------------------------------------------
    // 调度
    // ------------------------------------------------------------------

    /// 在有空闲槽位时启动队首下载
    fn pump(self: &Arc<Self>, state: &mut EngineState) {
        while !state.queue.is_empty() {
            let Ok(permit) = self.slots.clone().try_acquire_owned() else {
                break;
            };
            let Some(item) = state.queue.pop() else {
                break;
            };

            let token = CancellationToken::new();
            state.downloads.insert(item.path.clone(), token.clone());
            state.set_state(&item.path, EntryState::Downloading);
            self.emit(CacheMessage::updated(&item.path, EntryState::Downloading));

            tracing::debug!(
                path = %item.path,
                priority = item.priority,
                "Prefetch download started"
            );

            let slot = DownloadSlot::new(item.path, permit);
            tokio::spawn(Arc::clone(self).run_download(slot, token));
        }
    }

    fn schedule(self: &Arc<Self>) {
        let mut state = self.state.lock();
        self.pump(&mut state);
    }

    async fn run_download(self: Arc<Self>, slot: DownloadSlot, token: CancellationToken) {
        let path = slot.path().to_string();
        let request = ProxyRequest::get(&path);

        let fetched = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.upstream.fetch(&request) => Some(result),
        };

        let outcome = match fetched {
            None => Err(CacheError::Aborted(path.clone())),
            Some(Ok(response)) if response.is_success() => {
                self.insert(&path, &response, Some(&token)).await
            }
            Some(Ok(response)) => Err(CacheError::network(format!("HTTP {}", response.status))),
            Some(Err(e)) => Err(e.into()),
        };

        {
            let mut state = self.state.lock();
            if token.is_cancelled() {
                // abort 已经记录了状态
                tracing::debug!(path = %path, "Prefetch download aborted");
            } else {
                state.downloads.remove(&path);
                match outcome {
                    Ok(()) => {
                        tracing::info!(path = %path, "Prefetch download completed");
                    }
                    Err(e) => {
                        tracing::warn!(path = %path, error = %e, "Prefetch download failed");
                        state.set_state(&path, EntryState::Failed);
                        self.emit(CacheMessage::failed(&path, e.to_string()));
                    }
                }
            }
        }

        drop(slot);
        self.schedule();
    }

    // ------------------------------------------------------------------
    // 存储
    // ------------------------------------------------------------------

    async fn read_cached(&self, key: &str) -> Result<Option<ProxyResponse>, CacheError> {
        let Some(bytes) = self.store.get(&self.config.namespace, key).await? else {
            return Ok(None);
        };
        let stored = StoredResponse::decode(&bytes)?;
        Ok(Some(stored.into_response()))
    }

    fn forget(&self, key: &str) {
        let mut state = self.state.lock();
        if state.entries.get(key).is_some_and(|e| e.is_cached()) {
            state.entries.remove(key);
        }
    }

    /// 直接请求的结果尽量写入缓存，失败只记录日志
    async fn store_direct(&self, key: &str, response: &ProxyResponse) {
        let in_flight = self.state.lock().downloads.contains_key(key);
        if in_flight {
            tracing::debug!(path = %key, "Prefetch in flight, leaving insertion to it");
            return;
        }
        if let Err(e) = self.insert(key, response, None).await {
            tracing::debug!(path = %key, error = %e, "Direct response not cached");
        }
    }

    /// 写入缓存
    ///
    /// 先在锁内完成淘汰计划并预留空间，再执行存储操作；
    /// 写入完成后才标记为 Cached，保证任何可观察时刻 Cached 总量不超过上限
    async fn insert(
        &self,
        key: &str,
        response: &ProxyResponse,
        token: Option<&CancellationToken>,
    ) -> Result<(), CacheError> {
        let namespace = &self.config.namespace;
        let size = response.size_bytes();
        let blob = StoredResponse::from_response(response).encode()?;

        let plan = {
            let mut state = self.state.lock();
            if token.is_some_and(|t| t.is_cancelled()) {
                return Err(CacheError::Aborted(key.to_string()));
            }
            if state.entries.get(key).is_some_and(|e| e.is_cached()) {
                return Ok(());
            }

            let snapshot = &*state;
            let plan = plan_eviction(
                snapshot.entries.values(),
                |path| path == key || snapshot.is_protected(path),
                snapshot.reserved_bytes,
                size,
                self.config.limit_bytes,
            )?;

            for victim in &plan.victims {
                state.entries.remove(victim);
            }
            state.reserved_bytes += size;
            plan
        };

        for victim in &plan.victims {
            if let Err(e) = self.store.delete(namespace, victim).await {
                tracing::warn!(path = %victim, error = %e, "Failed to delete evicted entry");
            }
            self.emit(CacheMessage::CacheEvicted {
                path: victim.clone(),
            });
        }
        if !plan.victims.is_empty() {
            tracing::info!(
                evicted = plan.victims.len(),
                freed_bytes = plan.freed_bytes,
                incoming_bytes = size,
                "LRU evicted cache entries"
            );
        }

        let put = self.store.put(namespace, key, blob).await;

        let aborted = {
            let mut state = self.state.lock();
            state.reserved_bytes -= size;
            put?;
            let aborted = token.is_some_and(|t| t.is_cancelled());
            if !aborted {
                state.queue.remove(key);
                if token.is_some() {
                    state.downloads.remove(key);
                }
                state.mark_cached(key, size);
            }
            aborted
        };

        if aborted {
            let _ = self.store.delete(namespace, key).await;
            return Err(CacheError::Aborted(key.to_string()));
        }

        tracing::debug!(path = %key, size_bytes = size, "Audio cached");
        self.emit(CacheMessage::updated(key, EntryState::Cached));
        Ok(())
    }

    fn emit(&self, message: CacheMessage) {
        if self.events.send(message).is_err() {
            tracing::trace!("No broker listening for cache events");
        }
    }
}
