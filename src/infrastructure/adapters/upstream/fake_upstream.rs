//! Fake Upstream - 用于测试的上游服务
//!
//! 按 path+query 返回预设响应，未知路径返回 404；
//! `hold()` 之后所有请求挂起，直到 `release()`

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

use crate::application::ports::{FetchError, UpstreamPort};
use crate::domain::{ProxyRequest, ProxyResponse};

#[derive(Debug, Clone)]
enum FakeReply {
    Ok(ProxyResponse),
    Fail(String),
}

pub struct FakeUpstream {
    replies: DashMap<String, FakeReply>,
    calls: AtomicUsize,
    calls_by_path: DashMap<String, usize>,
    gate: watch::Sender<bool>,
}

impl FakeUpstream {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            replies: DashMap::new(),
            calls: AtomicUsize::new(0),
            calls_by_path: DashMap::new(),
            gate,
        }
    }

    /// 预设 200 响应
    pub fn respond_body(&self, path: &str, body: Vec<u8>) {
        self.respond(path, ProxyResponse::new(200, body));
    }

    pub fn respond(&self, path: &str, response: ProxyResponse) {
        self.replies.insert(path.to_string(), FakeReply::Ok(response));
    }

    /// 预设网络失败
    pub fn fail(&self, path: &str, message: &str) {
        self.replies
            .insert(path.to_string(), FakeReply::Fail(message.to_string()));
    }

    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, path: &str) -> usize {
        self.calls_by_path.get(path).map(|c| *c).unwrap_or(0)
    }
}

impl Default for FakeUpstream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpstreamPort for FakeUpstream {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, FetchError> {
        let key = request.path_and_query();
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.calls_by_path.entry(key.clone()).or_insert(0) += 1;

        let mut gate = self.gate.subscribe();
        gate.wait_for(|open| *open)
            .await
            .map_err(|e| FetchError::NetworkError(e.to_string()))?;

        let reply = self.replies.get(&key).map(|r| r.value().clone());
        match reply {
            Some(FakeReply::Ok(response)) => Ok(response),
            Some(FakeReply::Fail(message)) => Err(FetchError::NetworkError(message)),
            None => Ok(ProxyResponse::new(404, b"not found".to_vec())),
        }
    }
}
