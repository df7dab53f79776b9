//! Exchange - 被拦截的请求与响应
//!
//! 与具体 HTTP 框架无关的请求/响应表示，供路由、缓存和上游客户端共享

use serde::{Deserialize, Serialize};

/// 逐跳头部，不参与缓存和转发
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
    "te",
    "trailer",
    "host",
    "content-length",
];

/// 判断头部是否为逐跳头部
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

/// 被拦截的请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    pub method: String,
    /// URL 路径（不含查询串）
    pub path: String,
    /// 原始查询串（不含 `?`）
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ProxyRequest {
    /// 构造 GET 请求，`path_and_query` 可以带查询串
    pub fn get(path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (path_and_query.to_string(), None),
        };
        Self {
            method: "GET".to_string(),
            path,
            query,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// 路径 + 查询串
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(q) if !q.is_empty() => format!("{}?{}", self.path, q),
            _ => self.path.clone(),
        }
    }

    /// 请求标识，作为缓存 key
    pub fn cache_key(&self) -> String {
        self.path_and_query()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// 查询参数值（已解码）
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

/// 响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ProxyResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn size_bytes(&self) -> u64 {
        self.body.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_splits_query() {
        let req = ProxyRequest::get("/12/audio/book/01.mp3?trans=m&seek=30");
        assert_eq!(req.path, "/12/audio/book/01.mp3");
        assert_eq!(req.query.as_deref(), Some("trans=m&seek=30"));
        assert_eq!(req.query_param("seek").as_deref(), Some("30"));
        assert_eq!(req.query_param("missing"), None);
        assert_eq!(req.cache_key(), "/12/audio/book/01.mp3?trans=m&seek=30");
    }

    #[test]
    fn test_query_param_is_decoded() {
        let req = ProxyRequest::get("/search?q=a%20b");
        assert_eq!(req.query_param("q").as_deref(), Some("a b"));
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let req = ProxyRequest::get("/x").with_header("Range", "bytes=0-");
        assert_eq!(req.header("range"), Some("bytes=0-"));
        assert!(is_hop_by_hop("Transfer-Encoding"));
        assert!(!is_hop_by_hop("content-type"));
    }
}
