//! Upstream Adapter - 上游网络访问

mod fake_upstream;
mod http_upstream_client;

pub use fake_upstream::FakeUpstream;
pub use http_upstream_client::{HttpUpstreamClient, HttpUpstreamConfig};
