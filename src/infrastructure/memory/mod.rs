//! Memory Layer - In-Memory State Management
//!
//! 内存版 Cache Store

mod cache_store;

pub use cache_store::InMemoryCacheStore;
