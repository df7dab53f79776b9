//! HTTP Handlers

mod health;
mod proxy;
mod status;
mod websocket;

pub use health::*;
pub use proxy::*;
pub use status::*;
pub use websocket::*;
