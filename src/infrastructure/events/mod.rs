//! Events - 控制消息分发与广播

mod broker;

pub use broker::MessageBroker;
