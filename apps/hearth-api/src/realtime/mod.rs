//! The real-time hub messaging and presence core.

pub mod bus;
pub mod events;
pub mod handler;
pub mod notifier;
pub mod presence;
pub mod server;
pub mod session;
