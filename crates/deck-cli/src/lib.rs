//! deck-cli library: the pieces behind the `deck` binary.
//!
//! Exposed as a library so integration tests can reach the channel
//! connection and the HTTP client.

pub mod auth;
pub mod channel;
pub mod commands;
pub mod config;
pub mod http;
pub mod message;
pub mod native_fs;
pub mod prompt;
pub mod watch;
pub mod watcher;

pub use auth::{AccountInfo, AuthPayload, AuthStore};
pub use channel::{ChannelConnection, ChannelEvent};
pub use config::{Endpoints, Screen};
pub use http::HttpClient;
pub use message::ChannelRequest;
pub use native_fs::NativeFs;
pub use watcher::{FileEvent, FileEventKind, FileWatcher};
