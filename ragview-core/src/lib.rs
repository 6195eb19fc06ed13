pub mod chat;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod graph;
pub mod logs;
pub mod refresh;
pub mod session;
pub mod types;
pub mod upload;

pub use errors::{ClientError, ClientResult, ErrorKind};
pub use gateway::{Gateway, HttpGateway};
pub use session::{BackendHealth, Notifier, Session, SessionEvent};
