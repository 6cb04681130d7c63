pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{clock::SystemClock, record_log::RecordLog, serial::SerialTransport};
pub use config::{CliArgs, TomlConfig};
pub use core::{flow::FlowEngine, protocol::ProtocolAdapter, session::Session};
pub use utils::error::{BalanceError, Result};
