pub mod flow;
pub mod protocol;
pub mod series;
pub mod session;

pub use crate::domain::model::{FlowRecord, RawLine, Reading, WeightSample};
pub use crate::domain::ports::{Clock, CommandWriter, ConfigProvider, Link, RecordSink, Transport};
pub use crate::utils::error::Result;
