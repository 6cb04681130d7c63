use crate::domain::model::{RawLine, RecordingMode, Vendor};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

/// 已開啟的裝置連線：寫入端與依序到達的行
///
/// 欄位依宣告順序 drop：`lines` 必須先於 `writer` 關閉，讀取端才不會卡在送出上。
pub struct Link {
    pub lines: mpsc::Receiver<RawLine>,
    pub writer: Box<dyn CommandWriter>,
}

pub trait CommandWriter: Send {
    /// 傳送一行指令（自動加上 CR/LF）
    fn send_line(&mut self, line: &str) -> Result<()>;
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self) -> Result<Link>;
    fn describe(&self) -> String;
}

/// 結果記錄（時間戳記由實作加上）
pub trait RecordSink: Send {
    fn write_record(&mut self, message: &str) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

pub trait ConfigProvider: Send + Sync {
    fn mode(&self) -> RecordingMode;
    fn vendor(&self) -> Vendor;
    fn port(&self) -> &str;
    fn baud(&self) -> u32;
    fn poll_interval(&self) -> Duration;
    fn flow_window(&self) -> usize;
    fn average_window(&self) -> usize;
    fn tag(&self) -> &str;
}
