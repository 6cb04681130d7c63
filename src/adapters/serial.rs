use crate::domain::model::RawLine;
use crate::domain::ports::{CommandWriter, Link, Transport};
use crate::utils::error::{BalanceError, Result};
use async_trait::async_trait;
use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;

const READ_TIMEOUT: Duration = Duration::from_millis(200);
const IDLE_BACKOFF: Duration = Duration::from_millis(20);
const LINE_BUFFER: usize = 64;
/// 超過此長度仍未見 `\n` 的行直接丟棄
const MAX_LINE_BYTES: usize = 4096;

/// 8-N-1 serial connection to the balance.
#[derive(Debug, Clone)]
pub struct SerialTransport {
    port: String,
    baud: u32,
}

impl SerialTransport {
    pub fn new(port: impl Into<String>, baud: u32) -> Self {
        Self {
            port: port.into(),
            baud,
        }
    }

    fn unavailable(&self, reason: impl ToString) -> BalanceError {
        BalanceError::TransportUnavailable {
            port: self.port.clone(),
            baud: self.baud,
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn open(&self) -> Result<Link> {
        let port = self.port.clone();
        let baud = self.baud;

        let serial = tokio::task::spawn_blocking(move || {
            serialport::new(port, baud)
                .data_bits(serialport::DataBits::Eight)
                .parity(serialport::Parity::None)
                .stop_bits(serialport::StopBits::One)
                .timeout(READ_TIMEOUT)
                .open()
        })
        .await
        .map_err(|e| self.unavailable(e))?
        .map_err(|e| self.unavailable(e))?;

        let reader = serial.try_clone()?;
        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        let name = self.port.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();
        let handle = std::thread::Builder::new()
            .name("serial-reader".to_string())
            .spawn(move || read_lines(reader, tx, &flag, &name))?;

        Ok(Link {
            lines: rx,
            writer: Box::new(SerialWriter {
                port: serial,
                shutdown,
                reader: Some(handle),
            }),
        })
    }

    fn describe(&self) -> String {
        format!("{} at {} baud", self.port, self.baud)
    }
}

struct SerialWriter {
    port: Box<dyn SerialPort>,
    shutdown: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl Drop for SerialWriter {
    /// 等讀取執行緒放開複製的埠，立刻重新開啟才不會被獨佔模式擋下
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.reader.take() {
            if handle.join().is_err() {
                tracing::warn!("Serial reader thread panicked");
            }
        }
    }
}

impl CommandWriter for SerialWriter {
    fn send_line(&mut self, line: &str) -> Result<()> {
        tracing::debug!("➡️ {}", line);
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\r\n")?;
        self.port.flush()?;
        Ok(())
    }
}

/// 讀取執行緒：切成行後送進 channel，接收端關閉或收到 shutdown 時結束
fn read_lines<P: Read>(
    mut port: P,
    tx: mpsc::Sender<RawLine>,
    shutdown: &AtomicBool,
    name: &str,
) {
    let mut splitter = LineSplitter::default();
    let mut buf = [0u8; 256];

    loop {
        if tx.is_closed() || shutdown.load(Ordering::SeqCst) {
            break;
        }
        match port.read(&mut buf) {
            Ok(0) => std::thread::sleep(IDLE_BACKOFF),
            Ok(n) => {
                for line in splitter.feed(&buf[..n]) {
                    tracing::trace!("⬅️ {:?}", line.as_str());
                    if tx.blocking_send(line).is_err() {
                        return;
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::Interrupted => {
                continue
            }
            Err(e) => {
                tracing::error!("Serial read from {} failed: {}", name, e);
                break;
            }
        }
    }
}

/// Splits a byte stream on `\n`, keeping any `\r` and other trailing bytes.
///
/// A line longer than the limit is dropped up to its next `\n`.
#[derive(Debug)]
pub struct LineSplitter {
    pending: Vec<u8>,
    limit: usize,
    overflowed: bool,
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self::with_limit(MAX_LINE_BYTES)
    }
}

impl LineSplitter {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            limit,
            overflowed: false,
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<RawLine> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == b'\n' {
                if !self.overflowed {
                    let line = String::from_utf8_lossy(&self.pending).into_owned();
                    lines.push(RawLine::new(line));
                }
                self.pending.clear();
                self.overflowed = false;
            } else if self.overflowed {
                continue;
            } else if self.pending.len() >= self.limit {
                tracing::warn!("Dropping serial line longer than {} bytes", self.limit);
                self.pending.clear();
                self.overflowed = true;
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splitter_handles_partial_reads() {
        let mut splitter = LineSplitter::default();

        assert!(splitter.feed(b"1 + 0.0").is_empty());
        let lines = splitter.feed(b"000\r\n09:10:37\r\nS S");

        assert_eq!(
            lines,
            vec![RawLine::from("1 + 0.0000\r"), RawLine::from("09:10:37\r")]
        );
        assert_eq!(splitter.feed(b" 1.0 g\r\n"), vec![RawLine::from("S S 1.0 g\r")]);
    }

    #[test]
    fn test_splitter_drops_oversized_line() {
        let mut splitter = LineSplitter::with_limit(8);

        assert!(splitter.feed(b"0123456789abcdef").is_empty());
        let lines = splitter.feed(b"tail\r\nS S 1 g\r\n");

        assert_eq!(lines, vec![RawLine::from("S S 1 g\r")]);
    }

    /// 永遠回傳 0 位元組的埠
    struct SilentPort {
        reads: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl Read for SilentPort {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }
    }

    #[test]
    fn test_reader_backs_off_on_empty_reads_and_honours_shutdown() {
        let reads = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let port = SilentPort {
            reads: reads.clone(),
        };
        let (tx, _rx) = mpsc::channel(LINE_BUFFER);
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();

        let handle = std::thread::spawn(move || read_lines(port, tx, &flag, "silent"));
        std::thread::sleep(Duration::from_millis(200));
        shutdown.store(true, Ordering::SeqCst);
        handle.join().unwrap();

        // 200 ms / 20 ms 的退避，忙迴圈會是數百萬次
        assert!(reads.load(Ordering::SeqCst) <= 20);
    }

    #[tokio::test]
    async fn test_open_missing_port_is_transport_unavailable() {
        let transport = SerialTransport::new("/dev/does-not-exist-sbalance", 9600);
        let err = transport.open().await.err().unwrap();

        assert!(matches!(err, BalanceError::TransportUnavailable { baud: 9600, .. }));
        assert_eq!(transport.describe(), "/dev/does-not-exist-sbalance at 9600 baud");
    }
}
