use crate::core::flow::{FlowEngine, FlowSettings};
use crate::core::protocol::{ProtocolAdapter, WeightRequest};
use crate::domain::model::{
    AdapterConfig, KeyCommand, RawLine, Reading, RecordingMode, WeightSample,
};
use crate::domain::ports::{Clock, ConfigProvider, Link, RecordSink, Transport};
use crate::utils::error::{BalanceError, ErrorSeverity, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, Interval};

/// 依模式處理樣本
enum Recorder {
    Hydro(FlowEngine),
    Log { tag: String },
}

enum Event {
    Tick,
    Line(Option<RawLine>),
    Command(Option<KeyCommand>),
}

/// Whether the event loop should keep going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// One balance session: the poll timer, the device link and the keyboard
/// channel all feed this single owner of the flow state.
pub struct Session<T: Transport, R: RecordSink> {
    transport: T,
    sink: R,
    clock: Arc<dyn Clock>,
    adapter: ProtocolAdapter,
    recorder: Recorder,
    poll_interval: Duration,
    link: Option<Link>,
    ticker: Option<Interval>,
    started_at: f64,
    last_output: Option<String>,
}

impl<T: Transport, R: RecordSink> Session<T, R> {
    pub fn new<C: ConfigProvider>(
        transport: T,
        sink: R,
        clock: Arc<dyn Clock>,
        config: &C,
    ) -> Result<Self> {
        if config.poll_interval().is_zero() {
            return Err(BalanceError::InvalidConfigValueError {
                field: "main.update_interval".to_string(),
                value: "0".to_string(),
                reason: "Poll interval must be positive".to_string(),
            });
        }

        let recorder = match config.mode() {
            RecordingMode::Hydro => Recorder::Hydro(FlowEngine::new(FlowSettings {
                flow_window: config.flow_window(),
                average_window: config.average_window(),
            })?),
            RecordingMode::Log => Recorder::Log {
                tag: config.tag().to_string(),
            },
        };

        Ok(Self {
            transport,
            sink,
            clock,
            adapter: ProtocolAdapter::new(AdapterConfig::for_vendor(config.vendor())),
            recorder,
            poll_interval: config.poll_interval(),
            link: None,
            ticker: None,
            started_at: 0.0,
            last_output: None,
        })
    }

    pub fn is_polling(&self) -> bool {
        self.ticker.is_some()
    }

    /// 開始輪詢。若無法開啟序列埠則回傳錯誤並維持停止狀態。
    pub async fn start(&mut self) -> Result<()> {
        if self.is_polling() {
            tracing::info!("Already receiving, ignoring start request");
            return Ok(());
        }

        if self.adapter.vendor().needs_transport() && self.link.is_none() {
            let mut link = self.transport.open().await?;
            for command in self.adapter.startup_commands() {
                tracing::debug!("Sending startup command: {}", command);
                link.writer.send_line(command)?;
            }
            tracing::info!("🔌 Connected to {}", self.transport.describe());
            self.link = Some(link);
        }

        self.write_header()?;
        self.started_at = self.clock.now();
        self.ticker = Some(interval(self.poll_interval));
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.ticker.take().is_some() {
            tracing::info!("Stopped receiving");
        }
        self.link = None;
        self.adapter.stop();
    }

    /// 送出一次重量請求（Dummy 直接產生數值）
    pub fn request_weight(&mut self) -> Result<()> {
        match self.adapter.request_weight() {
            WeightRequest::Send(command) => match self.link.as_mut() {
                Some(link) => link.writer.send_line(command),
                None => Err(BalanceError::LinkClosed),
            },
            WeightRequest::Immediate(value) => {
                let sample = WeightSample::new(self.clock.now(), value);
                self.record_sample(sample)
            }
        }
    }

    /// 解碼一行裝置輸出；壞行回傳 [`BalanceError::Decode`]
    pub fn handle_line(&mut self, line: RawLine) -> Result<()> {
        match self.adapter.decode(&line, self.clock.now())? {
            Reading::Weight(sample) => self.record_sample(sample),
            Reading::NonWeight(line) => {
                tracing::debug!("Ignoring non-weight line: {:?}", line.as_str());
                Ok(())
            }
        }
    }

    pub async fn handle_command(&mut self, command: KeyCommand) -> Result<Flow> {
        match command {
            KeyCommand::Quit => return Ok(Flow::Quit),
            KeyCommand::Start => {
                // 失敗時維持停止，等待使用者再按 c
                if let Err(e) = self.start().await {
                    report(&e);
                }
            }
            KeyCommand::Stop => self.stop(),
            KeyCommand::LogCurrent => match self.last_output.clone() {
                Some(line) => {
                    self.sink.write_record(&line)?;
                    tracing::info!("Logged value");
                }
                None => tracing::info!("No value received yet"),
            },
            KeyCommand::Unknown(input) => {
                tracing::debug!("Unknown keyboard command: {:?}", input);
            }
        }
        Ok(Flow::Continue)
    }

    /// 主迴圈：直到收到 `q` 為止
    pub async fn run(mut self, commands: mpsc::Receiver<KeyCommand>) -> Result<R> {
        let mut commands = Some(commands);

        // 開啟失敗時保持執行，等待 `c`
        if let Err(e) = self.start().await {
            report(&e);
        }

        loop {
            let event = tokio::select! {
                _ = next_tick(&mut self.ticker) => Event::Tick,
                line = next_line(&mut self.link) => Event::Line(line),
                command = next_command(&mut commands) => Event::Command(command),
                _ = tokio::signal::ctrl_c() => Event::Command(Some(KeyCommand::Quit)),
            };

            match event {
                Event::Tick => {
                    if let Err(e) = self.request_weight() {
                        report(&e);
                    }
                }
                Event::Line(Some(line)) => {
                    if let Err(e) = self.handle_line(line) {
                        report(&e);
                    }
                }
                Event::Line(None) => {
                    report(&BalanceError::LinkClosed);
                    self.stop();
                }
                Event::Command(Some(command)) => match self.handle_command(command).await {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => {}
                    Err(e) => report(&e),
                },
                Event::Command(None) => {
                    tracing::debug!("Keyboard input closed");
                    commands = None;
                }
            }
        }

        self.stop();
        tracing::info!("👋 Session finished");
        Ok(self.sink)
    }

    /// 時間差不為正時回傳 [`BalanceError::Flow`]，這次輪詢不產生紀錄
    fn record_sample(&mut self, sample: WeightSample) -> Result<()> {
        let line = match &mut self.recorder {
            Recorder::Hydro(engine) => engine.ingest(sample)?.to_string(),
            Recorder::Log { tag } => format!(
                "{}\t{:.10}\t{:.10}",
                tag,
                sample.timestamp - self.started_at,
                sample.value_mg
            ),
        };

        // 寫入失敗時仍可用 Enter 重新記錄
        self.last_output = Some(line.clone());
        self.sink.write_record(&line)
    }

    fn write_header(&mut self) -> Result<()> {
        self.sink.write_record("Starting receiving")?;
        if let Recorder::Hydro(engine) = &self.recorder {
            let settings = engine.settings();
            let interval = self.poll_interval.as_secs_f64();
            let flow_span = interval * settings.flow_window as f64;
            self.sink.write_record(&format!(
                "Print Interval = {}, Flow interval = {} * {} = {} s, running average n = {} ({} s)",
                interval,
                interval,
                settings.flow_window,
                flow_span,
                settings.average_window,
                flow_span * settings.average_window as f64
            ))?;
        }
        Ok(())
    }
}

/// 單次輪詢、單行或單一指令的失敗只記錄，不結束 session
fn report(error: &BalanceError) {
    match error.severity() {
        ErrorSeverity::Low => tracing::warn!("Skipping sample: {}", error),
        _ => {
            tracing::error!("❌ {}", error);
            tracing::error!("💡 {}", error.recovery_suggestion());
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn next_line(link: &mut Option<Link>) -> Option<RawLine> {
    match link {
        Some(link) => link.lines.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_command(commands: &mut Option<mpsc::Receiver<KeyCommand>>) -> Option<KeyCommand> {
    match commands {
        Some(commands) => commands.recv().await,
        None => std::future::pending().await,
    }
}
